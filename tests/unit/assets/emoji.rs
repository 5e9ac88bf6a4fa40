use super::*;
use crate::assets::fetch::StaticFetcher;

const GLYPH: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 36 36"><circle cx="18" cy="18" r="18" fill="#fc0"/></svg>"##;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "glint_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn config(cache_dir: Option<PathBuf>) -> EmojiConfig {
    EmojiConfig {
        cache_dir,
        primary_url: "https://primary.test/{code}.svg".to_string(),
        secondary_url: "https://secondary.test/{code}.svg".to_string(),
        ..EmojiConfig::default()
    }
}

#[test]
fn key_strips_variation_selector_and_clamps_scale() {
    let key = EmojiKey::new("\u{2764}\u{fe0f}", 10.0).unwrap();
    assert_eq!(key.code(), "2764");
    assert_eq!(key.scale(), 3.0);
    assert_eq!(key.file_name(), "2764-3.svg");
    assert_eq!(key.size_px(), 96);

    let key = EmojiKey::new("\u{1f44d}\u{1f3fd}", 0.1).unwrap();
    assert_eq!(key.code(), "1f44d-1f3fd");
    assert_eq!(key.file_name(), "1f44d-1f3fd-0.5.svg");

    assert_eq!(
        EmojiKey::new("\u{1f600}", 1.5),
        EmojiKey::new("\u{1f600}\u{fe0f}", 1.5)
    );
    assert!(EmojiKey::new("\u{fe0f}", 1.0).is_none());
    assert_eq!(clamp_emoji_scale(f32::NAN), 1.0);
}

#[test]
fn resize_rewrites_root_geometry() {
    let out = resize_svg_root(GLYPH, 48).unwrap();
    assert!(out.starts_with(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 36 36" width="48" height="48">"#
    ));
    assert!(out.ends_with("</svg>"));

    let sized = r#"<svg width="72px" height="72px"><rect/></svg>"#;
    let out = resize_svg_root(sized, 32).unwrap();
    assert!(out.contains(r#"width="32" height="32" viewBox="0 0 72 72""#));

    assert!(resize_svg_root("not svg", 32).is_none());
}

#[tokio::test]
async fn oversized_glyph_falls_through_to_next_source() {
    let fetcher = Arc::new(StaticFetcher::new());
    let padded = GLYPH.replace("</svg>", &format!("<!--{}--></svg>", "x".repeat(256)));
    fetcher.insert("https://primary.test/1f600.svg", "image/svg+xml", padded.into_bytes());
    fetcher.insert("https://secondary.test/1f600.svg", "image/svg+xml", GLYPH.as_bytes().to_vec());
    let loader = EmojiLoader::new(
        fetcher.clone(),
        EmojiConfig {
            max_bytes: 256,
            ..config(None)
        },
    );

    let svg = loader.load("\u{1f600}", 1.0).await.unwrap();
    assert!(!svg.contains("<!--"));
    assert_eq!(fetcher.call_count("https://primary.test/1f600.svg"), 1);
    assert_eq!(fetcher.call_count("https://secondary.test/1f600.svg"), 1);
}

#[tokio::test]
async fn falls_back_to_secondary_and_backfills_disk_and_memory() {
    let dir = temp_dir("emoji_waterfall");
    let fetcher = Arc::new(StaticFetcher::new());
    fetcher.insert("https://secondary.test/1f600.svg", "image/svg+xml", GLYPH.as_bytes().to_vec());
    let loader = EmojiLoader::new(fetcher.clone(), config(Some(dir.clone())));

    let svg = loader.load("\u{1f600}", 1.5).await.unwrap();
    assert!(svg.contains(r#"width="48""#));
    assert_eq!(fetcher.call_count("https://primary.test/1f600.svg"), 1);
    assert_eq!(fetcher.call_count("https://secondary.test/1f600.svg"), 1);

    let on_disk = std::fs::read_to_string(dir.join("1f600-1.5.svg")).unwrap();
    assert_eq!(on_disk, svg.as_ref());
    assert_eq!(loader.cached_len(), 1);

    // Memory tier answers without touching the network again.
    loader.load("\u{1f600}", 1.5).await.unwrap();
    assert_eq!(fetcher.total_calls(), 2);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn disk_hit_skips_network_and_promotes_to_memory() {
    let dir = temp_dir("emoji_disk_hit");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("2b50-1.svg"), GLYPH).unwrap();

    let fetcher = Arc::new(StaticFetcher::new());
    let loader = EmojiLoader::new(fetcher.clone(), config(Some(dir.clone())));
    let svg = loader.load("\u{2b50}", 1.0).await.unwrap();
    assert_eq!(svg.as_ref(), GLYPH);
    assert_eq!(fetcher.total_calls(), 0);
    assert_eq!(loader.cached_len(), 1);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn missing_everywhere_is_none_and_tiers_are_ordered() {
    let fetcher = Arc::new(StaticFetcher::new());
    let loader = EmojiLoader::new(fetcher, config(None));
    assert_eq!(
        loader.tiers(),
        &[
            EmojiTier::Memory,
            EmojiTier::Remote("https://primary.test/{code}.svg".to_string()),
            EmojiTier::Remote("https://secondary.test/{code}.svg".to_string()),
        ]
    );
    assert!(loader.load("\u{1f47b}", 1.0).await.is_none());
    assert!(loader.load_data_uri("\u{1f47b}", 1.0).await.is_none());
}

#[tokio::test]
async fn data_uri_wraps_resized_markup() {
    let fetcher = Arc::new(StaticFetcher::new());
    fetcher.insert("https://primary.test/1f525.svg", "image/svg+xml", GLYPH.as_bytes().to_vec());
    let loader = EmojiLoader::new(fetcher, config(None));
    let uri = loader.load_data_uri("\u{1f525}", 1.0).await.unwrap();
    assert!(uri.starts_with("data:image/svg+xml;base64,"));
}
