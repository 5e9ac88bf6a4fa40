use std::{io::Cursor, time::Duration};

use super::*;
use crate::{
    assets::{fetch::StaticFetcher, image_loader::ImageLoader},
    foundation::config::ImageLoaderConfig,
};

fn png(rgb: [u8; 3]) -> Vec<u8> {
    let mut buf = Vec::new();
    image::RgbaImage::from_pixel(2, 2, image::Rgba([rgb[0], rgb[1], rgb[2], 255]))
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn setup() -> (Arc<StaticFetcher>, Arc<ColorService>, GradientCache) {
    let fetcher = Arc::new(StaticFetcher::new());
    let images = Arc::new(ImageLoader::new(fetcher.clone(), ImageLoaderConfig::default()));
    let colors = Arc::new(ColorService::new(&CacheConfig::default(), images));
    let gradients = GradientCache::new(
        &CacheConfig {
            max_entries: 500,
            ttl_ms: 60_000,
        },
        Arc::clone(&colors),
    );
    (fetcher, colors, gradients)
}

#[tokio::test(start_paused = true)]
async fn user_hit_skips_url_layer() {
    let (fetcher, colors, gradients) = setup();
    fetcher.insert("https://cdn.test/u1.png", "image/png", png([120, 40, 200]));

    let first = gradients.get_or_compute("u1", "https://cdn.test/u1.png").await;
    let second = gradients.get_or_compute("u1", "https://cdn.test/u1.png").await;
    assert_eq!(first, second);
    assert_eq!(gradients.metrics().hits, 1);
    // The URL layer saw only the first (missing) lookup.
    assert_eq!(colors.metrics().misses, 1);
    assert_eq!(colors.metrics().hits, 0);
    assert_eq!(fetcher.total_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn expired_user_entry_falls_through_to_url_cache() {
    let (fetcher, colors, gradients) = setup();
    fetcher.insert("https://cdn.test/u1.png", "image/png", png([120, 40, 200]));

    gradients.get_or_compute("u1", "https://cdn.test/u1.png").await;
    tokio::time::advance(Duration::from_millis(60_001)).await;
    gradients.get_or_compute("u1", "https://cdn.test/u1.png").await;

    assert_eq!(gradients.metrics().expirations, 1);
    assert_eq!(colors.metrics().hits, 1);
    assert_eq!(fetcher.total_calls(), 1);
}

#[tokio::test]
async fn failures_are_not_stored_per_user() {
    let (_fetcher, _colors, gradients) = setup();
    let result = gradients.get_or_compute("u2", "https://cdn.test/none.png").await;
    assert_eq!(result, ColorResult::default_palette());
    assert!(gradients.cache().is_empty());
    assert!(!gradients.invalidate("u2"));
}
