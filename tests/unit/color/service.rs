use std::{io::Cursor, time::Duration};

use super::*;
use crate::{assets::fetch::StaticFetcher, foundation::config::ImageLoaderConfig};

fn png(rgb: [u8; 3]) -> Vec<u8> {
    let mut buf = Vec::new();
    image::RgbaImage::from_pixel(4, 4, image::Rgba([rgb[0], rgb[1], rgb[2], 255]))
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn service(fetcher: Arc<StaticFetcher>) -> ColorService {
    let images = Arc::new(ImageLoader::new(fetcher, ImageLoaderConfig::default()));
    ColorService::new(&CacheConfig::default(), images)
}

#[tokio::test]
async fn unreachable_image_yields_default_palette_and_a_miss() {
    let fetcher = Arc::new(StaticFetcher::new());
    let colors = service(fetcher.clone());

    let result = colors
        .process_image_colors("https://cdn.test/missing.png")
        .await;
    assert_eq!(result, ColorResult::default_palette());

    let m = colors.metrics();
    assert_eq!(m.misses, 1);
    assert_eq!(m.hits, 0);
    assert_eq!(m.size, 0, "failures are not cached");
    assert_eq!(fetcher.total_calls(), 1);
}

#[tokio::test]
async fn successful_extraction_is_cached_under_the_normalized_url() {
    let fetcher = Arc::new(StaticFetcher::new());
    fetcher.insert(
        "https://www.Example.com/a.png?size=128",
        "image/png",
        png([33, 150, 243]),
    );
    let colors = service(fetcher.clone());

    let first = colors
        .process_image_colors("https://www.Example.com/a.png?size=128")
        .await;
    assert_eq!(first, ColorResult::from_rgb([33, 150, 243]));

    let second = colors.process_image_colors("https://example.com/a.png").await;
    assert_eq!(second, first);
    assert_eq!(fetcher.total_calls(), 1);

    let m = colors.metrics();
    assert_eq!((m.hits, m.misses, m.size), (1, 1, 1));
}

#[tokio::test(start_paused = true)]
async fn concurrent_requests_share_one_fetch() {
    let fetcher = Arc::new(StaticFetcher::new().with_delay(Duration::from_millis(100)));
    fetcher.insert("https://cdn.test/a.png", "image/png", png([200, 30, 30]));
    let colors = service(fetcher.clone());

    let (a, b) = tokio::join!(
        colors.process_image_colors("https://cdn.test/a.png"),
        colors.process_image_colors("https://CDN.test/a.png/"),
    );
    assert_eq!(a, b);
    assert_ne!(a, ColorResult::default_palette());
    assert_eq!(fetcher.total_calls(), 1);
}

#[tokio::test]
async fn empty_url_is_default_without_fetching() {
    let fetcher = Arc::new(StaticFetcher::new());
    let colors = service(fetcher.clone());
    assert_eq!(
        colors.process_image_colors("   ").await,
        ColorResult::default_palette()
    );
    assert_eq!(fetcher.total_calls(), 0);
}

#[tokio::test]
async fn clear_drops_cached_palettes() {
    let fetcher = Arc::new(StaticFetcher::new());
    fetcher.insert("https://cdn.test/a.png", "image/png", png([10, 200, 10]));
    let colors = service(fetcher.clone());
    colors.process_image_colors("https://cdn.test/a.png").await;
    assert_eq!(colors.cache().len(), 1);
    colors.clear();
    assert!(colors.cache().is_empty());
}
