use std::sync::Arc;

use crate::{
    assets::{image_loader::ImageLoader, url_key::normalize_cache_url},
    cache::{
        expiring::{CacheMetrics, ExpiringCache},
        inflight::InFlight,
    },
    color::{extract::dominant_color, palette::ColorResult},
    foundation::config::CacheConfig,
};

/// URL-keyed palette extraction: cache, then in-flight join, then fetch + extract.
///
/// Failures produce the default palette and are not cached, so the next request retries.
pub struct ColorService {
    cache: Arc<ExpiringCache<ColorResult>>,
    inflight: InFlight<Option<ColorResult>>,
    images: Arc<ImageLoader>,
}

impl std::fmt::Debug for ColorService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColorService")
            .field("cached", &self.cache.len())
            .field("pending", &self.inflight.pending_len())
            .finish()
    }
}

impl ColorService {
    /// Create a service over `images` with its own cache.
    pub fn new(config: &CacheConfig, images: Arc<ImageLoader>) -> Self {
        Self {
            cache: Arc::new(ExpiringCache::new("colors", config)),
            inflight: InFlight::new(),
            images,
        }
    }

    /// Palette for the image at `url`, or the default palette when it cannot be derived.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn process_image_colors(&self, url: &str) -> ColorResult {
        self.try_process_image_colors(url)
            .await
            .unwrap_or_else(ColorResult::default_palette)
    }

    /// Like [`ColorService::process_image_colors`] but reports failure as `None`.
    pub async fn try_process_image_colors(&self, url: &str) -> Option<ColorResult> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        let key = normalize_cache_url(url);
        if let Some(hit) = self.cache.get(&key) {
            return Some(hit);
        }

        let cache = Arc::clone(&self.cache);
        let images = Arc::clone(&self.images);
        let source = url.to_string();
        let cache_key = key.clone();
        self.inflight
            .dedupe(&key, move || async move {
                let colors = extract_palette(&images, &source).await?;
                cache.set(cache_key, colors.clone());
                Some(colors)
            })
            .await
    }

    /// The URL-keyed cache.
    pub fn cache(&self) -> &ExpiringCache<ColorResult> {
        &self.cache
    }

    /// Counters of the URL-keyed cache.
    pub fn metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }

    /// Drop cached palettes and forget pending joins.
    pub fn clear(&self) {
        self.cache.clear();
        self.inflight.clear();
    }
}

async fn extract_palette(images: &ImageLoader, url: &str) -> Option<ColorResult> {
    let image = images.load(url).await?;
    let bytes = Arc::clone(&image.bytes);
    let media_type = image.media_type.clone();
    match tokio::task::spawn_blocking(move || dominant_color(&bytes, &media_type)).await {
        Ok(Ok(rgb)) => {
            tracing::debug!(url, ?rgb, "dominant color extracted");
            Some(ColorResult::from_rgb(rgb))
        }
        Ok(Err(err)) => {
            tracing::warn!(url, %err, "dominant color extraction failed");
            None
        }
        Err(err) => {
            tracing::warn!(url, %err, "dominant color task failed");
            None
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/color/service.rs"]
mod tests;
