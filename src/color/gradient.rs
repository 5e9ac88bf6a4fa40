use std::sync::Arc;

use crate::{
    cache::expiring::{CacheMetrics, ExpiringCache},
    color::{palette::ColorResult, service::ColorService},
    foundation::config::CacheConfig,
};

/// Short-lived palettes keyed by user id, layered over the URL-keyed [`ColorService`].
///
/// Avatar URLs churn independently of users; keying by user gives a clean invalidation boundary
/// and skips URL normalization on bursts of renders for the same user.
#[derive(Debug)]
pub struct GradientCache {
    cache: ExpiringCache<ColorResult>,
    colors: Arc<ColorService>,
}

impl GradientCache {
    /// Create an empty cache in front of `colors`.
    pub fn new(config: &CacheConfig, colors: Arc<ColorService>) -> Self {
        Self {
            cache: ExpiringCache::new("gradients", config),
            colors,
        }
    }

    /// Palette for `user_id`, computing it from `image_url` on a miss.
    ///
    /// Only successful extractions are stored; a failure yields the default palette.
    pub async fn get_or_compute(&self, user_id: &str, image_url: &str) -> ColorResult {
        if let Some(hit) = self.cache.get(user_id) {
            tracing::trace!(user_id, "gradient cache hit");
            return hit;
        }
        match self.colors.try_process_image_colors(image_url).await {
            Some(colors) => {
                self.cache.set(user_id, colors.clone());
                colors
            }
            None => ColorResult::default_palette(),
        }
    }

    /// Forget one user's palette.
    pub fn invalidate(&self, user_id: &str) -> bool {
        self.cache.remove(user_id)
    }

    /// The user-keyed cache.
    pub fn cache(&self) -> &ExpiringCache<ColorResult> {
        &self.cache
    }

    /// Counters of the user-keyed cache.
    pub fn metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/color/gradient.rs"]
mod tests;
