use std::{num::NonZeroUsize, sync::Arc};

use base64::prelude::*;
use lru::LruCache;
use parking_lot::Mutex;

use crate::{
    assets::fetch::Fetcher,
    cache::expiring::EstimateSize,
    foundation::config::ImageLoaderConfig,
};

/// A validated remote image held in memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedImage {
    /// Normalized media type (`image/png`, ...).
    pub media_type: String,
    /// Raw encoded bytes as served.
    pub bytes: Arc<Vec<u8>>,
    /// `data:` URI embedding `bytes`, ready to drop into markup.
    pub data_uri: Arc<str>,
}

impl LoadedImage {
    /// Wrap encoded bytes of a known media type.
    pub fn new(media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let media_type = media_type.into();
        let data_uri = format!("data:{media_type};base64,{}", BASE64_STANDARD.encode(&bytes));
        Self {
            media_type,
            bytes: Arc::new(bytes),
            data_uri: Arc::from(data_uri),
        }
    }

    /// `true` for `image/svg+xml`.
    pub fn is_svg(&self) -> bool {
        self.media_type == "image/svg+xml"
    }
}

impl EstimateSize for LoadedImage {
    fn estimated_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.media_type.len() + self.bytes.len() + self.data_uri.len()
    }
}

/// Fetches, validates and caches remote images.
///
/// Every rejection (bad URL, non-2xx, disallowed content type, oversized body, timeout) yields
/// `None`; callers treat the asset as unavailable. Successful loads stay in an LRU keyed by the
/// source URL for the life of the loader.
pub struct ImageLoader {
    fetcher: Arc<dyn Fetcher>,
    config: ImageLoaderConfig,
    cache: Mutex<LruCache<String, Arc<LoadedImage>>>,
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("config", &self.config)
            .field("cached", &self.cache.lock().len())
            .finish()
    }
}

impl ImageLoader {
    /// Create a loader. A zero capacity is treated as one.
    pub fn new(fetcher: Arc<dyn Fetcher>, config: ImageLoaderConfig) -> Self {
        let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            fetcher,
            config,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Load `url`, from cache when possible.
    pub async fn load(&self, url: &str) -> Option<Arc<LoadedImage>> {
        let cached = self.cache.lock().get(url).cloned();
        if cached.is_some() {
            return cached;
        }

        if !is_fetchable_url(url) {
            tracing::debug!(url, "image url rejected");
            return None;
        }

        let resource = match self
            .fetcher
            .fetch(url, self.config.timeout(), self.config.max_bytes)
            .await
        {
            Ok(resource) => resource,
            Err(err) => {
                tracing::warn!(url, %err, "image fetch failed");
                return None;
            }
        };

        if !resource.is_ok() {
            tracing::debug!(url, status = resource.status, "image fetch returned non-ok status");
            return None;
        }
        let Some(media_type) = resource.media_type() else {
            tracing::debug!(url, "image response has no content type");
            return None;
        };
        if !self.is_allowed(&media_type) {
            tracing::debug!(url, media_type = %media_type, "image content type not allowed");
            return None;
        }
        if resource.bytes.is_empty() || resource.bytes.len() > self.config.max_bytes {
            tracing::debug!(url, len = resource.bytes.len(), "image body size rejected");
            return None;
        }

        let loaded = Arc::new(LoadedImage::new(media_type, resource.bytes));
        self.cache
            .lock()
            .put(url.to_string(), Arc::clone(&loaded));
        Some(loaded)
    }

    fn is_allowed(&self, media_type: &str) -> bool {
        self.config
            .allowed_content_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(media_type))
    }

    /// Number of cached images.
    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Drop all cached images.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}

fn is_fetchable_url(url: &str) -> bool {
    url::Url::parse(url).is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/image_loader.rs"]
mod tests;
