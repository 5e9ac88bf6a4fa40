use std::{path::Path, path::PathBuf, time::Duration};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    encode::image_encode::EncodeSettings,
    foundation::error::{GlintError, GlintResult},
    render::component::Dimensions,
};

/// Capacity and TTL of one [`crate::cache::expiring::ExpiringCache`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum live entries before LRU eviction kicks in.
    pub max_entries: usize,
    /// Default entry TTL in milliseconds.
    pub ttl_ms: u64,
}

impl CacheConfig {
    /// Default TTL as a [`Duration`].
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    fn gradient_default() -> Self {
        Self {
            max_entries: 500,
            ttl_ms: 60_000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl_ms: 30 * 60 * 1_000,
        }
    }
}

/// Per-key throttling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Minimum spacing between two executions for the same key, in milliseconds.
    pub interval_ms: u64,
}

impl ThrottleConfig {
    /// Interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self { interval_ms: 1_000 }
    }
}

/// Remote image fetching and validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageLoaderConfig {
    /// Hard timeout for one fetch, in milliseconds.
    pub timeout_ms: u64,
    /// Maximum accepted body size in bytes.
    pub max_bytes: usize,
    /// Accepted `Content-Type` values (parameters such as `charset` are ignored).
    pub allowed_content_types: Vec<String>,
    /// LRU capacity of the decoded data-URI cache.
    pub cache_capacity: usize,
}

impl ImageLoaderConfig {
    /// Timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ImageLoaderConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_bytes: 5 * 1024 * 1024,
            allowed_content_types: [
                "image/png",
                "image/jpeg",
                "image/jpg",
                "image/gif",
                "image/webp",
                "image/svg+xml",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            cache_capacity: 200,
        }
    }
}

/// Emoji glyph lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmojiConfig {
    /// On-disk cache directory. `None` disables the disk tier.
    pub cache_dir: Option<PathBuf>,
    /// LRU capacity of the in-memory tier.
    pub memory_capacity: usize,
    /// Primary URL template; `{code}` is replaced by the dash-joined hex codepoints.
    pub primary_url: String,
    /// Secondary URL template tried when the primary fails.
    pub secondary_url: String,
    /// Hard timeout for one fetch, in milliseconds.
    pub timeout_ms: u64,
    /// Maximum accepted glyph body size in bytes.
    pub max_bytes: usize,
}

impl EmojiConfig {
    /// Timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for EmojiConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            memory_capacity: 512,
            primary_url: "https://cdn.jsdelivr.net/gh/jdecked/twemoji@latest/assets/svg/{code}.svg"
                .to_string(),
            secondary_url: "https://cdnjs.cloudflare.com/ajax/libs/twemoji/14.0.2/svg/{code}.svg"
                .to_string(),
            timeout_ms: 5_000,
            max_bytes: 1024 * 1024,
        }
    }
}

/// A named, weighted font file made available to the layout and raster stages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontSource {
    /// Family name templates refer to.
    pub family: String,
    /// CSS weight (400 regular, 700 bold).
    #[serde(default = "default_weight")]
    pub weight: u16,
    /// Path to a TTF/OTF file.
    pub path: PathBuf,
}

fn default_weight() -> u16 {
    400
}

/// Top-level engine configuration. Every section is optional in JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// URL-keyed palette cache.
    pub color_cache: CacheConfig,
    /// User-keyed palette cache.
    pub gradient_cache: CacheConfig,
    /// Per-key render throttling.
    pub throttle: ThrottleConfig,
    /// Remote images.
    pub images: ImageLoaderConfig,
    /// Emoji glyphs.
    pub emoji: EmojiConfig,
    /// Output encoding.
    pub encode: EncodeSettings,
    /// Fonts loaded once at engine construction.
    pub fonts: Vec<FontSource>,
    /// Whether system fonts are loaded in addition to `fonts`.
    pub system_fonts: bool,
    /// Dimensions used when a component's size is unusable and for the image-size retry.
    pub fallback_dimensions: Dimensions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            color_cache: CacheConfig::default(),
            gradient_cache: CacheConfig::gradient_default(),
            throttle: ThrottleConfig::default(),
            images: ImageLoaderConfig::default(),
            emoji: EmojiConfig::default(),
            encode: EncodeSettings::default(),
            fonts: Vec::new(),
            system_fonts: true,
            fallback_dimensions: Dimensions::FALLBACK,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(s: &str) -> GlintResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| GlintError::config(format!("invalid config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> GlintResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Reject values that would make the engine misbehave.
    pub fn validate(&self) -> GlintResult<()> {
        for (name, c) in [
            ("color_cache", &self.color_cache),
            ("gradient_cache", &self.gradient_cache),
        ] {
            if c.max_entries == 0 {
                return Err(GlintError::config(format!("{name}.max_entries must be > 0")));
            }
            if c.ttl_ms == 0 {
                return Err(GlintError::config(format!("{name}.ttl_ms must be > 0")));
            }
        }
        if self.throttle.interval_ms == 0 {
            return Err(GlintError::config("throttle.interval_ms must be > 0"));
        }
        if self.images.allowed_content_types.is_empty() {
            return Err(GlintError::config(
                "images.allowed_content_types must not be empty",
            ));
        }
        if self.images.max_bytes == 0 || self.images.cache_capacity == 0 {
            return Err(GlintError::config(
                "images.max_bytes and images.cache_capacity must be > 0",
            ));
        }
        if self.emoji.memory_capacity == 0 || self.emoji.max_bytes == 0 {
            return Err(GlintError::config(
                "emoji.memory_capacity and emoji.max_bytes must be > 0",
            ));
        }
        if !self.fallback_dimensions.is_valid() {
            return Err(GlintError::config("fallback_dimensions must be non-zero"));
        }
        self.encode.validate()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
