//! Emoji glyph lookup: memory, then disk, then remote sources, in that order.
//!
//! Fetched glyphs are resized to the requested scale, persisted to the disk tier and promoted to
//! memory. Scales are clamped to `0.5..=3.0` before they are used anywhere.

use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
};

use base64::prelude::*;
use lru::LruCache;
use parking_lot::Mutex;

use crate::{
    assets::fetch::Fetcher,
    foundation::{config::EmojiConfig, markup},
};

/// Smallest accepted emoji scale.
pub const MIN_EMOJI_SCALE: f32 = 0.5;
/// Largest accepted emoji scale.
pub const MAX_EMOJI_SCALE: f32 = 3.0;
/// Rendered edge length of an emoji at scale 1.
pub const BASE_EMOJI_PX: f32 = 32.0;
/// Twemoji's native viewBox edge, used when a glyph declares no geometry at all.
const DEFAULT_VIEWBOX_EDGE: f32 = 36.0;

const VARIATION_SELECTOR_16: char = '\u{fe0f}';

/// Clamp a requested scale into the supported range. Non-finite input maps to 1.
pub fn clamp_emoji_scale(scale: f32) -> f32 {
    if !scale.is_finite() {
        return 1.0;
    }
    scale.clamp(MIN_EMOJI_SCALE, MAX_EMOJI_SCALE)
}

/// Cache identity of one glyph at one scale.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EmojiKey {
    code: String,
    scale_centi: u16,
}

impl EmojiKey {
    /// Key for `emoji` (one grapheme, possibly multi-codepoint) at `scale`.
    ///
    /// Returns `None` when nothing is left after dropping variation selectors.
    pub fn new(emoji: &str, scale: f32) -> Option<Self> {
        let code = emoji
            .chars()
            .filter(|&c| c != VARIATION_SELECTOR_16)
            .map(|c| format!("{:x}", u32::from(c)))
            .collect::<Vec<_>>()
            .join("-");
        if code.is_empty() {
            return None;
        }
        let scale_centi = (clamp_emoji_scale(scale) * 100.0).round() as u16;
        Some(Self { code, scale_centi })
    }

    /// Dash-joined lowercase hex codepoints, e.g. `1f44d-1f3fd`.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Clamped scale.
    pub fn scale(&self) -> f32 {
        f32::from(self.scale_centi) / 100.0
    }

    /// Disk cache file name: `{code}-{scale}.svg`.
    pub fn file_name(&self) -> String {
        format!("{}-{}.svg", self.code, self.scale())
    }

    /// Output edge length in pixels.
    pub fn size_px(&self) -> u32 {
        (BASE_EMOJI_PX * self.scale()).round().max(1.0) as u32
    }
}

/// One lookup strategy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmojiTier {
    /// In-process LRU.
    Memory,
    /// `{dir}/{code}-{scale}.svg` files.
    Disk(PathBuf),
    /// Remote source; `{code}` in the template is replaced by [`EmojiKey::code`].
    Remote(String),
}

/// Loads emoji glyphs as SVG markup through an ordered list of [`EmojiTier`]s.
pub struct EmojiLoader {
    fetcher: Arc<dyn Fetcher>,
    config: EmojiConfig,
    tiers: Vec<EmojiTier>,
    memory: Mutex<LruCache<EmojiKey, Arc<str>>>,
}

impl std::fmt::Debug for EmojiLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmojiLoader")
            .field("tiers", &self.tiers)
            .field("cached", &self.memory.lock().len())
            .finish()
    }
}

impl EmojiLoader {
    /// Build the default waterfall: memory, disk (if configured), primary, secondary.
    pub fn new(fetcher: Arc<dyn Fetcher>, config: EmojiConfig) -> Self {
        let mut tiers = vec![EmojiTier::Memory];
        if let Some(dir) = &config.cache_dir {
            tiers.push(EmojiTier::Disk(dir.clone()));
        }
        for template in [&config.primary_url, &config.secondary_url] {
            if !template.is_empty() {
                tiers.push(EmojiTier::Remote(template.clone()));
            }
        }
        let capacity = NonZeroUsize::new(config.memory_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            fetcher,
            config,
            tiers,
            memory: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// The lookup order in use.
    pub fn tiers(&self) -> &[EmojiTier] {
        &self.tiers
    }

    /// Resolve `emoji` at `scale` to resized SVG markup.
    pub async fn load(&self, emoji: &str, scale: f32) -> Option<Arc<str>> {
        let key = EmojiKey::new(emoji, scale)?;
        for tier in &self.tiers {
            let Some(svg) = self.lookup(tier, &key).await else {
                continue;
            };
            match tier {
                EmojiTier::Memory => {}
                EmojiTier::Disk(_) => self.remember(&key, &svg),
                EmojiTier::Remote(_) => {
                    self.persist(&key, &svg).await;
                    self.remember(&key, &svg);
                }
            }
            return Some(svg);
        }
        tracing::debug!(code = key.code(), "emoji unavailable from every source");
        None
    }

    /// Same as [`EmojiLoader::load`], encoded as an `image/svg+xml` data URI.
    pub async fn load_data_uri(&self, emoji: &str, scale: f32) -> Option<String> {
        let svg = self.load(emoji, scale).await?;
        Some(format!(
            "data:image/svg+xml;base64,{}",
            BASE64_STANDARD.encode(svg.as_bytes())
        ))
    }

    /// Try a single tier without any backfilling.
    pub async fn lookup(&self, tier: &EmojiTier, key: &EmojiKey) -> Option<Arc<str>> {
        match tier {
            EmojiTier::Memory => self.recall(key),
            EmojiTier::Disk(dir) => read_disk(dir, key).await,
            EmojiTier::Remote(template) => self.fetch_remote(template, key).await,
        }
    }

    async fn fetch_remote(&self, template: &str, key: &EmojiKey) -> Option<Arc<str>> {
        let url = template.replace("{code}", key.code());
        let resource = match self
            .fetcher
            .fetch(&url, self.config.timeout(), self.config.max_bytes)
            .await
        {
            Ok(r) if r.is_ok() => r,
            Ok(r) => {
                tracing::debug!(url = %url, status = r.status, "emoji source returned non-ok status");
                return None;
            }
            Err(err) => {
                tracing::debug!(url = %url, %err, "emoji fetch failed");
                return None;
            }
        };
        let text = String::from_utf8(resource.bytes).ok()?;
        let resized = resize_svg_root(&text, key.size_px())?;
        Some(Arc::from(resized))
    }

    fn recall(&self, key: &EmojiKey) -> Option<Arc<str>> {
        self.memory.lock().get(key).cloned()
    }

    fn remember(&self, key: &EmojiKey, svg: &Arc<str>) {
        self.memory.lock().put(key.clone(), Arc::clone(svg));
    }

    async fn persist(&self, key: &EmojiKey, svg: &str) {
        let Some(dir) = self.tiers.iter().find_map(|t| match t {
            EmojiTier::Disk(dir) => Some(dir),
            _ => None,
        }) else {
            return;
        };
        if let Err(err) = write_disk(dir, key, svg).await {
            tracing::warn!(code = key.code(), %err, "failed to persist emoji to disk cache");
        }
    }

    /// Number of glyphs held in memory.
    pub fn cached_len(&self) -> usize {
        self.memory.lock().len()
    }

    /// Drop the memory tier. Disk files are kept.
    pub fn clear_memory(&self) {
        self.memory.lock().clear();
    }
}

async fn read_disk(dir: &Path, key: &EmojiKey) -> Option<Arc<str>> {
    let path = dir.join(key.file_name());
    match tokio::fs::read_to_string(&path).await {
        Ok(text) if text.contains("<svg") => Some(Arc::from(text)),
        Ok(_) => {
            tracing::warn!(path = %path.display(), "ignoring malformed emoji cache file");
            None
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "emoji cache read failed");
            None
        }
    }
}

async fn write_disk(dir: &Path, key: &EmojiKey, svg: &str) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(key.file_name()), svg).await
}

/// Rewrite the root `<svg>` element to a square `size_px` box, keeping (or synthesizing) its
/// `viewBox` so the artwork scales instead of being cropped.
pub fn resize_svg_root(svg: &str, size_px: u32) -> Option<String> {
    markup::resize_root(
        svg,
        size_px,
        size_px,
        (DEFAULT_VIEWBOX_EDGE, DEFAULT_VIEWBOX_EDGE),
    )
    .ok()
}

#[cfg(test)]
#[path = "../../tests/unit/assets/emoji.rs"]
mod tests;
