//! Glint renders data-driven UI cards into compressed images on demand.
//!
//! The rendering itself is small; most of the crate is the runtime around it:
//!
//! - palettes derived from a dominant color, cached per URL and per user
//! - concurrent identical work collapsed into one computation
//! - per-key throttling where queued callers share the newest arguments' result
//! - a layout → vector → raster → bytes pipeline with backend and size fallbacks
//!
//! Start from [`Engine`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Remote asset loading.
pub mod assets;
/// Expiring cache and in-flight deduplication.
pub mod cache;
/// Color math, extraction and palette caches.
pub mod color;
/// Raster encoders.
pub mod encode;
mod engine;
/// Errors, configuration and markup helpers.
pub mod foundation;
/// Components, backends and the render pipeline.
pub mod render;
/// Throttling.
pub mod schedule;

pub use crate::assets::fetch::{FetchedResource, Fetcher, ReqwestFetcher, StaticFetcher};
pub use crate::cache::expiring::CacheMetrics;
pub use crate::color::palette::{ColorResult, DEFAULT_DOMINANT_RGB};
pub use crate::encode::image_encode::{EncodeSettings, OutputFormat};
pub use crate::engine::{Engine, RenderOptions};
pub use crate::foundation::config::EngineConfig;
pub use crate::foundation::error::{GlintError, GlintResult};
pub use crate::render::component::{Component, Dimensions};
pub use crate::render::pipeline::{RenderArgs, RenderedImage, Scaling};
pub use crate::render::props::LocaleBinding;
pub use crate::render::template::SvgTemplate;
