//! Palette derivation: perceptual color math, extraction, caching and per-request preparation.

pub mod extract;
/// Per-user palette cache.
pub mod gradient;
pub mod lab;
/// Palette types built from a dominant color.
pub mod palette;
/// Per-request palette source selection.
pub mod prepare;
/// URL-keyed palette extraction service.
pub mod service;
