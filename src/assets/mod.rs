//! Remote assets: fetching, cache keys, images and emoji glyphs.

pub mod emoji;
pub mod fetch;
/// Validated remote images as data URIs.
pub mod image_loader;
/// Cache-key canonicalization for URLs.
pub mod url_key;
