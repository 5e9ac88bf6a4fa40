//! Raster to compressed bytes.

/// PNG, JPEG and WebP encoding via `image`.
pub mod image_encode;
