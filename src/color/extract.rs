//! Dominant color of an encoded image.

use image::imageops::FilterType;

use crate::{
    foundation::error::{GlintError, GlintResult},
    render::raster::{Rasterizer, pixmap_to_rgba, render_tree},
};

/// Edge of the thumbnail colors are averaged over.
pub const SAMPLE_EDGE: u32 = 64;

/// Pixels at or above this alpha count as opaque.
pub const OPAQUE_ALPHA: u8 = 125;

/// Average color of an image, after downsampling to at most [`SAMPLE_EDGE`] pixels per side.
///
/// SVG input (by media type or sniffed `<svg`) is rasterized; everything else goes through the
/// `image` decoders.
pub fn dominant_color(bytes: &[u8], media_type: &str) -> GlintResult<[u8; 3]> {
    let sample = if media_type == "image/svg+xml" || looks_like_svg(bytes) {
        svg_sample(bytes)?
    } else {
        image::load_from_memory(bytes)
            .map_err(|e| GlintError::validation(format!("decode {media_type}: {e}")))?
            .resize(SAMPLE_EDGE, SAMPLE_EDGE, FilterType::Triangle)
            .to_rgba8()
    };
    average_rgba(sample.pixels().map(|p| p.0))
        .ok_or_else(|| GlintError::validation("image has no pixels"))
}

/// Mean RGB over pixels with alpha ≥ [`OPAQUE_ALPHA`], or over all pixels if none qualify.
pub fn average_rgba(pixels: impl Iterator<Item = [u8; 4]>) -> Option<[u8; 3]> {
    let mut opaque = [0u64; 4];
    let mut all = [0u64; 4];
    for [r, g, b, a] in pixels {
        for (acc, include) in [(&mut all, true), (&mut opaque, a >= OPAQUE_ALPHA)] {
            if include {
                acc[0] += u64::from(r);
                acc[1] += u64::from(g);
                acc[2] += u64::from(b);
                acc[3] += 1;
            }
        }
    }
    let [r, g, b, n] = if opaque[3] > 0 { opaque } else { all };
    if n == 0 {
        return None;
    }
    let avg = |sum: u64| ((sum as f64 / n as f64).round()) as u8;
    Some([avg(r), avg(g), avg(b)])
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    String::from_utf8_lossy(head).contains("<svg")
}

fn svg_sample(bytes: &[u8]) -> GlintResult<image::RgbaImage> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| GlintError::validation(format!("svg is not utf-8: {e}")))?;
    let tree = Rasterizer::default().parse(text)?;
    let size = tree.size();
    let scale = (SAMPLE_EDGE as f32 / size.width().max(size.height())).min(1.0);
    let w = ((size.width() * scale).round() as u32).max(1);
    let h = ((size.height() * scale).round() as u32).max(1);
    Ok(pixmap_to_rgba(&render_tree(&tree, w, h)?))
}

#[cfg(test)]
#[path = "../../tests/unit/color/extract.rs"]
mod tests;
