//! Vector markup to RGBA rasters via `usvg` + `resvg`.

use std::sync::Arc;

use image::RgbaImage;

use crate::{
    foundation::{
        config::FontSource,
        error::{GlintError, GlintResult},
    },
    render::component::Dimensions,
};

/// Largest raster edge we are willing to allocate.
pub const MAX_RASTER_EDGE: u32 = 8_192;

/// Parses and rasterizes SVG markup against one shared font database.
pub struct Rasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
    default_family: Option<String>,
}

impl std::fmt::Debug for Rasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rasterizer")
            .field("faces", &self.fontdb.len())
            .field("default_family", &self.default_family)
            .finish()
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self {
            fontdb: Arc::new(usvg::fontdb::Database::new()),
            default_family: None,
        }
    }
}

impl Rasterizer {
    /// Load `fonts` (and optionally system fonts). Unreadable font files are logged and skipped.
    pub fn new(fonts: &[FontSource], system_fonts: bool) -> Self {
        let mut db = usvg::fontdb::Database::new();
        if system_fonts {
            db.load_system_fonts();
        }
        for font in fonts {
            match db.load_font_file(&font.path) {
                Ok(()) => tracing::debug!(
                    family = %font.family,
                    weight = font.weight,
                    path = %font.path.display(),
                    "loaded font"
                ),
                Err(err) => tracing::warn!(
                    family = %font.family,
                    path = %font.path.display(),
                    %err,
                    "failed to load font"
                ),
            }
        }
        Self {
            fontdb: Arc::new(db),
            default_family: fonts.first().map(|f| f.family.clone()),
        }
    }

    /// Number of loaded font faces.
    pub fn face_count(&self) -> usize {
        self.fontdb.len()
    }

    fn options(&self) -> usvg::Options<'static> {
        let mut opts = usvg::Options {
            fontdb: Arc::clone(&self.fontdb),
            ..Default::default()
        };
        if let Some(family) = &self.default_family {
            opts.font_family = family.clone();
        }
        opts
    }

    /// Parse markup into a render tree.
    ///
    /// A document whose size cannot be determined maps to [`GlintError::ImageSize`].
    pub fn parse(&self, markup: &str) -> GlintResult<usvg::Tree> {
        usvg::Tree::from_data(markup.as_bytes(), &self.options()).map_err(|e| match e {
            usvg::Error::InvalidSize => {
                GlintError::image_size("svg document has no usable width/height")
            }
            other => GlintError::layout(format!("parse svg: {other}")),
        })
    }

    /// Rasterize `markup` into a `dims * scale` straight-alpha RGBA image.
    pub fn rasterize(&self, markup: &str, dims: Dimensions, scale: f32) -> GlintResult<RgbaImage> {
        let tree = self.parse(markup)?;
        let width = scaled_edge(dims.width, scale)?;
        let height = scaled_edge(dims.height, scale)?;
        let pixmap = render_tree(&tree, width, height)?;
        Ok(pixmap_to_rgba(&pixmap))
    }
}

fn scaled_edge(edge: u32, scale: f32) -> GlintResult<u32> {
    let px = (edge as f32 * scale).round();
    if !px.is_finite() || px < 1.0 {
        return Err(GlintError::image_size(format!(
            "raster edge {edge} x {scale} is not positive"
        )));
    }
    if px > MAX_RASTER_EDGE as f32 {
        return Err(GlintError::raster(format!(
            "raster edge {px} exceeds {MAX_RASTER_EDGE}"
        )));
    }
    Ok(px as u32)
}

/// Render `tree` stretched to exactly `width` x `height` pixels.
pub fn render_tree(
    tree: &usvg::Tree,
    width: u32,
    height: u32,
) -> GlintResult<resvg::tiny_skia::Pixmap> {
    let size = tree.size();
    if !(size.width() > 0.0 && size.height() > 0.0) {
        return Err(GlintError::image_size("svg tree has zero size"));
    }
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
        GlintError::raster(format!("failed to allocate {width}x{height} pixmap"))
    })?;

    let sx = width as f32 / size.width();
    let sy = height as f32 / size.height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);
    resvg::render(tree, xform, &mut pixmap.as_mut());
    Ok(pixmap)
}

/// Convert a premultiplied pixmap into a straight-alpha image.
pub fn pixmap_to_rgba(pixmap: &resvg::tiny_skia::Pixmap) -> RgbaImage {
    let mut out = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
