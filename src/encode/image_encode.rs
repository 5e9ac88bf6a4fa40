use std::io::Cursor;

use image::{
    RgbaImage,
    codecs::{
        jpeg::JpegEncoder,
        png::{CompressionType, FilterType, PngEncoder},
        webp::WebPEncoder,
    },
};
use serde::{Deserialize, Serialize};

use crate::foundation::error::{GlintError, GlintResult};

/// Compressed output container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Lossless PNG.
    Png,
    /// Baseline JPEG; alpha is flattened away.
    Jpeg,
    /// Lossless WebP.
    #[default]
    Webp,
}

impl OutputFormat {
    /// MIME type of the produced bytes.
    pub fn media_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    /// Conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }

    /// Guess from a file extension (`png`, `jpg`/`jpeg`, `webp`).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }
}

/// Encoder knobs.
///
/// `quality` applies to JPEG; `effort` picks the PNG compression level. WebP output is lossless
/// and ignores both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeSettings {
    /// Output container.
    pub format: OutputFormat,
    /// JPEG quality, 1..=100.
    pub quality: u8,
    /// Compression effort, 0..=9.
    pub effort: u8,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            quality: 90,
            effort: 4,
        }
    }
}

impl EncodeSettings {
    /// Reject out-of-range knobs.
    pub fn validate(&self) -> GlintResult<()> {
        if !(1..=100).contains(&self.quality) {
            return Err(GlintError::config("encode.quality must be in 1..=100"));
        }
        if self.effort > 9 {
            return Err(GlintError::config("encode.effort must be in 0..=9"));
        }
        Ok(())
    }

    fn png_compression(&self) -> CompressionType {
        match self.effort {
            0..=2 => CompressionType::Fast,
            3..=6 => CompressionType::Default,
            _ => CompressionType::Best,
        }
    }
}

/// Encode a straight-alpha RGBA raster. The result is never empty.
pub fn encode_rgba(img: &RgbaImage, settings: &EncodeSettings) -> GlintResult<Vec<u8>> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(GlintError::encode("cannot encode an empty raster"));
    }

    let mut buf = Vec::new();
    let mut cursor = Cursor::new(&mut buf);
    let res = match settings.format {
        OutputFormat::Png => img.write_with_encoder(PngEncoder::new_with_quality(
            &mut cursor,
            settings.png_compression(),
            FilterType::Adaptive,
        )),
        OutputFormat::Jpeg => {
            let rgb = image::DynamicImage::ImageRgba8(img.clone()).to_rgb8();
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut cursor, settings.quality))
        }
        OutputFormat::Webp => img.write_with_encoder(WebPEncoder::new_lossless(&mut cursor)),
    };
    res.map_err(|e| {
        GlintError::encode(format!(
            "{:?} {width}x{height}: {e}",
            settings.format
        ))
    })?;

    if buf.is_empty() {
        return Err(GlintError::encode(format!(
            "{:?} encoder produced no bytes",
            settings.format
        )));
    }
    Ok(buf)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/image_encode.rs"]
mod tests;
