use serde::{Serialize, Serializer};

use crate::{
    cache::expiring::EstimateSize,
    color::lab::{derive_secondary, enhance, luminance},
};

/// Dominant color used whenever no usable source image or RGB input exists (steel blue).
pub const DEFAULT_DOMINANT_RGB: [u8; 3] = [70, 130, 180];

/// Text is dark when the background's relative luminance is above this threshold.
pub const DARK_TEXT_LUMINANCE_THRESHOLD: f64 = 0.5;

const GRADIENT_ANGLE_DEG: f32 = 135.0;
const SECONDARY_TEXT_ALPHA: f32 = 0.7;
const TERTIARY_TEXT_ALPHA: f32 = 0.5;
const OVERLAY_ALPHA: f32 = 0.15;

/// Straight-alpha sRGB color. Serializes as a CSS color string.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha in `0.0..=1.0`.
    pub a: f32,
}

impl Rgba {
    /// Opaque color from an RGB triple.
    pub fn opaque(rgb: [u8; 3]) -> Self {
        Self::with_alpha(rgb, 1.0)
    }

    /// Color from an RGB triple and alpha.
    pub fn with_alpha(rgb: [u8; 3], a: f32) -> Self {
        Self {
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
            a: a.clamp(0.0, 1.0),
        }
    }

    /// RGB channels.
    pub fn rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// CSS functional notation: `rgb(r, g, b)` when opaque, `rgba(r, g, b, a)` otherwise.
    pub fn to_css(self) -> String {
        if self.a >= 1.0 {
            format!("rgb({}, {}, {})", self.r, self.g, self.b)
        } else {
            format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }

    /// `#rrggbb` (alpha dropped).
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_css())
    }
}

/// One stop of a linear gradient.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientStop {
    /// Stop color.
    pub color: Rgba,
    /// Offset in `0.0..=1.0`.
    pub offset: f32,
}

/// Linear gradient description. Serializes as a CSS `linear-gradient(...)` string.
#[derive(Clone, Debug, PartialEq)]
pub struct GradientSpec {
    /// CSS angle in degrees (0 points up, 90 points right).
    pub angle_deg: f32,
    /// Ordered color stops.
    pub stops: Vec<GradientStop>,
}

impl GradientSpec {
    /// CSS text, e.g. `linear-gradient(135deg, rgb(..) 0%, rgb(..) 100%)`.
    pub fn to_css(&self) -> String {
        let mut out = format!("linear-gradient({}deg", self.angle_deg);
        for stop in &self.stops {
            out.push_str(&format!(
                ", {} {}%",
                stop.color.to_css(),
                (stop.offset * 100.0).round()
            ));
        }
        out.push(')');
        out
    }

    /// SVG `<linearGradient>` element in bounding-box units, referencable as `url(#id)`.
    pub fn to_svg(&self, id: &str) -> String {
        let rad = f64::from(self.angle_deg).to_radians();
        let (dx, dy) = (0.5 * rad.sin(), -0.5 * rad.cos());
        let mut out = format!(
            r#"<linearGradient id="{id}" x1="{:.4}" y1="{:.4}" x2="{:.4}" y2="{:.4}">"#,
            0.5 - dx,
            0.5 - dy,
            0.5 + dx,
            0.5 + dy
        );
        for stop in &self.stops {
            out.push_str(&format!(
                r#"<stop offset="{}" stop-color="{}" stop-opacity="{}"/>"#,
                stop.offset,
                stop.color.to_hex(),
                stop.color.a
            ));
        }
        out.push_str("</linearGradient>");
        out
    }
}

impl Serialize for GradientSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_css())
    }
}

/// Themed palette derived from a single dominant color.
///
/// Immutable once built; caches and the render pipeline share it by value.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorResult {
    /// Primary text color.
    pub text_color: Rgba,
    /// Secondary text color (70% alpha).
    pub secondary_text_color: Rgba,
    /// Tertiary text color (50% alpha).
    pub tertiary_text_color: Rgba,
    /// `true` when the background is light and text should be dark.
    pub is_dark_text: bool,
    /// Dominant to secondary background gradient.
    pub background_gradient: GradientSpec,
    /// Enhanced dominant color.
    pub dominant_color: Rgba,
    /// Harmonious accent derived from the dominant color.
    pub secondary_color: Rgba,
    /// Translucent panel color that contrasts with the text.
    pub overlay_background: Rgba,
    /// Dominant color packed as `#rrggbb`, for message embeds.
    pub embed_color: String,
}

impl ColorResult {
    /// Build a palette around an already-enhanced dominant color.
    pub fn from_dominant(dominant: [u8; 3]) -> Self {
        let secondary = derive_secondary(dominant);
        let is_dark_text = luminance(dominant) > DARK_TEXT_LUMINANCE_THRESHOLD;
        let (text, opposite) = if is_dark_text {
            ([0, 0, 0], [255, 255, 255])
        } else {
            ([255, 255, 255], [0, 0, 0])
        };

        let dominant_color = Rgba::opaque(dominant);
        let secondary_color = Rgba::opaque(secondary);

        Self {
            text_color: Rgba::opaque(text),
            secondary_text_color: Rgba::with_alpha(text, SECONDARY_TEXT_ALPHA),
            tertiary_text_color: Rgba::with_alpha(text, TERTIARY_TEXT_ALPHA),
            is_dark_text,
            background_gradient: GradientSpec {
                angle_deg: GRADIENT_ANGLE_DEG,
                stops: vec![
                    GradientStop {
                        color: dominant_color,
                        offset: 0.0,
                    },
                    GradientStop {
                        color: secondary_color,
                        offset: 1.0,
                    },
                ],
            },
            dominant_color,
            secondary_color,
            overlay_background: Rgba::with_alpha(opposite, OVERLAY_ALPHA),
            embed_color: dominant_color.to_hex(),
        }
    }

    /// Enhance a raw RGB input and build its palette.
    pub fn from_rgb(raw: [u8; 3]) -> Self {
        Self::from_dominant(enhance(raw))
    }

    /// The fixed fallback palette.
    pub fn default_palette() -> Self {
        Self::from_dominant(DEFAULT_DOMINANT_RGB)
    }

    /// Embed color as a packed `0xRRGGBB` integer.
    pub fn embed_color_value(&self) -> u32 {
        let [r, g, b] = self.dominant_color.rgb();
        (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
    }
}

impl Default for ColorResult {
    fn default() -> Self {
        Self::default_palette()
    }
}

impl EstimateSize for ColorResult {
    fn estimated_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.embed_color.len()
            + self.background_gradient.stops.len() * std::mem::size_of::<GradientStop>()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/color/palette.rs"]
mod tests;
