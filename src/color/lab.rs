//! Perceptual color math: sRGB <-> CIE XYZ (D65) <-> CIE L*a*b*.
//!
//! All RGB values are 8-bit sRGB triples. LAB values use the usual ranges (`l` in `0..=100`,
//! `a`/`b` roughly `-128..=127`).

/// CIE L*a*b* color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lab {
    /// Lightness.
    pub l: f64,
    /// Green/red axis.
    pub a: f64,
    /// Blue/yellow axis.
    pub b: f64,
}

impl Lab {
    /// Chroma (distance from the neutral axis).
    pub fn chroma(self) -> f64 {
        self.a.hypot(self.b)
    }
}

const EPSILON: f64 = 216.0 / 24389.0;
const KAPPA: f64 = 24389.0 / 27.0;

// D65 reference white, equal to the row sums of `RGB_TO_XYZ`.
const WHITE_X: f64 = 0.950_47;
const WHITE_Y: f64 = 1.0;
const WHITE_Z: f64 = 1.088_83;

const RGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.412_456_4, 0.357_576_1, 0.180_437_5],
    [0.212_672_9, 0.715_152_2, 0.072_175_0],
    [0.019_333_9, 0.119_192_0, 0.950_304_1],
];

const XYZ_TO_RGB: [[f64; 3]; 3] = [
    [3.240_454_2, -1.537_138_5, -0.498_531_4],
    [-0.969_266_0, 1.876_010_8, 0.041_556_0],
    [0.055_643_4, -0.204_025_9, 1.057_225_2],
];

/// Channels at or above this value on all three axes snap to pure white.
const WHITE_SNAP: u8 = 252;
/// Channels at or below this value on all three axes snap to pure black.
const BLACK_SNAP: u8 = 8;
const NEAR_WHITE: u8 = 245;
const NEAR_BLACK: u8 = 20;

const LIGHTNESS_NUDGE: f64 = 2.0;
const CHROMA_BOOST: f64 = 1.5;
const MAX_CHROMA: f64 = 50.0;

const SECONDARY_HUE_SHIFT_DEG: f64 = 30.0;
const SECONDARY_CHROMA_FACTOR: f64 = 0.9;
const SECONDARY_LIGHTNESS_OFFSET: f64 = 15.0;

fn srgb_to_linear(c: u8) -> f64 {
    let c = f64::from(c) / 255.0;
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f64) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let v = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

fn mat_mul(m: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

fn lab_f(t: f64) -> f64 {
    if t > EPSILON {
        t.cbrt()
    } else {
        (KAPPA * t + 16.0) / 116.0
    }
}

/// Convert an sRGB triple to L*a*b*.
pub fn to_lab(rgb: [u8; 3]) -> Lab {
    let linear = [
        srgb_to_linear(rgb[0]),
        srgb_to_linear(rgb[1]),
        srgb_to_linear(rgb[2]),
    ];
    let [x, y, z] = mat_mul(&RGB_TO_XYZ, linear);

    let fx = lab_f(x / WHITE_X);
    let fy = lab_f(y / WHITE_Y);
    let fz = lab_f(z / WHITE_Z);

    Lab {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

/// Convert L*a*b* back to an sRGB triple, clamping out-of-gamut values.
pub fn to_rgb(lab: Lab) -> [u8; 3] {
    let fy = (lab.l + 16.0) / 116.0;
    let fx = fy + lab.a / 500.0;
    let fz = fy - lab.b / 200.0;

    let xr = if fx.powi(3) > EPSILON {
        fx.powi(3)
    } else {
        (116.0 * fx - 16.0) / KAPPA
    };
    let yr = if lab.l > KAPPA * EPSILON {
        fy.powi(3)
    } else {
        lab.l / KAPPA
    };
    let zr = if fz.powi(3) > EPSILON {
        fz.powi(3)
    } else {
        (116.0 * fz - 16.0) / KAPPA
    };

    let [r, g, b] = mat_mul(&XYZ_TO_RGB, [xr * WHITE_X, yr * WHITE_Y, zr * WHITE_Z]);
    [linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(b)]
}

/// sRGB relative luminance in `0.0..=1.0`.
pub fn luminance(rgb: [u8; 3]) -> f64 {
    0.2126 * srgb_to_linear(rgb[0]) + 0.7152 * srgb_to_linear(rgb[1]) + 0.0722 * srgb_to_linear(rgb[2])
}

/// Boost saturation and contrast of a dominant color so it reads well as a background.
///
/// Near-neutral extremes are handled without going through LAB: all channels `>= 252` return
/// exact white, all channels `<= 8` exact black, and near-white / near-black inputs only get
/// pulled halfway toward their own gray.
pub fn enhance(rgb: [u8; 3]) -> [u8; 3] {
    if rgb.iter().all(|&c| c >= WHITE_SNAP) {
        return [255, 255, 255];
    }
    if rgb.iter().all(|&c| c <= BLACK_SNAP) {
        return [0, 0, 0];
    }
    if rgb.iter().all(|&c| c > NEAR_WHITE) || rgb.iter().all(|&c| c < NEAR_BLACK) {
        return neutralize(rgb);
    }

    let mut lab = to_lab(rgb);
    lab.l = if lab.l > 50.0 {
        lab.l + LIGHTNESS_NUDGE
    } else {
        lab.l - LIGHTNESS_NUDGE
    }
    .clamp(2.0, 98.0);

    lab.a *= CHROMA_BOOST;
    lab.b *= CHROMA_BOOST;
    let chroma = lab.chroma();
    if chroma > MAX_CHROMA {
        let k = MAX_CHROMA / chroma;
        lab.a *= k;
        lab.b *= k;
    }

    to_rgb(lab)
}

fn neutralize(rgb: [u8; 3]) -> [u8; 3] {
    let avg = (u16::from(rgb[0]) + u16::from(rgb[1]) + u16::from(rgb[2])) as f64 / 3.0;
    rgb.map(|c| ((f64::from(c) + avg) / 2.0).round() as u8)
}

/// Derive a harmonious accent from an (already enhanced) color.
///
/// Rotates the LAB hue by 30 degrees, drops chroma by 10% and moves lightness 15 units toward
/// the opposite end of the scale.
pub fn derive_secondary(rgb: [u8; 3]) -> [u8; 3] {
    let lab = to_lab(rgb);
    let chroma = lab.chroma() * SECONDARY_CHROMA_FACTOR;
    let hue = lab.b.atan2(lab.a) + SECONDARY_HUE_SHIFT_DEG.to_radians();
    let l = if lab.l > 50.0 {
        lab.l - SECONDARY_LIGHTNESS_OFFSET
    } else {
        lab.l + SECONDARY_LIGHTNESS_OFFSET
    }
    .clamp(0.0, 100.0);

    to_rgb(Lab {
        l,
        a: chroma * hue.cos(),
        b: chroma * hue.sin(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/color/lab.rs"]
mod tests;
