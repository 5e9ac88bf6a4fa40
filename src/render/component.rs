use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    foundation::error::GlintResult,
    render::{backend::LayoutContext, props::SanitizedProps},
};

/// Output size in CSS pixels, before the image scale is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Size substituted whenever a component's own size is unusable.
    pub const FALLBACK: Self = Self {
        width: 800,
        height: 400,
    };

    /// Construct a size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both edges are non-zero.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Round a computed `(width, height)` up to whole pixels, rejecting non-finite or
    /// non-positive values.
    pub fn from_computed(width: f64, height: f64) -> Option<Self> {
        let edge = |v: f64| {
            (v.is_finite() && v > 0.0 && v <= f64::from(u32::MAX)).then(|| v.ceil() as u32)
        };
        Some(Self::new(edge(width)?, edge(height)?))
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::FALLBACK
    }
}

/// A renderable unit: a declared or prop-derived size plus markup as a pure function of props.
#[async_trait]
pub trait Component: Send + Sync {
    /// Stable name, used in throttle keys and error reports.
    fn name(&self) -> &str;

    /// Requested size for `props` (unsanitized). `None` means "no opinion".
    fn size(&self, props: &serde_json::Value) -> Option<(f64, f64)>;

    /// Produce SVG markup sized to `ctx.dimensions`.
    async fn markup(&self, props: &SanitizedProps, ctx: &LayoutContext<'_>) -> GlintResult<String>;
}

/// Resolve the output size for `props`, substituting `fallback` for anything unusable.
pub fn resolve_dimensions(
    component: &dyn Component,
    props: &serde_json::Value,
    fallback: Dimensions,
) -> Dimensions {
    match component.size(props) {
        Some((w, h)) => Dimensions::from_computed(w, h).unwrap_or_else(|| {
            tracing::debug!(
                component = component.name(),
                w,
                h,
                "unusable component size; using fallback"
            );
            fallback
        }),
        None => fallback,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/component.rs"]
mod tests;
