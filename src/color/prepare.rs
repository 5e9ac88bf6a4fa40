use std::sync::Arc;

use serde_json::Value;

use crate::color::{gradient::GradientCache, palette::ColorResult, service::ColorService};

/// Where a request's dominant color comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColorSource {
    /// An explicit `[r, g, b]` in `props.dominantColor`.
    Direct([u8; 3]),
    /// A user's image, cached per user.
    User {
        /// Requester identity.
        user_id: String,
        /// Image to extract from.
        image_url: String,
    },
    /// An image not tied to a user.
    Image(String),
    /// Nothing usable.
    Default,
}

impl ColorSource {
    /// Inspect props: `dominantColor`, else `imageUrl`/`avatarUrl` (with `userId` when present).
    pub fn from_props(props: &Value) -> Self {
        if let Some(rgb) = props.get("dominantColor").and_then(rgb_triplet) {
            return Self::Direct(rgb);
        }
        let image_url = ["imageUrl", "avatarUrl"]
            .into_iter()
            .filter_map(|k| props.get(k).and_then(Value::as_str))
            .map(str::trim)
            .find(|s| !s.is_empty());
        match (image_url, props.get("userId").and_then(user_id)) {
            (Some(url), Some(user_id)) => Self::User {
                user_id,
                image_url: url.to_string(),
            },
            (Some(url), None) => Self::Image(url.to_string()),
            (None, _) => Self::Default,
        }
    }
}

/// Resolves the palette for a render request.
#[derive(Clone, Debug)]
pub struct ColorPreparer {
    colors: Arc<ColorService>,
    gradients: Arc<GradientCache>,
}

impl ColorPreparer {
    /// Wire the URL- and user-keyed layers together.
    pub fn new(colors: Arc<ColorService>, gradients: Arc<GradientCache>) -> Self {
        Self { colors, gradients }
    }

    /// Palette for `props`. Never fails; missing inputs yield the default palette.
    pub async fn prepare(&self, props: &Value) -> ColorResult {
        match ColorSource::from_props(props) {
            ColorSource::Direct(rgb) => ColorResult::from_rgb(rgb),
            ColorSource::User { user_id, image_url } => {
                self.gradients.get_or_compute(&user_id, &image_url).await
            }
            ColorSource::Image(url) => self.colors.process_image_colors(&url).await,
            ColorSource::Default => ColorResult::default_palette(),
        }
    }
}

fn rgb_triplet(v: &Value) -> Option<[u8; 3]> {
    let arr = v.as_array()?;
    if arr.len() != 3 {
        return None;
    }
    let mut out = [0u8; 3];
    for (slot, c) in out.iter_mut().zip(arr) {
        let c = c.as_f64()?;
        if !(0.0..=255.0).contains(&c) {
            return None;
        }
        *slot = c.round() as u8;
    }
    Some(out)
}

/// Accepts string or numeric ids (chat platforms hand out both).
pub(crate) fn user_id(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/color/prepare.rs"]
mod tests;
