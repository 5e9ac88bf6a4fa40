//! `{{placeholder}}` SVG templates as a concrete [`Component`].
//!
//! Placeholders:
//!
//! - `{{path.to.prop}}`: sanitized prop value (colors live under `colors.*`)
//! - `{{t:key}}`: translation of `key`
//! - `{{emoji:😀}}`: emoji glyph as a data URI
//! - `{{image:path.to.url}}`: remote image behind a prop URL, as a data URI
//! - `{{$width}}` / `{{$height}}`: resolved dimensions
//! - `{{$gradient}}`: `<linearGradient id="glint-bg">` for the background gradient
//!
//! Every substituted value is XML-escaped. Unknown props and unavailable assets render as empty
//! strings.

use std::{fmt, path::Path, sync::Arc};

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;

use crate::{
    foundation::{
        error::{GlintError, GlintResult},
        markup,
    },
    render::{backend::LayoutContext, component::Component, props::SanitizedProps},
};

/// Element id of the gradient emitted by `{{$gradient}}`.
pub const GRADIENT_ID: &str = "glint-bg";

type SizeFn = Arc<dyn Fn(&Value) -> Option<(f64, f64)> + Send + Sync>;

/// An SVG document with placeholders.
#[derive(Clone)]
pub struct SvgTemplate {
    name: String,
    source: String,
    declared: Option<(f64, f64)>,
    size_fn: Option<SizeFn>,
}

impl fmt::Debug for SvgTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SvgTemplate")
            .field("name", &self.name)
            .field("declared", &self.declared)
            .field("size_fn", &self.size_fn.is_some())
            .finish()
    }
}

impl SvgTemplate {
    /// Build a template. The size is read from the root `width`/`height` when present.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> GlintResult<Self> {
        let name = name.into();
        let source = source.into();
        if let Some(pos) = unterminated_placeholder(&source) {
            return Err(GlintError::validation(format!(
                "template '{name}' has an unterminated placeholder at byte {pos}"
            )));
        }
        let declared = {
            let doc = markup::parse(&source).map_err(|e| {
                GlintError::validation(format!("template '{name}' is not well-formed: {e}"))
            })?;
            let root = markup::svg_root(&doc).ok_or_else(|| {
                GlintError::validation(format!("template '{name}' has no <svg> root"))
            })?;
            markup::declared_size(root)
        };
        Ok(Self {
            declared,
            name,
            source,
            size_fn: None,
        })
    }

    /// Load a template file; its stem becomes the component name.
    pub fn from_file(path: impl AsRef<Path>) -> GlintResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("read template '{}'", path.display()))?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("template")
            .to_string();
        Self::new(name, source)
    }

    /// Derive the size from props instead of (or before) the declared root size.
    pub fn with_size_fn(
        mut self,
        f: impl Fn(&Value) -> Option<(f64, f64)> + Send + Sync + 'static,
    ) -> Self {
        self.size_fn = Some(Arc::new(f));
        self
    }

    async fn resolve(
        &self,
        token: &str,
        props: &SanitizedProps,
        ctx: &LayoutContext<'_>,
    ) -> Option<String> {
        if let Some(key) = token.strip_prefix("t:") {
            return Some(props.translate(key.trim()).to_string());
        }
        if let Some(emoji) = token.strip_prefix("emoji:") {
            return ctx.emoji.load_data_uri(emoji.trim(), ctx.emoji_scale).await;
        }
        if let Some(path) = token.strip_prefix("image:") {
            let url = props.get(path.trim())?.as_str()?;
            let image = ctx.images.load(url).await?;
            return Some(image.data_uri.to_string());
        }
        match token {
            "$width" => Some(ctx.dimensions.width.to_string()),
            "$height" => Some(ctx.dimensions.height.to_string()),
            path => props.get(path).and_then(value_text),
        }
    }
}

#[async_trait]
impl Component for SvgTemplate {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self, props: &Value) -> Option<(f64, f64)> {
        self.size_fn
            .as_ref()
            .and_then(|f| f(props))
            .or(self.declared)
    }

    async fn markup(&self, props: &SanitizedProps, ctx: &LayoutContext<'_>) -> GlintResult<String> {
        let mut out = String::with_capacity(self.source.len());
        let mut rest = self.source.as_str();
        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            let Some(close) = after.find("}}") else {
                return Err(GlintError::layout(format!(
                    "template '{}' has an unterminated placeholder",
                    self.name
                )));
            };
            let token = after[..close].trim();
            if token == "$gradient" {
                out.push_str(&props.colors().background_gradient.to_svg(GRADIENT_ID));
            } else if let Some(text) = self.resolve(token, props, ctx).await {
                out.push_str(&markup::escape_xml(&text));
            } else {
                tracing::trace!(template = %self.name, token, "placeholder resolved to nothing");
            }
            rest = &after[close + 2..];
        }
        out.push_str(rest);

        if ctx.debug {
            out = add_debug_outline(&out, ctx)?;
        }

        markup::resize_root(
            &out,
            ctx.dimensions.width,
            ctx.dimensions.height,
            (ctx.dimensions.width as f32, ctx.dimensions.height as f32),
        )
        .map_err(|e| GlintError::layout(format!("template '{}' rendered bad markup: {e}", self.name)))
    }
}

fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        }),
        other => Some(other.to_string()),
    }
}

fn unterminated_placeholder(source: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(open) = source[from..].find("{{") {
        let at = from + open;
        match source[at + 2..].find("}}") {
            Some(close) => from = at + 2 + close + 2,
            None => return Some(at),
        }
    }
    None
}

fn add_debug_outline(svg: &str, ctx: &LayoutContext<'_>) -> GlintResult<String> {
    let outline = format!(
        r#"<rect x="0.5" y="0.5" width="{}" height="{}" fill="none" stroke="magenta" stroke-width="1"/>"#,
        ctx.dimensions.width.saturating_sub(1),
        ctx.dimensions.height.saturating_sub(1)
    );
    markup::append_to_root(svg, &outline)
}

#[cfg(test)]
#[path = "../../tests/unit/render/template.rs"]
mod tests;
