use std::sync::Arc;

use serde_json::Value;

use crate::{
    assets::{
        emoji::{EmojiLoader, clamp_emoji_scale},
        image_loader::ImageLoader,
    },
    color::{palette::ColorResult, prepare::ColorPreparer},
    encode::image_encode::{EncodeSettings, OutputFormat, encode_rgba},
    foundation::error::{GlintError, GlintResult},
    render::{
        backend::{LayoutBackend, LayoutContext, LayoutOutput},
        component::{Component, Dimensions, resolve_dimensions},
        props::{LocaleBinding, SanitizedProps, sanitize_props},
        raster::Rasterizer,
    },
};

/// Output resolution knobs.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Scaling {
    /// Device pixel ratio, at least 1.
    pub image_scale: f32,
    /// Emoji size multiplier, clamped to `0.5..=3.0`.
    pub emoji_scale: f32,
    /// Draw layout debug outlines.
    pub debug: bool,
}

impl Default for Scaling {
    fn default() -> Self {
        Self {
            image_scale: 2.0,
            emoji_scale: 1.0,
            debug: false,
        }
    }
}

impl Scaling {
    /// Clamp both scales into their supported ranges.
    pub fn normalized(self) -> Self {
        let image_scale = if self.image_scale.is_finite() {
            self.image_scale.max(1.0)
        } else {
            1.0
        };
        Self {
            image_scale,
            emoji_scale: clamp_emoji_scale(self.emoji_scale),
            debug: self.debug,
        }
    }
}

/// One render request. Later requests for the same throttle key replace it wholesale.
#[derive(Clone)]
pub struct RenderArgs {
    /// What to render.
    pub component: Arc<dyn Component>,
    /// Caller props, unsanitized.
    pub props: Value,
    /// Resolution knobs.
    pub scaling: Scaling,
    /// Locale for `t:` lookups.
    pub locale: LocaleBinding,
}

impl std::fmt::Debug for RenderArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderArgs")
            .field("component", &self.component.name())
            .field("props", &self.props)
            .field("scaling", &self.scaling)
            .field("locale", &self.locale.locale)
            .finish()
    }
}

impl RenderArgs {
    /// Request with default scaling and an empty locale.
    pub fn new(component: Arc<dyn Component>, props: Value) -> Self {
        Self {
            component,
            props,
            scaling: Scaling::default(),
            locale: LocaleBinding::default(),
        }
    }

    /// Override scaling.
    pub fn with_scaling(mut self, scaling: Scaling) -> Self {
        self.scaling = scaling;
        self
    }

    /// Override the locale binding.
    pub fn with_locale(mut self, locale: LocaleBinding) -> Self {
        self.locale = locale;
        self
    }
}

/// A finished render.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedImage {
    /// Encoded image bytes, never empty.
    pub bytes: Vec<u8>,
    /// Palette the image was themed with.
    pub colors: ColorResult,
    /// Size actually rendered (before the image scale).
    pub dimensions: Dimensions,
    /// Container of `bytes`.
    pub format: OutputFormat,
}

/// Shared services the pipeline draws on.
#[derive(Clone, Debug)]
pub struct PipelineParts {
    /// Remote images.
    pub images: Arc<ImageLoader>,
    /// Emoji glyphs.
    pub emoji: Arc<EmojiLoader>,
    /// Fonts and rasterization.
    pub rasterizer: Arc<Rasterizer>,
    /// Palette resolution.
    pub colors: ColorPreparer,
    /// Output encoding.
    pub encode: EncodeSettings,
    /// Size used for unusable component sizes and the image-size retry.
    pub fallback: Dimensions,
}

/// Colors, dimensions, props, layout, raster, encode.
pub struct RenderPipeline {
    parts: PipelineParts,
    primary: Arc<dyn LayoutBackend>,
    alternate: Option<Arc<dyn LayoutBackend>>,
}

impl std::fmt::Debug for RenderPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPipeline")
            .field("primary", &self.primary.name())
            .field("alternate", &self.alternate.as_ref().map(|b| b.name()))
            .field("fallback", &self.parts.fallback)
            .finish()
    }
}

impl RenderPipeline {
    /// Build a pipeline. `alternate` is tried first and may fail freely.
    pub fn new(
        parts: PipelineParts,
        primary: Arc<dyn LayoutBackend>,
        alternate: Option<Arc<dyn LayoutBackend>>,
    ) -> Self {
        Self {
            parts,
            primary,
            alternate,
        }
    }

    /// Run one request end to end.
    ///
    /// An [`GlintError::ImageSize`] failure is retried once at the fallback size. Any failure
    /// that survives comes back as [`GlintError::Render`] carrying the sanitized props.
    #[tracing::instrument(skip(self, args), fields(component = args.component.name()))]
    pub async fn render(&self, args: &RenderArgs) -> GlintResult<RenderedImage> {
        let component = args.component.as_ref();
        let scaling = args.scaling.normalized();
        let colors = self.parts.colors.prepare(&args.props).await;
        let dims = resolve_dimensions(component, &args.props, self.parts.fallback);
        let props = sanitize_props(&args.props, &colors, &args.locale);

        let wrap = |err: GlintError| GlintError::Render {
            component: component.name().to_string(),
            props: props.value().clone(),
            source: Box::new(err),
        };

        let (bytes, dimensions) = match self.attempt(component, &props, dims, scaling).await {
            Ok(bytes) => (bytes, dims),
            Err(err) if err.is_image_size() => {
                let fallback = self.parts.fallback;
                tracing::warn!(%err, ?dims, ?fallback, "image size failure; retrying at fallback size");
                let bytes = self
                    .attempt(component, &props, fallback, scaling)
                    .await
                    .map_err(wrap)?;
                (bytes, fallback)
            }
            Err(err) => return Err(wrap(err)),
        };

        tracing::debug!(len = bytes.len(), ?dimensions, "render finished");
        Ok(RenderedImage {
            bytes,
            colors,
            dimensions,
            format: self.parts.encode.format,
        })
    }

    async fn attempt(
        &self,
        component: &dyn Component,
        props: &SanitizedProps,
        dims: Dimensions,
        scaling: Scaling,
    ) -> GlintResult<Vec<u8>> {
        let ctx = LayoutContext {
            dimensions: dims,
            image_scale: scaling.image_scale,
            emoji_scale: scaling.emoji_scale,
            debug: scaling.debug,
            images: &self.parts.images,
            emoji: &self.parts.emoji,
            rasterizer: &self.parts.rasterizer,
            encode: &self.parts.encode,
        };

        if let Some(alternate) = &self.alternate {
            match alternate.layout(component, props, &ctx).await {
                Ok(output) => match self.finish(output, dims, scaling).await {
                    Ok(bytes) => return Ok(bytes),
                    Err(err) => tracing::debug!(
                        backend = alternate.name(),
                        %err,
                        "alternate output unusable; using primary backend"
                    ),
                },
                Err(err) => tracing::debug!(
                    backend = alternate.name(),
                    %err,
                    "alternate backend failed; using primary backend"
                ),
            }
        }

        let output = self.primary.layout(component, props, &ctx).await?;
        self.finish(output, dims, scaling).await
    }

    async fn finish(
        &self,
        output: LayoutOutput,
        dims: Dimensions,
        scaling: Scaling,
    ) -> GlintResult<Vec<u8>> {
        let bytes = match output {
            LayoutOutput::Encoded(bytes) => bytes,
            LayoutOutput::Vector(markup) => {
                let rasterizer = Arc::clone(&self.parts.rasterizer);
                let encode = self.parts.encode;
                tokio::task::spawn_blocking(move || {
                    let img = rasterizer.rasterize(&markup, dims, scaling.image_scale)?;
                    encode_rgba(&img, &encode)
                })
                .await
                .map_err(|e| GlintError::raster(format!("raster task failed: {e}")))??
            }
        };
        if bytes.is_empty() {
            return Err(GlintError::encode("layout produced an empty image"));
        }
        Ok(bytes)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
