//! Layout backends: turn a component plus props into vector markup or final bytes.

use std::{collections::HashMap, io::Cursor, sync::Arc};

use async_trait::async_trait;
use roxmltree::{Attribute, Document, Node};

use crate::{
    assets::{
        emoji::EmojiLoader,
        image_loader::{ImageLoader, LoadedImage},
    },
    encode::image_encode::{EncodeSettings, encode_rgba},
    foundation::{
        error::{GlintError, GlintResult},
        markup::{self, Splice},
    },
    render::{
        component::{Component, Dimensions},
        props::SanitizedProps,
        raster::Rasterizer,
    },
};

/// Everything a layout pass may use besides the props.
#[derive(Clone, Copy, Debug)]
pub struct LayoutContext<'a> {
    /// Target size in CSS pixels.
    pub dimensions: Dimensions,
    /// Device pixel ratio applied at raster time.
    pub image_scale: f32,
    /// Clamped emoji scale.
    pub emoji_scale: f32,
    /// Draw debug outlines.
    pub debug: bool,
    /// Remote image loader.
    pub images: &'a ImageLoader,
    /// Emoji glyph loader.
    pub emoji: &'a EmojiLoader,
    /// Shared rasterizer (fonts).
    pub rasterizer: &'a Arc<Rasterizer>,
    /// Output encoding.
    pub encode: &'a EncodeSettings,
}

/// What a backend produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutOutput {
    /// Scalable markup still to be rasterized and encoded.
    Vector(String),
    /// Final encoded bytes.
    Encoded(Vec<u8>),
}

/// One way of running layout.
#[async_trait]
pub trait LayoutBackend: Send + Sync {
    /// Name for logs.
    fn name(&self) -> &'static str;

    /// Lay `component` out with `props`.
    async fn layout(
        &self,
        component: &dyn Component,
        props: &SanitizedProps,
        ctx: &LayoutContext<'_>,
    ) -> GlintResult<LayoutOutput>;
}

/// Primary backend: component markup with remote `<image>` references inlined as data URIs.
///
/// Embedded images without explicit `width`/`height` get their intrinsic size written in; when
/// that size cannot be read the pass fails with [`GlintError::ImageSize`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SvgBackend;

#[async_trait]
impl LayoutBackend for SvgBackend {
    fn name(&self) -> &'static str {
        "svg"
    }

    async fn layout(
        &self,
        component: &dyn Component,
        props: &SanitizedProps,
        ctx: &LayoutContext<'_>,
    ) -> GlintResult<LayoutOutput> {
        let markup = component.markup(props, ctx).await?;
        let markup = inline_remote_images(&markup, ctx.images).await?;
        Ok(LayoutOutput::Vector(markup))
    }
}

/// Alternate backend: markup is parsed, rasterized and encoded in a single blocking task.
///
/// Markup that still references remote resources is refused so the primary backend can resolve
/// them.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectBackend;

#[async_trait]
impl LayoutBackend for DirectBackend {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn layout(
        &self,
        component: &dyn Component,
        props: &SanitizedProps,
        ctx: &LayoutContext<'_>,
    ) -> GlintResult<LayoutOutput> {
        let markup = component.markup(props, ctx).await?;
        if !remote_image_urls(&markup)?.is_empty() {
            return Err(GlintError::layout(
                "markup references remote images; direct backend cannot resolve them",
            ));
        }
        let rasterizer = Arc::clone(ctx.rasterizer);
        let (dims, scale, encode) = (ctx.dimensions, ctx.image_scale, *ctx.encode);
        let bytes = tokio::task::spawn_blocking(move || {
            let img = rasterizer.rasterize(&markup, dims, scale)?;
            encode_rgba(&img, &encode)
        })
        .await
        .map_err(|e| GlintError::layout(format!("direct backend task failed: {e}")))??;
        Ok(LayoutOutput::Encoded(bytes))
    }
}

const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

// `href` or `xlink:href`; roxmltree reports both under the local name.
fn image_refs<'a, 'input>(
    doc: &'a Document<'input>,
) -> impl Iterator<Item = (Node<'a, 'input>, Attribute<'a, 'input>)> {
    doc.descendants()
        .filter(|n| n.has_tag_name("image"))
        .filter_map(|n| {
            n.attributes()
                .find(|a| a.name() == "href" && matches!(a.namespace(), None | Some(XLINK_NS)))
                .map(|a| (n, a))
        })
}

fn is_remote(href: &str) -> bool {
    let href = href.trim_start();
    href.starts_with("http://") || href.starts_with("https://")
}

/// Remote URLs referenced by `<image>` elements, deduplicated, in document order.
pub fn remote_image_urls(markup: &str) -> GlintResult<Vec<String>> {
    let doc = markup::parse(markup)?;
    let mut out: Vec<String> = Vec::new();
    for (_, href) in image_refs(&doc) {
        let href = href.value();
        if is_remote(href) && !out.iter().any(|u| u == href) {
            out.push(href.to_string());
        }
    }
    Ok(out)
}

/// Replace remote `<image>` hrefs with data URIs from `images`.
///
/// Unavailable images are dropped from the document (their href is emptied).
pub async fn inline_remote_images(markup: &str, images: &ImageLoader) -> GlintResult<String> {
    let urls = remote_image_urls(markup)?;
    if urls.is_empty() {
        return Ok(markup.to_string());
    }

    let mut loaded: HashMap<String, Option<Arc<LoadedImage>>> = HashMap::with_capacity(urls.len());
    for url in urls {
        let image = images.load(&url).await;
        if image.is_none() {
            tracing::debug!(url = %url, "embedded image unavailable; dropping it");
        }
        loaded.insert(url, image);
    }

    let doc = markup::parse(markup)?;
    let mut splice = Splice::new(markup);
    for (node, href) in image_refs(&doc) {
        let Some(entry) = loaded.get(href.value()) else {
            continue;
        };
        let Some(image) = entry else {
            splice.set_value(href.range_value(), "");
            continue;
        };
        let (has_w, has_h) = (node.has_attribute("width"), node.has_attribute("height"));
        if !has_w || !has_h {
            let (w, h) = intrinsic_size(image).ok_or_else(|| {
                GlintError::image_size(format!(
                    "cannot determine size of embedded image {}",
                    href.value()
                ))
            })?;
            if !has_w {
                splice.set_attr(node, "width", &w.to_string());
            }
            if !has_h {
                splice.set_attr(node, "height", &h.to_string());
            }
        }
        splice.set_value(href.range_value(), &image.data_uri);
    }
    Ok(splice.finish())
}

fn intrinsic_size(image: &LoadedImage) -> Option<(f64, f64)> {
    if image.is_svg() {
        let text = std::str::from_utf8(&image.bytes).ok()?;
        return markup::root_size(text);
    }
    let (w, h) = image::ImageReader::new(Cursor::new(image.bytes.as_slice()))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()?;
    (w > 0 && h > 0).then_some((f64::from(w), f64::from(h)))
}

#[cfg(test)]
#[path = "../../tests/unit/render/backend.rs"]
mod tests;
