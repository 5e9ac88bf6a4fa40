use std::io::Cursor;

use serde_json::json;

use super::*;
use crate::{
    assets::fetch::StaticFetcher,
    color::palette::ColorResult,
    encode::image_encode::OutputFormat,
    foundation::config::{EmojiConfig, ImageLoaderConfig},
    render::props::{LocaleBinding, sanitize_props},
};

struct Fixed(String);

#[async_trait]
impl Component for Fixed {
    fn name(&self) -> &str {
        "fixed"
    }

    fn size(&self, _props: &serde_json::Value) -> Option<(f64, f64)> {
        None
    }

    async fn markup(&self, _props: &SanitizedProps, _ctx: &LayoutContext<'_>) -> GlintResult<String> {
        Ok(self.0.clone())
    }
}

struct Harness {
    fetcher: Arc<StaticFetcher>,
    images: ImageLoader,
    emoji: EmojiLoader,
    rasterizer: Arc<Rasterizer>,
    encode: EncodeSettings,
}

impl Harness {
    fn new() -> Self {
        let fetcher = Arc::new(StaticFetcher::new());
        Self {
            images: ImageLoader::new(fetcher.clone(), ImageLoaderConfig::default()),
            emoji: EmojiLoader::new(fetcher.clone(), EmojiConfig::default()),
            fetcher,
            rasterizer: Arc::new(Rasterizer::default()),
            encode: EncodeSettings {
                format: OutputFormat::Png,
                ..EncodeSettings::default()
            },
        }
    }

    fn ctx(&self) -> LayoutContext<'_> {
        LayoutContext {
            dimensions: Dimensions::new(20, 10),
            image_scale: 1.0,
            emoji_scale: 1.0,
            debug: false,
            images: &self.images,
            emoji: &self.emoji,
            rasterizer: &self.rasterizer,
            encode: &self.encode,
        }
    }
}

fn props() -> SanitizedProps {
    sanitize_props(&json!({}), &ColorResult::default_palette(), &LocaleBinding::default())
}

fn png(w: u32, h: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    image::RgbaImage::from_pixel(w, h, image::Rgba([0, 255, 0, 255]))
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

const DOC_WITH_AVATAR: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10"><image href="https://cdn.test/a.png"/></svg>"#;

#[tokio::test]
async fn svg_backend_inlines_images_and_fills_intrinsic_size() {
    let h = Harness::new();
    h.fetcher.insert("https://cdn.test/a.png", "image/png", png(3, 2));
    let out = SvgBackend
        .layout(&Fixed(DOC_WITH_AVATAR.into()), &props(), &h.ctx())
        .await
        .unwrap();
    let LayoutOutput::Vector(markup) = out else {
        panic!("expected vector output");
    };
    assert!(markup.contains(r#"href="data:image/png;base64,"#));
    assert!(markup.contains(r#"width="3" height="2""#));
    assert!(!markup.contains("https://"));
}

#[tokio::test]
async fn unavailable_images_are_dropped() {
    let h = Harness::new();
    let out = SvgBackend
        .layout(&Fixed(DOC_WITH_AVATAR.into()), &props(), &h.ctx())
        .await
        .unwrap();
    assert_eq!(
        out,
        LayoutOutput::Vector(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10"><image href=""/></svg>"#
                .to_string()
        )
    );
}

#[tokio::test]
async fn unreadable_image_size_is_an_image_size_error() {
    let h = Harness::new();
    h.fetcher
        .insert("https://cdn.test/a.png", "image/png", b"not really a png".to_vec());
    let err = SvgBackend
        .layout(&Fixed(DOC_WITH_AVATAR.into()), &props(), &h.ctx())
        .await
        .unwrap_err();
    assert!(err.is_image_size(), "{err}");

    // Explicit geometry means the intrinsic size is never needed.
    let sized = DOC_WITH_AVATAR.replace("<image ", r#"<image width="5" height="5" "#);
    assert!(
        SvgBackend
            .layout(&Fixed(sized), &props(), &h.ctx())
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn direct_backend_refuses_remote_references() {
    let h = Harness::new();
    let err = DirectBackend
        .layout(&Fixed(DOC_WITH_AVATAR.into()), &props(), &h.ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, GlintError::Layout(_)));
    assert_eq!(h.fetcher.total_calls(), 0);
}

#[tokio::test]
async fn direct_backend_encodes_local_markup() {
    let h = Harness::new();
    let doc = r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10"><rect width="20" height="10" fill="#00f"/></svg>"##;
    let out = DirectBackend
        .layout(&Fixed(doc.into()), &props(), &h.ctx())
        .await
        .unwrap();
    let LayoutOutput::Encoded(bytes) = out else {
        panic!("expected encoded output");
    };
    let img = image::load_from_memory(&bytes).unwrap();
    assert_eq!((img.width(), img.height()), (20, 10));
}

#[test]
fn collects_distinct_remote_urls() {
    let doc = r#"<svg xmlns:xlink="http://www.w3.org/1999/xlink"><image href="https://a/x.png"/><image xlink:href="https://a/x.png"/><image href="data:image/png;base64,AA"/><image href="http://b/y.gif"/></svg>"#;
    assert_eq!(
        remote_image_urls(doc).unwrap(),
        vec!["https://a/x.png".to_string(), "http://b/y.gif".to_string()]
    );
}

#[test]
fn commented_out_images_are_not_references() {
    let doc = r#"<svg><!-- <image href="https://a/old.png"/> --><image href="https://a/new.png"/></svg>"#;
    assert_eq!(
        remote_image_urls(doc).unwrap(),
        vec!["https://a/new.png".to_string()]
    );
    assert!(remote_image_urls("<svg><image href=").is_err());
}

#[tokio::test]
async fn inlining_preserves_single_quoted_attributes() {
    let h = Harness::new();
    h.fetcher.insert("https://cdn.test/a.png", "image/png", png(3, 2));
    let doc = r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="20" height="10"><image aria-label='say "hi"' xlink:href='https://cdn.test/a.png'/></svg>"#;
    let out = inline_remote_images(doc, &h.images).await.unwrap();
    assert!(out.contains(r#"aria-label='say "hi"'"#), "{out}");
    assert!(out.contains("xlink:href='data:image/png;base64,"), "{out}");
    assert!(out.contains(r#"' width="3" height="2"/>"#), "{out}");
    usvg::Tree::from_str(&out, &usvg::Options::default()).unwrap();
}
