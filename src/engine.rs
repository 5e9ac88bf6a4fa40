//! Public entry points.

use std::sync::Arc;

use crate::{
    assets::{
        emoji::EmojiLoader,
        fetch::{Fetcher, ReqwestFetcher},
        image_loader::ImageLoader,
    },
    cache::expiring::CacheMetrics,
    color::{
        gradient::GradientCache, palette::ColorResult, prepare::ColorPreparer,
        service::ColorService,
    },
    foundation::{
        config::EngineConfig,
        error::{GlintError, GlintResult},
    },
    render::{
        backend::{DirectBackend, LayoutBackend, SvgBackend},
        pipeline::{PipelineParts, RenderArgs, RenderPipeline, RenderedImage},
        raster::Rasterizer,
    },
    schedule::throttle::Throttler,
};

type RenderOutcome = Result<RenderedImage, Arc<GlintError>>;

/// Per-call options for [`Engine::generate_image`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Skip throttling and render right now.
    pub disable_throttle: bool,
    /// Who is asking; defaults to `props.userId`. Part of the throttle key.
    pub requester: Option<String>,
}

impl RenderOptions {
    /// Options for a guaranteed fresh render.
    pub fn unthrottled() -> Self {
        Self {
            disable_throttle: true,
            requester: None,
        }
    }
}

/// Owns every cache, loader and scheduler; cheap to share behind an `Arc`.
pub struct Engine {
    config: EngineConfig,
    images: Arc<ImageLoader>,
    emoji: Arc<EmojiLoader>,
    colors: Arc<ColorService>,
    gradients: Arc<GradientCache>,
    pipeline: Arc<RenderPipeline>,
    throttler: Throttler<RenderArgs, RenderOutcome>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("pipeline", &self.pipeline)
            .field("colors", &self.colors)
            .field("throttler", &self.throttler)
            .finish()
    }
}

impl Engine {
    /// Engine over the network, with the default backends.
    pub fn new(config: EngineConfig) -> GlintResult<Self> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(ReqwestFetcher::new()?);
        Self::with_fetcher(config, fetcher)
    }

    /// Engine over a custom [`Fetcher`], with the default backends.
    pub fn with_fetcher(config: EngineConfig, fetcher: Arc<dyn Fetcher>) -> GlintResult<Self> {
        Self::with_backends(
            config,
            fetcher,
            Arc::new(SvgBackend),
            Some(Arc::new(DirectBackend)),
        )
    }

    /// Fully custom wiring.
    pub fn with_backends(
        config: EngineConfig,
        fetcher: Arc<dyn Fetcher>,
        primary: Arc<dyn LayoutBackend>,
        alternate: Option<Arc<dyn LayoutBackend>>,
    ) -> GlintResult<Self> {
        config.validate()?;

        let images = Arc::new(ImageLoader::new(
            Arc::clone(&fetcher),
            config.images.clone(),
        ));
        let emoji = Arc::new(EmojiLoader::new(fetcher, config.emoji.clone()));
        let colors = Arc::new(ColorService::new(&config.color_cache, Arc::clone(&images)));
        let gradients = Arc::new(GradientCache::new(
            &config.gradient_cache,
            Arc::clone(&colors),
        ));
        let rasterizer = Arc::new(Rasterizer::new(&config.fonts, config.system_fonts));
        tracing::debug!(faces = rasterizer.face_count(), "font database ready");

        let parts = PipelineParts {
            images: Arc::clone(&images),
            emoji: Arc::clone(&emoji),
            rasterizer,
            colors: ColorPreparer::new(Arc::clone(&colors), Arc::clone(&gradients)),
            encode: config.encode,
            fallback: config.fallback_dimensions,
        };
        let pipeline = Arc::new(RenderPipeline::new(parts, primary, alternate));

        let runner = Arc::clone(&pipeline);
        let throttler = Throttler::new(config.throttle.interval(), move |args: RenderArgs| {
            let pipeline = Arc::clone(&runner);
            async move { pipeline.render(&args).await.map_err(Arc::new) }
        });

        Ok(Self {
            config,
            images,
            emoji,
            colors,
            gradients,
            pipeline,
            throttler,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Render `args` to encoded bytes.
    pub async fn generate_image(
        &self,
        args: RenderArgs,
        options: RenderOptions,
    ) -> GlintResult<Vec<u8>> {
        Ok(self.render(args, options).await?.bytes)
    }

    /// Render `args` and also return the palette it was themed with.
    pub async fn generate_image_with_colors(
        &self,
        args: RenderArgs,
        options: RenderOptions,
    ) -> GlintResult<(Vec<u8>, ColorResult)> {
        let out = self.render(args, options).await?;
        Ok((out.bytes, out.colors))
    }

    /// Render with full metadata.
    ///
    /// Throttled calls for the same component and requester coalesce: a caller may receive the
    /// image rendered from a newer call's arguments.
    #[tracing::instrument(skip(self, args), fields(component = args.component.name()))]
    pub async fn render(
        &self,
        args: RenderArgs,
        options: RenderOptions,
    ) -> GlintResult<RenderedImage> {
        if options.disable_throttle {
            let out = self.pipeline.render(&args).await;
            self.maintain();
            return out;
        }
        let key = throttle_key(&args, options.requester.as_deref());
        self.throttler
            .submit(&key, args)
            .await
            .map_err(GlintError::from_shared)
    }

    /// Palette for the image at `url`; the default palette when it cannot be derived.
    pub async fn process_image_colors(&self, url: &str) -> ColorResult {
        self.colors.process_image_colors(url).await
    }

    /// Pre-compute palettes for up to `max_count` URLs. Returns how many succeeded.
    #[tracing::instrument(skip(self, urls))]
    pub async fn warmup_cache<I>(&self, urls: I, max_count: usize) -> usize
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let targets: Vec<String> = urls
            .into_iter()
            .map(|u| u.as_ref().trim().to_string())
            .filter(|u| !u.is_empty())
            .take(max_count)
            .collect();
        let results = futures::future::join_all(
            targets
                .iter()
                .map(|url| self.colors.try_process_image_colors(url)),
        )
        .await;

        let mut warmed = 0;
        for (url, result) in targets.iter().zip(results) {
            match result {
                Some(_) => warmed += 1,
                None => tracing::warn!(url = %url, "warmup skipped url"),
            }
        }
        tracing::info!(requested = targets.len(), warmed, "cache warmup finished");
        warmed
    }

    /// Counters of the URL-keyed palette cache.
    pub fn cache_metrics(&self) -> CacheMetrics {
        self.colors.metrics()
    }

    /// Counters of the user-keyed palette cache.
    pub fn gradient_cache_metrics(&self) -> CacheMetrics {
        self.gradients.metrics()
    }

    /// Drop every cached palette, image and in-memory emoji.
    pub fn force_cache_cleanup(&self) {
        self.colors.clear();
        self.gradients.cache().clear();
        self.images.clear();
        self.emoji.clear_memory();
        tracing::info!("caches cleared");
    }

    /// Zero all cache counters.
    pub fn reset_cache_metrics(&self) {
        self.colors.cache().reset_metrics();
        self.gradients.cache().reset_metrics();
    }

    fn maintain(&self) {
        let expired = self.colors.cache().evict_expired() + self.gradients.cache().evict_expired();
        if expired > 0 {
            tracing::debug!(expired, "maintenance pass");
        }
    }
}

fn throttle_key(args: &RenderArgs, requester: Option<&str>) -> String {
    let requester = requester
        .map(str::to_string)
        .or_else(|| {
            args.props
                .get("userId")
                .and_then(crate::color::prepare::user_id)
        })
        .unwrap_or_else(|| "anonymous".to_string());
    format!("{}:{requester}", args.component.name())
}

#[cfg(test)]
#[path = "../tests/unit/engine.rs"]
mod tests;
