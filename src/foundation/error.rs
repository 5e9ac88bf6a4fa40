use std::sync::Arc;

/// Convenience result type used across glint.
pub type GlintResult<T> = Result<T, GlintError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Asset and network failures are deliberately absent from the public surface of the color and
/// asset paths: those degrade to defaults. Errors here are what a caller of
/// [`crate::Engine::generate_image`] can actually observe.
#[derive(thiserror::Error, Debug)]
pub enum GlintError {
    /// Invalid user-provided input that cannot be substituted with a default.
    #[error("validation error: {0}")]
    Validation(String),

    /// A remote fetch failed or returned an unusable response.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// The layout stage failed to produce markup or a bitmap.
    #[error("layout error: {0}")]
    Layout(String),

    /// The size of an embedded image (or of the document itself) could not be determined.
    ///
    /// This is the one failure class the pipeline retries at fallback dimensions.
    #[error("image size error: {0}")]
    ImageSize(String),

    /// Vector to raster conversion failed.
    #[error("raster error: {0}")]
    Raster(String),

    /// Raster to compressed bytes conversion failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// Invalid engine configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Irrecoverable render failure, carrying the sanitized props that were fed to layout.
    #[error("render failed for component '{component}': {source}")]
    Render {
        /// Component name.
        component: String,
        /// Sanitized props snapshot used for the failing attempt.
        props: serde_json::Value,
        /// Underlying stage error.
        #[source]
        source: Box<GlintError>,
    },

    /// An error observed through a coalesced (shared) execution.
    #[error(transparent)]
    Shared(Arc<GlintError>),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GlintError {
    /// Build a [`GlintError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`GlintError::Fetch`] value.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Build a [`GlintError::Layout`] value.
    pub fn layout(msg: impl Into<String>) -> Self {
        Self::Layout(msg.into())
    }

    /// Build a [`GlintError::ImageSize`] value.
    pub fn image_size(msg: impl Into<String>) -> Self {
        Self::ImageSize(msg.into())
    }

    /// Build a [`GlintError::Raster`] value.
    pub fn raster(msg: impl Into<String>) -> Self {
        Self::Raster(msg.into())
    }

    /// Build a [`GlintError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`GlintError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error (or the error it wraps) is the retryable image-size failure.
    pub fn is_image_size(&self) -> bool {
        match self {
            Self::ImageSize(_) => true,
            Self::Shared(inner) => inner.is_image_size(),
            Self::Render { source, .. } => source.is_image_size(),
            _ => false,
        }
    }

    /// Sanitized props attached to a render failure, if any.
    pub fn render_props(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Render { props, .. } => Some(props),
            Self::Shared(inner) => inner.render_props(),
            _ => None,
        }
    }

    /// Convert an error coming out of a shared handle back into an owned error.
    pub(crate) fn from_shared(err: Arc<GlintError>) -> Self {
        match Arc::try_unwrap(err) {
            Ok(owned) => owned,
            Err(shared) => Self::Shared(shared),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
