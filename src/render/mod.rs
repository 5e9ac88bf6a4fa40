//! Component layout, rasterization and the orchestrating pipeline.

pub mod backend;
/// Component trait and output dimensions.
pub mod component;
/// The render orchestrator.
pub mod pipeline;
/// Prop sanitization and locale binding.
pub mod props;
pub mod raster;
pub mod template;
