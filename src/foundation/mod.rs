//! Error, configuration and markup primitives shared by every stage.

/// Engine configuration.
pub mod config;
/// Crate error type.
pub mod error;
pub mod markup;
