//! Request scheduling.

pub mod throttle;
