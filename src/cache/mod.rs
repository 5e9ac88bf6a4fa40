//! Generic caching primitives.

/// TTL + LRU keyed store with metrics.
pub mod expiring;
/// Sharing one pending computation between concurrent callers.
pub mod inflight;
