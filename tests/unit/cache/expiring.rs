use super::*;

fn config(max_entries: usize, ttl_ms: u64) -> CacheConfig {
    CacheConfig {
        max_entries,
        ttl_ms,
    }
}

#[tokio::test(start_paused = true)]
async fn entry_lives_until_ttl_and_not_after() {
    let cache = ExpiringCache::<String>::new("test", &config(10, 1_000));
    cache.set("k", "v".to_string());

    tokio::time::advance(Duration::from_millis(999)).await;
    assert_eq!(cache.get("k").as_deref(), Some("v"));

    tokio::time::advance(Duration::from_millis(2)).await;
    assert_eq!(cache.get("k"), None);
    assert_eq!(cache.len(), 0, "expired entry is removed when touched");

    let m = cache.metrics();
    assert_eq!(m.hits, 1);
    assert_eq!(m.misses, 1);
    assert_eq!(m.expirations, 1);
}

#[tokio::test(start_paused = true)]
async fn lru_evicts_least_recently_accessed_not_oldest_inserted() {
    let cache = ExpiringCache::<String>::new("test", &config(3, 60_000));
    cache.set("a", "1".to_string());
    cache.set("b", "2".to_string());
    cache.set("c", "3".to_string());

    // Touch the oldest insert so `b` becomes least recently used.
    assert!(cache.get("a").is_some());
    assert!(cache.get("c").is_some());

    cache.set("d", "4".to_string());
    assert_eq!(cache.len(), 3);
    assert!(cache.get("b").is_none());
    assert!(cache.get("a").is_some());
    assert!(cache.get("c").is_some());
    assert!(cache.get("d").is_some());
    assert_eq!(cache.metrics().evictions, 1);
}

#[tokio::test(start_paused = true)]
async fn set_expires_stale_entries_before_counting_capacity() {
    let cache = ExpiringCache::<String>::new("test", &config(2, 60_000));
    cache.set_with_ttl("short", "x".to_string(), Duration::from_millis(10));
    cache.set("keep", "y".to_string());

    tokio::time::advance(Duration::from_millis(50)).await;
    cache.set("new", "z".to_string());

    let m = cache.metrics();
    assert_eq!(m.expirations, 1);
    assert_eq!(m.evictions, 0);
    assert!(cache.get("keep").is_some());
}

#[tokio::test(start_paused = true)]
async fn access_count_tracks_reads() {
    let cache = ExpiringCache::<String>::new("test", &config(4, 60_000));
    cache.set("k", "v".to_string());
    cache.get("k");
    cache.get("k");
    assert_eq!(cache.access_count("k"), Some(2));
}

#[tokio::test(start_paused = true)]
async fn metrics_report_memory_and_hit_rate() {
    let cache = ExpiringCache::<String>::new("test", &config(4, 60_000));
    assert_eq!(cache.metrics().hit_rate, 0.0);

    cache.set("k", "abcd".to_string());
    cache.get("k");
    cache.get("missing");

    let m = cache.metrics();
    assert_eq!(m.size, 1);
    assert_eq!(
        m.approximate_memory_bytes,
        std::mem::size_of::<String>() + 4
    );
    assert!((m.hit_rate - 0.5).abs() < 1e-9);

    cache.reset_metrics();
    let m = cache.metrics();
    assert_eq!((m.hits, m.misses), (0, 0));
    assert_eq!(m.size, 1, "resetting metrics keeps entries");

    cache.clear();
    assert!(cache.is_empty());
}
