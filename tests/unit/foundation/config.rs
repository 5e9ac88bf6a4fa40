use super::*;

#[test]
fn empty_object_yields_defaults() {
    let cfg = EngineConfig::from_json_str("{}").unwrap();
    assert_eq!(cfg, EngineConfig::default());
    assert_eq!(cfg.gradient_cache.ttl(), Duration::from_secs(60));
    assert_eq!(cfg.throttle.interval(), Duration::from_secs(1));
    assert_eq!(cfg.fallback_dimensions, Dimensions::FALLBACK);
}

#[test]
fn partial_sections_keep_remaining_defaults() {
    let cfg = EngineConfig::from_json_str(
        r#"{"throttle": {"interval_ms": 250}, "images": {"max_bytes": 1024}}"#,
    )
    .unwrap();
    assert_eq!(cfg.throttle.interval_ms, 250);
    assert_eq!(cfg.images.max_bytes, 1024);
    assert_eq!(cfg.images.timeout_ms, 5_000);
    assert_eq!(cfg.emoji.max_bytes, 1024 * 1024);
    assert!(
        cfg.images
            .allowed_content_types
            .iter()
            .any(|t| t == "image/png")
    );
}

#[test]
fn rejects_zero_interval_and_empty_allow_list() {
    let err = EngineConfig::from_json_str(r#"{"throttle": {"interval_ms": 0}}"#).unwrap_err();
    assert!(err.to_string().contains("throttle.interval_ms"));

    let err =
        EngineConfig::from_json_str(r#"{"images": {"allowed_content_types": []}}"#).unwrap_err();
    assert!(err.to_string().contains("allowed_content_types"));

    let err = EngineConfig::from_json_str(r#"{"emoji": {"max_bytes": 0}}"#).unwrap_err();
    assert!(err.to_string().contains("emoji.max_bytes"));
}

#[test]
fn rejects_malformed_json() {
    let err = EngineConfig::from_json_str("{").unwrap_err();
    assert!(matches!(err, GlintError::Config(_)));
}

#[test]
fn font_weight_defaults_to_regular() {
    let cfg =
        EngineConfig::from_json_str(r#"{"fonts": [{"family": "Inter", "path": "inter.ttf"}]}"#)
            .unwrap();
    assert_eq!(cfg.fonts[0].weight, 400);
}
