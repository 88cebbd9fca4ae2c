// Configuration loading tests
// Author: kelexine (https://github.com/kelexine)

use glyphcache::config::{AppConfig, GenerationConfig};
use glyphcache::error::CacheError;
use std::io::Write;
use tempfile::NamedTempFile;

fn toml_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_file_overrides_and_extends_defaults() {
    let file = toml_file(
        r#"
[server]
port = 9100

[cache]
dedupe_in_flight = false
max_fallback_generations = 4
sweep_interval_seconds = 5

[cache.default]
capacity = 16
default_ttl_seconds = 120

[cache.generations.watercolor]
capacity = 40
default_ttl_seconds = 300
"#,
    );

    let config = AppConfig::load(Some(file.path())).unwrap();

    assert_eq!(config.server.port, 9100);
    assert_eq!(config.server.host, "127.0.0.1");
    assert!(!config.cache.dedupe_in_flight);
    assert_eq!(config.cache.max_fallback_generations, 4);
    assert_eq!(config.cache.sweep_interval_seconds, 5);
    assert_eq!(config.cache.default, GenerationConfig::new(16, 120));
    assert_eq!(
        config.cache.lookup("watercolor"),
        Some(GenerationConfig::new(40, 300))
    );
    assert_eq!(
        config.cache.lookup("directed_enso"),
        Some(GenerationConfig::new(256, 600))
    );
}

#[test]
fn test_zero_capacity_in_file_is_rejected() {
    let file = toml_file(
        r#"
[cache.generations.sigil]
capacity = 0
default_ttl_seconds = 60
"#,
    );

    let err = AppConfig::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, CacheError::Config(_)));
    assert!(err.to_string().contains("sigil"));
}

#[test]
fn test_reserved_generation_in_file_is_rejected() {
    let file = toml_file(
        r#"
[cache.generations.stats]
capacity = 8
default_ttl_seconds = 60
"#,
    );

    let err = AppConfig::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, CacheError::Config(_)));
    assert!(err.to_string().contains("reserved"));
}

#[test]
fn test_negative_ttl_in_file_is_rejected() {
    let file = toml_file(
        r#"
[cache.default]
capacity = 10
default_ttl_seconds = -1
"#,
    );

    assert!(AppConfig::load(Some(file.path())).is_err());
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    assert!(AppConfig::load(Some(&missing)).is_err());
}

#[test]
fn test_defaults_serialize_to_toml() {
    let rendered = toml::to_string_pretty(&AppConfig::default()).unwrap();
    assert!(rendered.contains("parchment"));
    assert!(rendered.contains("sweep_interval_seconds"));
}
