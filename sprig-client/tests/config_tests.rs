//! Config file loading.

use sprig_client::{ClientConfig, ConfigError};
use sprig_core::ScopeId;
use std::io::Write;
use std::time::Duration;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn loads_config_from_file() {
    let file = write_config(
        r#"
        api_base_url = "http://localhost:8022/"
        request_timeout_ms = 2500

        [auth]
        jwt = "token"

        [cache]
        children_page_limit = 100
        "#,
    );

    let config = ClientConfig::from_path(file.path()).unwrap();

    assert_eq!(config.initial_scope(), None);
    assert_eq!(config.request_timeout(), Duration::from_millis(2500));
    let cache = config.cache_config();
    assert_eq!(cache.children_page_limit, 100);
    assert!(cache.join_timeout.is_none());
}

#[test]
fn scope_id_is_optional_but_positive() {
    let file = write_config(
        r#"
        api_base_url = "https://sprig.example.com"
        scope_id = 0
        request_timeout_ms = 1000

        [auth]
        api_key = "k"

        [cache]
        children_page_limit = 50
        "#,
    );

    match ClientConfig::from_path(file.path()) {
        Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "scope_id"),
        other => panic!("expected scope_id error, got {other:?}"),
    }
}

#[test]
fn missing_section_is_a_parse_error() {
    let file = write_config(
        r#"
        api_base_url = "https://sprig.example.com"
        scope_id = 3
        request_timeout_ms = 1000

        [auth]
        api_key = "k"
        "#,
    );

    assert!(matches!(
        ClientConfig::from_path(file.path()),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = ClientConfig::from_path(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn base_url_must_be_http() {
    let file = write_config(
        r#"
        api_base_url = "localhost:8022"
        request_timeout_ms = 1000

        [auth]
        api_key = "k"

        [cache]
        children_page_limit = 50
        join_timeout_ms = 200
        "#,
    );

    match ClientConfig::from_path(file.path()) {
        Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "api_base_url"),
        other => panic!("expected api_base_url error, got {other:?}"),
    }
}

#[test]
fn explicit_scope_survives_round_trip() {
    let config = ClientConfig::from_toml(
        r#"
        api_base_url = "https://sprig.example.com"
        scope_id = 42
        request_timeout_ms = 1000

        [auth]
        api_key = "k"

        [cache]
        children_page_limit = 500
        join_timeout_ms = 750
        "#,
    )
    .unwrap();

    assert_eq!(config.initial_scope(), Some(ScopeId(42)));
    assert_eq!(
        config.cache_config().join_timeout,
        Some(Duration::from_millis(750))
    );
}
