// Configuration tests
// Author: Gabriel Demetrios Lafis

use std::fs;

use tempfile::tempdir;

use checkmk_query_engine::{
    backend::BackendKind,
    encode::BackendVersion,
    spec::Edition,
    utils::{parse_level, AppError, Config},
};

#[test]
fn test_defaults() {
    let config = Config::default();

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.edition(), Edition::Commercial);
    assert_eq!(config.datasource.backend, BackendKind::Rest);
    assert_eq!(config.log_level_filter(), log::LevelFilter::Info);
    assert!(config.backend_version().unwrap().is_none());
}

#[test]
fn test_load_yaml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("engine.yaml");
    fs::write(
        &path,
        r#"
server:
  host: 0.0.0.0
  port: 9090
  enable_cors: true
logging:
  level: debug
datasource:
  url: https://monitoring.example/heute/
  username: automation
  edition: raw
  backend: web
  backend_version: 2.1.0p3
"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();

    assert_eq!(config.server.port, 9090);
    assert!(config.server.enable_cors);
    assert!(config.server.workers.is_none());
    assert_eq!(config.log_level_filter(), log::LevelFilter::Debug);
    assert_eq!(config.edition(), Edition::Community);
    assert_eq!(config.datasource.backend, BackendKind::Web);
    assert_eq!(config.backend_version().unwrap(), Some(BackendVersion::new(2, 1, 0)));

    let settings = config.datasource_settings().unwrap();
    assert_eq!(settings.url, "https://monitoring.example/heute");
    assert_eq!(settings.username.as_deref(), Some("automation"));
    assert_eq!(settings.edition, Edition::Community);
    assert_eq!(settings.version, Some(BackendVersion::new(2, 1, 0)));
}

#[test]
fn test_load_json_with_partial_sections() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("engine.json");
    fs::write(&path, r#"{"datasource": {"url": "http://localhost/cmk", "edition": "ultimate"}}"#).unwrap();

    let config = Config::from_file(&path).unwrap();

    assert_eq!(config.server.port, 8080);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.edition(), Edition::Commercial);
    assert_eq!(config.datasource.backend, BackendKind::Rest);
}

#[test]
fn test_unsupported_format() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("engine.toml");
    fs::write(&path, "[server]\nport = 1").unwrap();

    assert!(matches!(Config::from_file(&path), Err(AppError::Config(_))));
}

#[test]
fn test_missing_file() {
    let dir = tempdir().unwrap();

    assert!(matches!(Config::from_file(dir.path().join("absent.yaml")), Err(AppError::Io(_))));
}

#[test]
fn test_datasource_settings_need_url() {
    let config = Config::default();

    assert!(matches!(config.datasource_settings(), Err(AppError::Config(_))));
}

#[test]
fn test_invalid_backend_version() {
    let mut config = Config::default();
    config.datasource.url = Some("http://localhost".to_string());
    config.datasource.backend_version = Some("unknown".to_string());

    assert!(config.backend_version().is_err());
    assert!(matches!(config.datasource_settings(), Err(AppError::Encode(_))));
}

#[test]
fn test_config_error_messages() {
    let mut config = Config::default();
    config.datasource.url = Some("http://localhost".to_string());
    config.datasource.backend_version = Some("unknown".to_string());
    let encode = config.datasource_settings().unwrap_err();
    assert!(encode.to_string().starts_with("Encode error: "));

    let io = AppError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "absent.yaml"));
    assert_eq!(io.to_string(), "IO error: absent.yaml");

    let config_error = Config::default().datasource_settings().unwrap_err();
    assert_eq!(config_error.to_string(), "Configuration error: datasource.url is not set");
}

#[test]
fn test_parse_level() {
    assert_eq!(parse_level("ERROR"), log::LevelFilter::Error);
    assert_eq!(parse_level("warning"), log::LevelFilter::Warn);
    assert_eq!(parse_level("trace"), log::LevelFilter::Trace);
    assert_eq!(parse_level("nonsense"), log::LevelFilter::Info);
}
