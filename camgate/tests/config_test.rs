//! Configuration file loading

use camgate::{Capability, ConfigError, OsVersionBucket, PermissionConfig};

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("camgate.json");
    std::fs::write(
        &path,
        r#"{
            "application_id": "app.example.scanner",
            "api_level": 29,
            "request_code": 200,
            "settings_code": 201
        }"#,
    )
    .unwrap();

    let config = PermissionConfig::load(&path).unwrap();
    assert_eq!(config.bucket(), OsVersionBucket::Mid);
    assert_eq!(
        config.required_capabilities(),
        vec![Capability::Camera, Capability::STORAGE_READ]
    );
    assert_eq!(config.request_token().0, 200);
}

#[test]
fn test_load_or_default_without_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.json");

    let config = PermissionConfig::load_or_default(&path, "app.example.scanner").unwrap();
    assert_eq!(config, PermissionConfig::new("app.example.scanner"));
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = PermissionConfig::load(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("camgate.json");

    let config = PermissionConfig::new("app.example.scanner").with_api_level(26);
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let loaded = PermissionConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}
