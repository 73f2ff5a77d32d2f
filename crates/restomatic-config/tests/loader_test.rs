//! File-based configuration loading tests

use restomatic_config::{ConfigError, ConfigLoader, RouterConfig};
use std::io::Write;
use tempfile::{Builder, TempDir};

fn write_config(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

#[test]
fn test_load_toml_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "restomatic.toml",
        r#"
[database]
path = "data/app.db"
foreign_keys = true

[router]
fallback_format = "json"
"#,
    );

    let config = ConfigLoader::load_from_file(&path).unwrap();

    assert_eq!(config.database.path.to_str(), Some("data/app.db"));
    assert!(config.database.foreign_keys);
    assert_eq!(config.router.fallback_format, "json");
    assert_eq!(
        config.router.max_body_bytes,
        RouterConfig::default().max_body_bytes
    );
}

#[test]
fn test_load_json_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "restomatic.json",
        r#"{"database": {"path": ":memory:"}, "router": {"max_body_bytes": 1024}}"#,
    );

    let config = ConfigLoader::load_from_file(&path).unwrap();

    assert!(config.database.is_memory());
    assert_eq!(config.router.max_body_bytes, 1024);
}

#[cfg(feature = "yaml")]
#[test]
fn test_load_yaml_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "restomatic.yaml",
        "database:\n  wal_mode: true\nrouter:\n  fallback_format: plain\n",
    );

    let config = ConfigLoader::load_from_file(&path).unwrap();

    assert!(config.database.wal_mode);
    assert_eq!(config.router.fallback_format, "plain");
}

#[test]
fn test_unknown_extension_rejected() {
    let file = Builder::new().suffix(".ini").tempfile().unwrap();

    let result = ConfigLoader::load_from_file(file.path());

    assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "ini"));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let result = ConfigLoader::load_from_file(dir.path().join("absent.toml"));

    assert!(matches!(result, Err(ConfigError::Io { .. })));
}
