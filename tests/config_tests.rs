//! Configuration loading tests

use std::collections::HashMap;
use teamup_api::config::{AppConfig, ConfigError};

fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    AppConfig::from_lookup(|key| vars.get(key).cloned())
}

#[test]
fn test_defaults() {
    let config = load(&[]).unwrap();

    assert_eq!(config.database_url, "sqlite://teamup.db?mode=rwc");
    assert_eq!(config.max_connections, 5);
    assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
    assert_eq!(config.cors_origins, vec!["http://localhost:3000"]);
}

#[test]
fn test_overrides() {
    let config = load(&[
        ("DATABASE_URL", "sqlite::memory:"),
        ("DATABASE_MAX_CONNECTIONS", "12"),
        ("BIND_ADDRESS", "127.0.0.1:8080"),
        (
            "CORS_ORIGINS",
            "http://localhost:5173, https://teamup.example.com,",
        ),
    ])
    .unwrap();

    assert_eq!(config.database_url, "sqlite::memory:");
    assert_eq!(config.max_connections, 12);
    assert_eq!(config.bind_address.port(), 8080);
    assert_eq!(
        config.cors_origins,
        vec!["http://localhost:5173", "https://teamup.example.com"]
    );
}

#[test]
fn test_invalid_max_connections() {
    for raw in ["0", "-1", "many"] {
        let err = load(&[("DATABASE_MAX_CONNECTIONS", raw)]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMaxConnections(value) if value == raw));
    }
}

#[test]
fn test_invalid_bind_address() {
    let err = load(&[("BIND_ADDRESS", "localhost")]).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidBindAddress(_)));
}

#[test]
fn test_invalid_database_url() {
    let err = load(&[("DATABASE_URL", "sqlite://teamup.db?mode=sometimes")]).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidDatabaseUrl { .. }));
}

#[test]
fn test_empty_cors_origins() {
    let err = load(&[("CORS_ORIGINS", " , ")]).unwrap_err();
    assert!(matches!(err, ConfigError::NoCorsOrigins));
}
