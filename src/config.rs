//! Application configuration
//!
//! Built once at startup from the environment (and `.env`, if present) and
//! handed to the rest of the app through DI.

use di::{inject, injectable};
use sqlx::sqlite::SqliteConnectOptions;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://teamup.db?mode=rwc";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid DATABASE_URL `{url}`: {reason}")]
    InvalidDatabaseUrl { url: String, reason: String },

    #[error("invalid DATABASE_MAX_CONNECTIONS `{0}`: expected a positive integer")]
    InvalidMaxConnections(String),

    #[error("invalid BIND_ADDRESS `{0}`")]
    InvalidBindAddress(String),

    #[error("CORS_ORIGINS must contain at least one origin")]
    NoCorsOrigins,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_address: SocketAddr,
    pub cors_origins: Vec<String>,
}

#[injectable]
impl AppConfig {
    #[inject]
    pub fn create() -> AppConfig {
        AppConfig::from_env().expect("configuration must be valid")
    }
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<AppConfig, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, falling back to defaults for
    /// missing keys.
    pub fn from_lookup<F>(lookup: F) -> Result<AppConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned());
        SqliteConnectOptions::from_str(&database_url).map_err(|e| {
            ConfigError::InvalidDatabaseUrl {
                url: database_url.clone(),
                reason: e.to_string(),
            }
        })?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidMaxConnections(raw)),
            },
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let raw_bind = lookup("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_owned());
        let bind_address = raw_bind
            .trim()
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidBindAddress(raw_bind.clone()))?;

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_owned())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_owned)
            .collect();
        if cors_origins.is_empty() {
            return Err(ConfigError::NoCorsOrigins);
        }

        Ok(AppConfig {
            database_url,
            max_connections,
            bind_address,
            cors_origins,
        })
    }
}
