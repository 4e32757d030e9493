//! services/api/src/config.rs
//!
//! Defines the service configuration and its loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which document store backs the console.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres { database_url: String },
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub store: StoreBackend,
    pub allowed_origin: String,
    pub operator_name: String,
    pub snapshot_timeout: Duration,
    /// JSON roster loaded into the in-memory store at startup.
    pub seed_path: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // --- Server Settings ---
        let bind_address_str =
            lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Store Settings ---
        let backend = lookup("STORE_BACKEND").unwrap_or_else(|| "memory".to_string());
        let store = match backend.trim().to_lowercase().as_str() {
            "memory" => StoreBackend::Memory,
            "postgres" => {
                let database_url = lookup("DATABASE_URL")
                    .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;
                StoreBackend::Postgres { database_url }
            }
            other => {
                return Err(ConfigError::InvalidValue(
                    "STORE_BACKEND".to_string(),
                    format!("'{}' is not one of memory, postgres", other),
                ))
            }
        };

        let timeout_str = lookup("SNAPSHOT_TIMEOUT_MS").unwrap_or_else(|| "5000".to_string());
        let snapshot_timeout = timeout_str
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| {
                ConfigError::InvalidValue("SNAPSHOT_TIMEOUT_MS".to_string(), e.to_string())
            })?;

        // --- Console Settings ---
        let allowed_origin =
            lookup("ALLOWED_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());
        let operator_name = lookup("OPERATOR_NAME").unwrap_or_else(|| "console".to_string());
        let seed_path = lookup("SEED_PATH").map(PathBuf::from);

        Ok(Self {
            bind_address,
            log_level,
            store,
            allowed_origin,
            operator_name,
            snapshot_timeout,
            seed_path,
        })
    }
}
