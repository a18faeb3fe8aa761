//! Configuration management for the Reseller Ledger platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with RL_ prefix

use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Storage backend selection
    pub store: StoreConfig,

    /// Ledger behaviour
    pub ledger: LedgerConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    #[serde(default)]
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
}

/// Which storage adapter backs the services
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    /// Upper bound for a single store transaction, in milliseconds
    pub transaction_timeout_ms: u64,

    /// Number of transactions shown on the dashboard
    pub recent_transactions_limit: i64,
}

impl LedgerConfig {
    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_millis(self.transaction_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,

    /// bcrypt work factor for password hashes
    pub bcrypt_cost: u32,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("RL_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 8080)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("store.backend", "postgres")?
            .set_default("ledger.transaction_timeout_ms", 5000)?
            .set_default("ledger.recent_transactions_limit", 10)?
            .set_default("jwt.access_token_expiry", 86400)?
            .set_default("jwt.bcrypt_cost", 12)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (RL_ prefix)
            .add_source(
                Environment::with_prefix("RL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration for tests and local experiments backed by the in-memory store
    pub fn in_memory(jwt_secret: &str) -> Self {
        Self {
            environment: "test".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 1,
                min_connections: 0,
                acquire_timeout_secs: 1,
            },
            store: StoreConfig {
                backend: StoreBackend::Memory,
            },
            ledger: LedgerConfig {
                transaction_timeout_ms: 5000,
                recent_transactions_limit: 10,
            },
            jwt: JwtConfig {
                secret: jwt_secret.to_string(),
                access_token_expiry: 3600,
                bcrypt_cost: 4,
            },
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.store.backend == StoreBackend::Postgres && self.database.url.is_empty() {
            return Err(ConfigError::Message(
                "database.url is required when store.backend = postgres".to_string(),
            ));
        }
        if self.jwt.secret.is_empty() {
            return Err(ConfigError::Message("jwt.secret cannot be empty".to_string()));
        }
        if !(4..=31).contains(&self.jwt.bcrypt_cost) {
            return Err(ConfigError::Message(
                "jwt.bcrypt_cost must be between 4 and 31".to_string(),
            ));
        }
        if self.ledger.transaction_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "ledger.transaction_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
        }
    }
}
