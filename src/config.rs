//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub messaging: MessagingConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "dm.comrade.example")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the service
    ///
    /// # Returns
    /// Full URL like "https://dm.comrade.example"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Authentication configuration (bearer tokens)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Random bytes per freshly minted access token
    #[serde(default = "default_token_bytes")]
    pub token_bytes: usize,
}

fn default_token_bytes() -> usize {
    32
}

/// Messaging behaviour configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MessagingConfig {
    /// Default page size for message and conversation listings
    pub default_page_size: usize,
    /// Hard cap on requested page sizes
    pub max_page_size: usize,
    /// Maximum message content length in characters
    pub max_message_length: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (COMRADE_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.domain", "localhost")?
            .set_default("server.protocol", "http")?
            .set_default("database.path", "data/comrade-dm.db")?
            .set_default("auth.token_bytes", 32)?
            .set_default("messaging.default_page_size", 20)?
            .set_default("messaging.max_page_size", 40)?
            .set_default("messaging.max_message_length", 5000)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (COMRADE_*)
            .add_source(
                Environment::with_prefix("COMRADE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_TOKEN_BYTES: usize = 16;

        if self.auth.token_bytes < MIN_TOKEN_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.token_bytes must be at least {}",
                MIN_TOKEN_BYTES
            )));
        }

        if self.messaging.default_page_size == 0 {
            return Err(crate::error::AppError::Config(
                "messaging.default_page_size must be greater than 0".to_string(),
            ));
        }

        if self.messaging.max_page_size < self.messaging.default_page_size {
            return Err(crate::error::AppError::Config(
                "messaging.max_page_size must not be below messaging.default_page_size"
                    .to_string(),
            ));
        }

        if self.messaging.max_message_length == 0 {
            return Err(crate::error::AppError::Config(
                "messaging.max_message_length must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
