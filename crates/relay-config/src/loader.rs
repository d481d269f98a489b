//! Configuration loader with layered sources.

use crate::AppConfig;
use config::{Config, ConfigError, Environment, File};
use relay_core::RelayError;
use std::path::Path;
use tracing::{debug, info};

/// Loads configuration from layered sources.
///
/// Configuration is loaded from multiple sources in order:
/// 1. `config/default.toml` - Default values
/// 2. `config/{environment}.toml` - Environment-specific overrides
/// 3. `config/local.toml` - Local overrides (not committed)
/// 4. Environment variables with `RELAY__` prefix
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<AppConfig, RelayError> {
        Self::load("./config")
    }

    /// Loads configuration from the specified directory.
    pub fn load(config_dir: &str) -> Result<AppConfig, RelayError> {
        // Load .env file if present
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment =
            std::env::var("RELAY_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder();

        // 1. Load default configuration
        let default_path = format!("{}/default.toml", config_dir);
        if Path::new(&default_path).exists() {
            debug!("Loading default config from: {}", default_path);
            builder = builder.add_source(File::with_name(&default_path).required(false));
        }

        // 2. Load environment-specific configuration
        let env_path = format!("{}/{}.toml", config_dir, environment);
        if Path::new(&env_path).exists() {
            debug!("Loading environment config from: {}", env_path);
            builder = builder.add_source(File::with_name(&env_path).required(false));
        }

        // 3. Load local overrides (not committed to version control)
        let local_path = format!("{}/local.toml", config_dir);
        if Path::new(&local_path).exists() {
            debug!("Loading local config from: {}", local_path);
            builder = builder.add_source(File::with_name(&local_path).required(false));
        }

        // 4. Override with environment variables (RELAY__ prefix)
        builder = builder.add_source(
            Environment::with_prefix("RELAY")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_error_to_relay_error)?;

        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(config_error_to_relay_error)?;

        Self::validate_config(&app_config)?;

        Ok(app_config)
    }

    /// Validates the configuration.
    fn validate_config(config: &AppConfig) -> Result<(), RelayError> {
        if config.database.url.is_empty() {
            return Err(RelayError::Configuration(
                "Database URL is required".to_string(),
            ));
        }

        if config.audit.log_path.is_empty() {
            return Err(RelayError::Configuration(
                "Audit log path is required".to_string(),
            ));
        }

        Ok(())
    }
}

fn config_error_to_relay_error(err: ConfigError) -> RelayError {
    RelayError::Configuration(err.to_string())
}
