//! Configuration management for the CreaViaggi service
//!
//! Handles loading configuration from files, `.env`, environment variables,
//! and provides validation for all configuration settings.

use crate::TravelError;
use crate::credentials;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreaViaggiConfig {
    /// Text-generation backend settings
    #[serde(default)]
    pub backend: BackendConfig,
    /// Third-party data provider settings
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Minimum spacing between calls to rate-limited channels
    #[serde(default)]
    pub throttle: ThrottleConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Text-generation backend (OpenRouter) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// API key; absent or placeholder disables every action
    pub api_key: Option<String>,
    #[serde(default = "default_backend_model")]
    pub model: String,
    #[serde(default = "default_backend_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_backend_timeout")]
    pub timeout_seconds: u32,
}

/// Data provider credentials and endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub amadeus_client_id: Option<String>,
    pub amadeus_client_secret: Option<String>,
    #[serde(default = "default_amadeus_base_url")]
    pub amadeus_base_url: String,
    pub openweather_api_key: Option<String>,
    #[serde(default = "default_openweather_base_url")]
    pub openweather_base_url: String,
    #[serde(default = "default_exchangerate_base_url")]
    pub exchangerate_base_url: String,
    #[serde(default = "default_nominatim_base_url")]
    pub nominatim_base_url: String,
    #[serde(default = "default_restcountries_base_url")]
    pub restcountries_base_url: String,
    /// Timeout for provider requests in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Nominatim usage policy allows one request per second
    #[serde(default = "default_nominatim_interval")]
    pub nominatim_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_backend_model() -> String {
    "meta-llama/llama-3.1-8b-instruct:free".to_string()
}

fn default_backend_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_backend_timeout() -> u32 {
    30
}

fn default_amadeus_base_url() -> String {
    "https://test.api.amadeus.com".to_string()
}

fn default_openweather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_exchangerate_base_url() -> String {
    "https://api.exchangerate-api.com/v4".to_string()
}

fn default_nominatim_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_restcountries_base_url() -> String {
    "https://restcountries.com/v3.1".to_string()
}

fn default_provider_timeout() -> u32 {
    15
}

fn default_nominatim_interval() -> u64 {
    1000
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_backend_model(),
            base_url: default_backend_base_url(),
            timeout_seconds: default_backend_timeout(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            amadeus_client_id: None,
            amadeus_client_secret: None,
            amadeus_base_url: default_amadeus_base_url(),
            openweather_api_key: None,
            openweather_base_url: default_openweather_base_url(),
            exchangerate_base_url: default_exchangerate_base_url(),
            nominatim_base_url: default_nominatim_base_url(),
            restcountries_base_url: default_restcountries_base_url(),
            timeout_seconds: default_provider_timeout(),
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            nominatim_interval_ms: default_nominatim_interval(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl CreaViaggiConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        // A missing .env is normal outside development
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("No .env file loaded: {}", e);
        }

        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Add environment variable overrides, e.g. CREAVIAGGI__BACKEND__MODEL
        builder = builder.add_source(
            Environment::with_prefix("CREAVIAGGI")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: CreaViaggiConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_env_overrides();
        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("creaviaggi").join("config.toml"))
    }

    /// Honour the variable names used by existing `.env` files
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
            self.backend.api_key = Some(key);
        }
        if let Ok(model) = std::env::var("OPENROUTER_MODEL") {
            self.backend.model = model;
        }
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.backend.model.is_empty() {
            self.backend.model = default_backend_model();
        }
        if self.backend.base_url.is_empty() {
            self.backend.base_url = default_backend_base_url();
        }
        if self.backend.timeout_seconds == 0 {
            self.backend.timeout_seconds = default_backend_timeout();
        }
        if self.providers.timeout_seconds == 0 {
            self.providers.timeout_seconds = default_provider_timeout();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Whether the backend has a usable key
    #[must_use]
    pub fn backend_configured(&self) -> bool {
        credentials::is_configured(self.backend.api_key.as_deref())
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.backend.timeout_seconds > 300 {
            return Err(TravelError::config("Backend timeout cannot exceed 300 seconds").into());
        }

        if self.providers.timeout_seconds > 300 {
            return Err(TravelError::config("Provider timeout cannot exceed 300 seconds").into());
        }

        if self.throttle.nominatim_interval_ms > 60_000 {
            return Err(
                TravelError::config("Throttle interval cannot exceed 60000 ms").into(),
            );
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(TravelError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(TravelError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let urls = [
            ("Backend", &self.backend.base_url),
            ("Amadeus", &self.providers.amadeus_base_url),
            ("OpenWeather", &self.providers.openweather_base_url),
            ("ExchangeRate", &self.providers.exchangerate_base_url),
            ("Nominatim", &self.providers.nominatim_base_url),
            ("REST Countries", &self.providers.restcountries_base_url),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(TravelError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}
