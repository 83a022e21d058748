//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `filmscreen.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use filmscreen_adapter_virtual::{Credentials, VirtualConfig};
use filmscreen_app::integration::IntegrationOptions;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Controller connection settings.
    pub cvm: CvmConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Behaviour of the simulated controller.
    pub simulator: VirtualConfig,
}

/// How to reach and log into the CVM.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CvmConfig {
    /// Hostname or IP address. Also the controller's unique id.
    pub host: String,
    /// Telnet port.
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Upper bound for each command, in seconds. `0` disables the bound.
    pub send_timeout_secs: u16,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `filmscreen.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// result fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("filmscreen.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("FILMSCREEN_HOST") {
            self.cvm.host = val;
        }
        if let Ok(val) = std::env::var("FILMSCREEN_PORT")
            && let Ok(port) = val.parse()
        {
            self.cvm.port = port;
        }
        if let Ok(val) = std::env::var("FILMSCREEN_USERNAME") {
            self.cvm.username = val;
        }
        if let Ok(val) = std::env::var("FILMSCREEN_PASSWORD") {
            self.cvm.password = val;
        }
        if let Ok(val) = std::env::var("FILMSCREEN_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cvm.host.trim().is_empty() {
            return Err(ConfigError::Validation("host must not be empty".to_string()));
        }
        if self.cvm.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Credentials presented to the controller.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.cvm.username.clone(),
            password: self.cvm.password.clone(),
        }
    }

    /// Per-instance integration settings.
    #[must_use]
    pub fn integration_options(&self) -> IntegrationOptions {
        IntegrationOptions {
            unique_id: self.cvm.host.clone(),
            send_timeout: (self.cvm.send_timeout_secs > 0)
                .then_some(Duration::from_secs(u64::from(self.cvm.send_timeout_secs))),
        }
    }

    /// Return the `host:port` address of the controller.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.cvm.host, self.cvm.port)
    }
}

impl Default for CvmConfig {
    fn default() -> Self {
        Self {
            host: "cvm.local".to_string(),
            port: 23,
            username: "csidealer".to_string(),
            password: "4212color".to_string(),
            send_timeout_secs: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "filmscreend=info,filmscreen_app=info,filmscreen_adapter_virtual=info"
                .to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
