//! Application configuration.
//!
//! Every section is loaded from environment variables by `from_env()` and
//! checked by `validate()` before the server starts, so a bad deployment
//! fails at boot instead of on the first charge.

use std::env;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: u64, // seconds
}

/// Card gateway configuration: credentials plus the retry budgets for the
/// charge/address calls and the slower PIN cadence.
#[derive(Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub secret_key: String,
    pub timeout_secs: u64,
    pub charge_max_retries: u32,
    pub charge_retry_delay_ms: u64,
    pub pin_max_retries: u32,
    pub pin_retry_delay_ms: u64,
}

// The secret key stays out of Debug output.
impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("secret_key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .field("charge_max_retries", &self.charge_max_retries)
            .field("pin_max_retries", &self.pin_max_retries)
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log format options
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Plain,
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(name: &str, default: &str) -> Result<T, ConfigError> {
    env_or(name, default)
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))
}

fn env_required(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVariable(name.to_string()))
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenv::dotenv().ok();

        Ok(AppConfig {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            gateway: GatewayConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.gateway.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            host: env_or("SERVER_HOST", "127.0.0.1"),
            port: env_parse("SERVER_PORT", "8000")?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue(
                "SERVER_PORT cannot be 0".to_string(),
            ));
        }
        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SERVER_HOST cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(DatabaseConfig {
            url: env_required("DATABASE_URL")?,
            max_connections: env_parse("DB_MAX_CONNECTIONS", "20")?,
            min_connections: env_parse("DB_MIN_CONNECTIONS", "5")?,
            connection_timeout: env_parse("DB_CONNECTION_TIMEOUT", "30")?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::InvalidValue("DATABASE_URL".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigError::InvalidValue(
                "DB_MIN_CONNECTIONS must be <= DB_MAX_CONNECTIONS".to_string(),
            ));
        }
        Ok(())
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(GatewayConfig {
            base_url: env_required("CARD_GATEWAY_URL")?,
            secret_key: env_required("CARD_GATEWAY_SECRET_KEY")?,
            timeout_secs: env_parse("CARD_GATEWAY_TIMEOUT_SECS", "30")?,
            charge_max_retries: env_parse("CARD_GATEWAY_MAX_RETRIES", "3")?,
            charge_retry_delay_ms: env_parse("CARD_GATEWAY_RETRY_DELAY_MS", "100")?,
            pin_max_retries: env_parse("CARD_GATEWAY_PIN_MAX_RETRIES", "3")?,
            pin_retry_delay_ms: env_parse("CARD_GATEWAY_PIN_RETRY_DELAY_MS", "1000")?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "CARD_GATEWAY_URL must be a valid URL".to_string(),
            ));
        }
        if self.secret_key.is_empty() {
            return Err(ConfigError::InvalidValue(
                "CARD_GATEWAY_SECRET_KEY cannot be empty".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "CARD_GATEWAY_TIMEOUT_SECS cannot be 0".to_string(),
            ));
        }
        if self.charge_max_retries == 0 || self.pin_max_retries == 0 {
            return Err(ConfigError::InvalidValue(
                "gateway retry attempts cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env_or("LOG_LEVEL", "INFO"),
            format: match env_or("LOG_FORMAT", "plain").as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Plain,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
        if !valid_levels.contains(&self.level.to_uppercase().as_str()) {
            return Err(ConfigError::InvalidValue("LOG_LEVEL".to_string()));
        }
        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway_config() -> GatewayConfig {
        GatewayConfig {
            base_url: "https://gateway.test/charge".to_string(),
            secret_key: "sk_test_abc".to_string(),
            timeout_secs: 30,
            charge_max_retries: 3,
            charge_retry_delay_ms: 100,
            pin_max_retries: 3,
            pin_retry_delay_ms: 1000,
        }
    }

    #[test]
    fn server_config_validation() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
        };
        assert!(config.validate().is_ok());

        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn connection_bounds_validation() {
        let config = DatabaseConfig {
            url: "postgres://localhost/modelhouse".to_string(),
            max_connections: 5,
            min_connections: 10,
            connection_timeout: 30,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn gateway_config_validation() {
        assert!(gateway_config().validate().is_ok());

        let mut config = gateway_config();
        config.base_url = "gateway.test/charge".to_string();
        assert!(config.validate().is_err());

        let mut config = gateway_config();
        config.secret_key = String::new();
        assert!(config.validate().is_err());

        let mut config = gateway_config();
        config.charge_max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn gateway_secret_never_leaks_through_debug() {
        let rendered = format!("{:?}", gateway_config());
        assert!(!rendered.contains("sk_test_abc"));
    }

    #[test]
    fn log_level_validation() {
        let config = LoggingConfig {
            level: "verbose".to_string(),
            format: LogFormat::Plain,
        };
        assert!(config.validate().is_err());

        let config = LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Json,
        };
        assert!(config.validate().is_ok());
    }
}
