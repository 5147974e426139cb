//! Tracing initialization.
//!
//! The configured `LOG_LEVEL` seeds the default filter (overridable via
//! `RUST_LOG`). Output is JSON when `LOG_FORMAT=json` or the environment
//! is production, pretty otherwise.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()))
    }

    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

fn use_json(format: &LogFormat, environment: Environment) -> bool {
    *format == LogFormat::Json || environment == Environment::Production
}

pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},sqlx=warn,hyper=warn",
            config.level.to_lowercase()
        ))
    });

    if use_json(&config.format, Environment::from_env()) {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .with_target(true)
            .init();
    } else {
        fmt().pretty().with_env_filter(filter).with_target(true).init();
    }
}
