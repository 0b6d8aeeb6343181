//! Environment-driven configuration shared by the API and worker processes.
//!
//! `.env` files are honored; every knob has a default except the store DSN.

use std::env;
use std::time::Duration;

use tracing::warn;

use crate::error::{CoreError, Result};

pub const DEFAULT_SCAN_INTERVAL_SECONDS: u64 = 15;
pub const MIN_SCAN_INTERVAL_SECONDS: u64 = 5;
pub const DEFAULT_SCAN_BATCH_SIZE: i64 = 50;
pub const MAX_SCAN_BATCH_SIZE: i64 = 1000;

/// Store connection settings. The DSN is required; a missing value is fatal
/// at startup.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let url = env::var("DATABASE_URL")
            .map_err(|_| CoreError::Validation("DATABASE_URL is required".into()))?;
        Ok(Self { url })
    }
}

/// RabbitMQ connection settings.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5672,
            username: "guest".to_string(),
            password: "guest".to_string(),
        }
    }
}

impl BrokerConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let defaults = Self::default();
        Self {
            host: env::var("RABBITMQ_HOST").unwrap_or(defaults.host),
            port: env::var("RABBITMQ_PORT")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.port),
            username: env::var("RABBITMQ_USERNAME").unwrap_or(defaults.username),
            password: env::var("RABBITMQ_PASSWORD").unwrap_or(defaults.password),
        }
    }

    pub fn amqp_uri(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/%2f",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Due-scan loop tuning. Out-of-range values are clamped with a warning
/// rather than rejected.
#[derive(Debug, Clone)]
pub struct DueScanConfig {
    pub interval: Duration,
    pub batch_size: i64,
}

impl Default for DueScanConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_SCAN_INTERVAL_SECONDS),
            batch_size: DEFAULT_SCAN_BATCH_SIZE,
        }
    }
}

impl DueScanConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let interval_seconds = env::var("DUE_SCAN_INTERVAL_SECONDS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_SCAN_INTERVAL_SECONDS);
        let batch_size = env::var("DUE_SCAN_BATCH_SIZE")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_SCAN_BATCH_SIZE);
        Self::clamped(interval_seconds, batch_size)
    }

    pub fn clamped(interval_seconds: u64, batch_size: i64) -> Self {
        let interval_seconds = if interval_seconds < MIN_SCAN_INTERVAL_SECONDS {
            warn!(
                requested = interval_seconds,
                minimum = MIN_SCAN_INTERVAL_SECONDS,
                "scan interval below minimum, raising"
            );
            MIN_SCAN_INTERVAL_SECONDS
        } else {
            interval_seconds
        };

        let batch_size = if batch_size > MAX_SCAN_BATCH_SIZE {
            warn!(
                requested = batch_size,
                maximum = MAX_SCAN_BATCH_SIZE,
                "scan batch size above maximum, clamping"
            );
            MAX_SCAN_BATCH_SIZE
        } else if batch_size < 1 {
            warn!(requested = batch_size, "scan batch size below 1, raising");
            1
        } else {
            batch_size
        };

        Self {
            interval: Duration::from_secs(interval_seconds),
            batch_size,
        }
    }
}

/// Origins permitted to call the API cross-origin.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();
        Self { allowed_origins }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_config_clamps_low_interval() {
        let config = DueScanConfig::clamped(1, 50);
        assert_eq!(config.interval, Duration::from_secs(MIN_SCAN_INTERVAL_SECONDS));
        assert_eq!(config.batch_size, 50);
    }

    #[test]
    fn scan_config_clamps_large_batch() {
        let config = DueScanConfig::clamped(30, 10_000);
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.batch_size, MAX_SCAN_BATCH_SIZE);
    }

    #[test]
    fn scan_config_defaults() {
        let config = DueScanConfig::default();
        assert_eq!(config.interval, Duration::from_secs(15));
        assert_eq!(config.batch_size, 50);
    }
}
