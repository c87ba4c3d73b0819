use crate::error::{Error, Result};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub service_name: String,
    pub http_port: u16,
    pub db_url: Option<String>,
    pub nats_url: String,
    pub alert_webhook_url: Option<String>,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: 25,
            min_connections: 5,
            max_lifetime: Duration::from_secs(300),
        }
    }
}

/// Load a local env file unless running in production.
pub fn load_env() {
    let environment = env::var("ENV").unwrap_or_default();
    if environment != "production" {
        dotenv::dotenv().ok();
    }
}

impl Config {
    /// Read configuration from the environment. `default_service` and
    /// `default_port` are per-binary fallbacks.
    pub fn from_env(default_service: &str, default_port: u16) -> Result<Self> {
        load_env();

        let service_name =
            env::var("LOG_SERVICE_NAME").unwrap_or_else(|_| default_service.to_string());

        let http_port = env::var("HTTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(default_port);

        let nats_url =
            env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string());

        Ok(Config {
            service_name,
            http_port,
            db_url: env::var("DB_URL").ok(),
            nats_url,
            alert_webhook_url: env::var("ALERT_WEBHOOK_URL").ok().filter(|u| !u.is_empty()),
            database: DatabaseConfig::default(),
        })
    }

    /// The database DSN; missing configuration is fatal at startup for
    /// binaries that need a store.
    pub fn db_url(&self) -> Result<&str> {
        self.db_url
            .as_deref()
            .ok_or_else(|| Error::Configuration("DB_URL not set".to_string()))
    }
}
