use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::retry::RetryConfig;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Which event bus implementation to run against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusType {
    Nats,
    InMemory,
}

impl FromStr for BusType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nats" => Ok(BusType::Nats),
            "inmemory" => Ok(BusType::InMemory),
            _ => Err(()),
        }
    }
}

/// Broker settings, shared by the API server and the worker
#[derive(Debug, Clone)]
pub struct BusConfig {
    pub bus_type: BusType,
    pub nats_url: String,
    pub stream_name: String,
}

impl BusConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let bus_type = match lookup("BUS_TYPE") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "BUS_TYPE",
                value: raw,
            })?,
            None => BusType::Nats,
        };

        Ok(BusConfig {
            bus_type,
            nats_url: lookup("NATS_URL").unwrap_or_else(|| "nats://localhost:4222".to_string()),
            stream_name: lookup("NOTIF_STREAM").unwrap_or_else(|| "NOTIFICATIONS".to_string()),
        })
    }
}

/// Application configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub bus: BusConfig,
    pub user_service_url: String,
    pub recipient_check_timeout: Duration,
    pub trusted_origins: String,
    pub bootstrap_max_attempts: u32,
    pub bootstrap_delay: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        Ok(Config {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 3000)?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            db_acquire_timeout: Duration::from_secs(parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 30)?),
            bus: BusConfig::from_lookup(&lookup)?,
            user_service_url: lookup("USER_SERVICE_URL")
                .unwrap_or_else(|| "http://user-service:8000".to_string()),
            recipient_check_timeout: Duration::from_millis(parse_or(
                &lookup,
                "RECIPIENT_CHECK_TIMEOUT_MS",
                3000,
            )?),
            trusted_origins: lookup("TRUSTED_ORIGINS").unwrap_or_else(|| "user-service".to_string()),
            bootstrap_max_attempts: parse_or(&lookup, "SCHEMA_BOOTSTRAP_MAX_ATTEMPTS", 30)?,
            bootstrap_delay: Duration::from_millis(parse_or(
                &lookup,
                "SCHEMA_BOOTSTRAP_DELAY_MS",
                2000,
            )?),
        })
    }

    /// Fixed-delay retry policy for the startup schema bootstrap.
    pub fn bootstrap_retry(&self) -> RetryConfig {
        RetryConfig::fixed(self.bootstrap_max_attempts, self.bootstrap_delay)
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(default),
    }
}
