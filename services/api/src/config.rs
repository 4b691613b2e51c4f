//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// Browser origin allowed by the CORS layer.
    pub allowed_origin: String,
    /// Whether the daily dashboard sweep runs in this process.
    pub dashboard_sweep_enabled: bool,
    /// Six-field cron expression (seconds first) for the daily sweep.
    pub dashboard_sweep_schedule: cron::Schedule,
    /// Fixed timezone the sweep schedule is evaluated in.
    pub dashboard_sweep_timezone: chrono_tz::Tz,
    /// Wall-clock budget of one sweep run, in seconds.
    pub dashboard_sweep_budget_secs: u64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let allowed_origin =
            std::env::var("ALLOWED_ORIGIN").unwrap_or_else(|_| "http://localhost:4200".to_string());

        // --- Load Sweep Settings ---
        let dashboard_sweep_enabled = std::env::var("DASHBOARD_SWEEP_ENABLED")
            .map(|value| value != "false" && value != "0")
            .unwrap_or(true);

        let schedule_str =
            std::env::var("DASHBOARD_SWEEP_CRON").unwrap_or_else(|_| "0 0 3 * * *".to_string());
        let dashboard_sweep_schedule = cron::Schedule::from_str(&schedule_str).map_err(|e| {
            ConfigError::InvalidValue("DASHBOARD_SWEEP_CRON".to_string(), e.to_string())
        })?;

        let timezone_str =
            std::env::var("DASHBOARD_SWEEP_TZ").unwrap_or_else(|_| "Europe/Paris".to_string());
        let dashboard_sweep_timezone = timezone_str.parse::<chrono_tz::Tz>().map_err(|e| {
            ConfigError::InvalidValue("DASHBOARD_SWEEP_TZ".to_string(), e.to_string())
        })?;

        let budget_str =
            std::env::var("DASHBOARD_SWEEP_BUDGET_SECS").unwrap_or_else(|_| "540".to_string());
        let dashboard_sweep_budget_secs = budget_str.parse::<u64>().map_err(|e| {
            ConfigError::InvalidValue("DASHBOARD_SWEEP_BUDGET_SECS".to_string(), e.to_string())
        })?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            allowed_origin,
            dashboard_sweep_enabled,
            dashboard_sweep_schedule,
            dashboard_sweep_timezone,
            dashboard_sweep_budget_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn default_sweep_schedule_fires_daily_at_three() {
        let schedule = cron::Schedule::from_str("0 0 3 * * *").unwrap();
        let tz: chrono_tz::Tz = "Europe/Paris".parse().unwrap();
        let now = chrono::Utc::now().with_timezone(&tz);
        let next = schedule.after(&now).next().unwrap();
        assert_eq!(next.time().hour(), 3);
        assert_eq!(next.time().minute(), 0);
    }
}
