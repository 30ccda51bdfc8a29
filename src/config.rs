//! Configuration loaded from environment variables
//!
//! A `.env` file in the working directory is read first if present.

use crate::domain::{FinePolicy, LendingPolicy, loan::LOAN_PERIOD_DAYS};
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Server port
    pub port: u16,

    /// Maximum database connections
    pub db_max_connections: u32,

    /// Base URL of the account service
    pub account_service_url: String,

    /// Base URL of the catalog service
    pub catalog_service_url: String,

    /// Timeout for each call to the account or catalog service
    pub http_timeout: Duration,

    /// Loan period and fine amounts
    pub lending_policy: LendingPolicy,

    /// Sender address for notification mail
    pub mail_from: String,

    /// Interval of the notification retry/send sweep; `None` disables it
    pub notification_sweep_interval: Option<Duration>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;

        let fine = FinePolicy::default();
        let lending_policy = LendingPolicy {
            loan_period_days: parse_or("LOAN_PERIOD_DAYS", LOAN_PERIOD_DAYS)?,
            fine: FinePolicy {
                daily_rate: parse_or::<Decimal>("FINE_DAILY_RATE", fine.daily_rate)?,
                lost_replacement: parse_or::<Decimal>("FINE_LOST_AMOUNT", fine.lost_replacement)?,
            },
        };

        validate_policy(&lending_policy)?;

        let notification_sweep_interval = match env::var("NOTIFICATION_SWEEP_INTERVAL_SECS") {
            Ok(value) => {
                let secs: u64 = parse_value("NOTIFICATION_SWEEP_INTERVAL_SECS", &value)?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            Err(_) => None,
        };

        Ok(Config {
            database_url,
            port: parse_or("PORT", 3000)?,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 5)?,
            account_service_url: env::var("ACCOUNT_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8081".to_string()),
            catalog_service_url: env::var("CATALOG_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8082".to_string()),
            http_timeout: Duration::from_secs(parse_or("HTTP_TIMEOUT_SECS", 5)?),
            lending_policy,
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "library@localhost".to_string()),
            notification_sweep_interval,
        })
    }
}

/// Fines are stored with a positive amount, so both rates must be above zero
fn validate_policy(policy: &LendingPolicy) -> Result<(), ConfigError> {
    if policy.loan_period_days <= 0 {
        return Err(invalid("LOAN_PERIOD_DAYS", policy.loan_period_days));
    }
    if policy.fine.daily_rate <= Decimal::ZERO {
        return Err(invalid("FINE_DAILY_RATE", policy.fine.daily_rate));
    }
    if policy.fine.lost_replacement <= Decimal::ZERO {
        return Err(invalid("FINE_LOST_AMOUNT", policy.fine.lost_replacement));
    }
    Ok(())
}

fn invalid(name: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| invalid(name, value))
}

/// Parse an optional variable, falling back to `default` when unset
fn parse_or<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => parse_value(name, &value),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_reports_variable_name() {
        let err = parse_value::<u16>("PORT", "http").unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for PORT: http");
    }

    #[test]
    fn test_parse_value_accepts_decimal_amounts() {
        let rate: Decimal = parse_value("FINE_DAILY_RATE", " 2500.50 ").unwrap();
        assert_eq!(rate, Decimal::new(250050, 2));
    }

    #[test]
    fn test_validate_policy_rejects_zero_daily_rate() {
        let policy = LendingPolicy {
            fine: FinePolicy {
                daily_rate: Decimal::ZERO,
                ..FinePolicy::default()
            },
            ..LendingPolicy::default()
        };

        let err = validate_policy(&policy).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for FINE_DAILY_RATE: 0");
        assert!(validate_policy(&LendingPolicy::default()).is_ok());
    }
}
