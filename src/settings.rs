use std::{env, time::Duration};

use couch_server::DEFAULT_PORT;
use log::LevelFilter;
use thiserror::Error;
use url::Url;

const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
const DEFAULT_PAYMENT_PRODUCT: &str = "Support couch";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{name} must be a positive number, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{name} must be a valid URL, got '{value}'")]
    InvalidUrl { name: &'static str, value: String },
    #[error("COUCH_LOG_LEVEL must be one of off, error, warn, info, debug or trace, got '{0}'")]
    InvalidLevel(String),
}

/// How the server is set up, read from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub port: u16,
    /// Rooms are kept in memory if this is not set
    pub database_url: Option<String>,
    pub error_webhook: Option<Url>,
    pub feedback_webhook: Option<Url>,
    /// Payments are disabled if this is not set
    pub stripe_key: Option<String>,
    pub payment_product: String,
    pub sweep_interval: Duration,
    /// Only applies to couch itself, dependencies always log warnings and up
    pub log_level: LevelFilter,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        // Unset and empty are the same thing
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match var("COUCH_PORT") {
            Some(value) => parse_number("COUCH_PORT", value)?,
            None => DEFAULT_PORT,
        };

        let sweep_interval = match var("COUCH_SWEEP_INTERVAL_SECS") {
            Some(value) => parse_number("COUCH_SWEEP_INTERVAL_SECS", value)?,
            None => DEFAULT_SWEEP_INTERVAL_SECS,
        };

        Ok(Self {
            port,
            database_url: var("COUCH_DATABASE_URL"),
            error_webhook: var("COUCH_ERROR_WEBHOOK")
                .map(|v| parse_url("COUCH_ERROR_WEBHOOK", v))
                .transpose()?,
            feedback_webhook: var("COUCH_FEEDBACK_WEBHOOK")
                .map(|v| parse_url("COUCH_FEEDBACK_WEBHOOK", v))
                .transpose()?,
            stripe_key: var("COUCH_STRIPE_KEY"),
            payment_product: var("COUCH_PAYMENT_PRODUCT")
                .unwrap_or_else(|| DEFAULT_PAYMENT_PRODUCT.to_string()),
            sweep_interval: Duration::from_secs(sweep_interval),
            log_level: match var("COUCH_LOG_LEVEL") {
                Some(value) => parse_level(value)?,
                None => LevelFilter::Info,
            },
        })
    }
}

fn parse_number<T>(name: &'static str, value: String) -> Result<T, SettingsError>
where
    T: std::str::FromStr + PartialEq + Default,
{
    match value.trim().parse::<T>() {
        Ok(number) if number != T::default() => Ok(number),
        _ => Err(SettingsError::InvalidNumber { name, value }),
    }
}

fn parse_url(name: &'static str, value: String) -> Result<Url, SettingsError> {
    Url::parse(value.trim()).map_err(|_| SettingsError::InvalidUrl { name, value })
}

fn parse_level(value: String) -> Result<LevelFilter, SettingsError> {
    value
        .trim()
        .parse()
        .map_err(|_| SettingsError::InvalidLevel(value))
}
