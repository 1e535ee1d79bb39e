use crate::types::{Currency, Frequency, Mode, Scenario};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub request_timeout_secs: u64, // 0 = wait for the model indefinitely
    pub dashboard_port: u16,
    // Scenario defaults, used where the caller leaves a field unset
    pub default_asset: String,
    pub default_amount: Decimal,
    pub default_target: Decimal,
    pub default_currency: Currency,
    pub default_frequency: Frequency,
    pub default_start_date: NaiveDate,
}

impl Config {
    /// Load config from a specific .env file, or the default `.env` if None.
    pub fn from_env_file(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => { dotenvy::from_filename(p).ok(); }
            None => { dotenvy::dotenv().ok(); }
        }
        Self::build_from_env()
    }

    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::build_from_env()
    }

    fn build_from_env() -> Result<Self> {
        Ok(Self {
            gemini_api_key: env("GEMINI_API_KEY", ""),
            gemini_model: env("GEMINI_MODEL", "gemini-2.5-flash"),
            gemini_api_base: env("GEMINI_API_BASE", "https://generativelanguage.googleapis.com"),
            request_timeout_secs: env("REQUEST_TIMEOUT_SECS", "0").parse().unwrap_or(0),
            dashboard_port: env("DASHBOARD_PORT", "3000").parse().unwrap_or(3000),
            default_asset: env("DEFAULT_ASSET", "Nasdaq 100 Index (NDX)"),
            default_amount: env_decimal("DEFAULT_AMOUNT", "1000")?,
            default_target: env_decimal("DEFAULT_TARGET", "1000000")?,
            default_currency: env_parse("DEFAULT_CURRENCY", "USD")?,
            default_frequency: env_parse("DEFAULT_FREQUENCY", "monthly")?,
            default_start_date: env_date("DEFAULT_START_DATE", "2018-01-01")?,
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.gemini_api_key.is_empty()
    }

    /// Scenario built purely from defaults, ending today
    pub fn default_scenario(&self, mode: Mode) -> Scenario {
        Scenario {
            mode,
            asset: self.default_asset.clone(),
            amount: self.default_amount,
            target: self.default_target,
            currency: self.default_currency,
            frequency: self.default_frequency,
            start_date: self.default_start_date,
            end_date: chrono::Local::now().date_naive(),
        }
    }
}

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_decimal(key: &str, default: &str) -> Result<Decimal> {
    let val = env(key, default);
    Decimal::from_str(&val).with_context(|| format!("Invalid decimal for {key}: {val}"))
}

fn env_date(key: &str, default: &str) -> Result<NaiveDate> {
    let val = env(key, default);
    NaiveDate::parse_from_str(&val, "%Y-%m-%d")
        .with_context(|| format!("Invalid date for {key} (expected YYYY-MM-DD): {val}"))
}

fn env_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let val = env(key, default);
    val.parse::<T>().with_context(|| format!("Invalid value for {key}: {val}"))
}
