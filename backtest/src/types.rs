use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which question the scenario asks of the model
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Fixed contribution per period, compute the realized return
    #[default]
    Compute,
    /// Fixed terminal target, infer the required contribution per period
    BackSolve,
}

impl Mode {
    /// Label for the amount input, which changes meaning with the mode
    pub fn amount_label(&self) -> &'static str {
        match self {
            Mode::Compute => "Amount per period",
            Mode::BackSolve => "Target value",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Compute => write!(f, "compute"),
            Mode::BackSolve => write!(f, "backsolve"),
        }
    }
}

impl FromStr for Mode {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compute" | "calculate" => Ok(Mode::Compute),
            "backsolve" | "back-solve" | "plan" => Ok(Mode::BackSolve),
            other => Err(ScenarioError::UnknownValue { field: "mode", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Cny,
    Hkd,
}

impl Currency {
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Cny => "¥",
            Currency::Hkd => "HK$",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Cny => "CNY",
            Currency::Hkd => "HKD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "CNY" | "RMB" => Ok(Currency::Cny),
            "HKD" => Ok(Currency::Hkd),
            other => Err(ScenarioError::UnknownValue { field: "currency", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    #[default]
    Monthly,
    Quarterly,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Weekly => write!(f, "Weekly"),
            Frequency::Monthly => write!(f, "Monthly"),
            Frequency::Quarterly => write!(f, "Quarterly"),
        }
    }
}

impl FromStr for Frequency {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" | "week" => Ok(Frequency::Weekly),
            "monthly" | "month" => Ok(Frequency::Monthly),
            "quarterly" | "quarter" => Ok(Frequency::Quarterly),
            other => Err(ScenarioError::UnknownValue { field: "frequency", value: other.to_string() }),
        }
    }
}

/// User-configured investment scenario. Read-only once a run has started.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub mode: Mode,
    pub asset: String,
    pub amount: Decimal,
    pub target: Decimal,
    pub currency: Currency,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Error, PartialEq)]
pub enum ScenarioError {
    #[error("start date {start} is after end date {end}")]
    DateRange { start: NaiveDate, end: NaiveDate },
    #[error("amount per period must be positive, got {0}")]
    NonPositiveAmount(Decimal),
    #[error("target value must be positive, got {0}")]
    NonPositiveTarget(Decimal),
    #[error("unknown {field}: {value}")]
    UnknownValue { field: &'static str, value: String },
}

impl Scenario {
    /// Input-layer check. The prompt builder accepts any scenario; this is
    /// for the CLI and dashboard before they trigger a run.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.start_date > self.end_date {
            return Err(ScenarioError::DateRange { start: self.start_date, end: self.end_date });
        }
        match self.mode {
            Mode::Compute if self.amount <= Decimal::ZERO => {
                Err(ScenarioError::NonPositiveAmount(self.amount))
            }
            Mode::BackSolve if self.target <= Decimal::ZERO => {
                Err(ScenarioError::NonPositiveTarget(self.target))
            }
            _ => Ok(()),
        }
    }

    pub fn currency_symbol(&self) -> &'static str {
        self.currency.symbol()
    }
}

/// Popular assets offered as one-click presets
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AssetPreset {
    pub key: &'static str,
    pub label: &'static str,
    pub asset: &'static str,
}

pub const ASSET_PRESETS: [AssetPreset; 8] = [
    AssetPreset { key: "nasdaq100", label: "Nasdaq 100",     asset: "Nasdaq 100 Index (NDX)" },
    AssetPreset { key: "sp500",     label: "S&P 500",        asset: "S&P 500 Index (SPX)" },
    AssetPreset { key: "hstech",    label: "Hang Seng Tech", asset: "Hang Seng Tech Index (HSTECH)" },
    AssetPreset { key: "hsi",       label: "Hang Seng",      asset: "Hang Seng Index (HSI)" },
    AssetPreset { key: "csi300",    label: "CSI 300",        asset: "CSI 300 Index (000300)" },
    AssetPreset { key: "moutai",    label: "Moutai",         asset: "Kweichow Moutai (600519)" },
    AssetPreset { key: "nvda",      label: "NVIDIA",         asset: "NVIDIA (NVDA)" },
    AssetPreset { key: "btc",       label: "Bitcoin",        asset: "Bitcoin (BTC)" },
];

pub fn find_preset(key: &str) -> Option<&'static AssetPreset> {
    let key = key.trim().to_ascii_lowercase();
    ASSET_PRESETS.iter().find(|p| p.key == key)
}
