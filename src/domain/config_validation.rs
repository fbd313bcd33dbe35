//! Configuration validation.
//!
//! Reads each config section into typed settings, rejecting bad values
//! before any data is fetched. Every key is optional.

use crate::domain::error::TickerdeskError;
use crate::domain::forecast::{MAX_HORIZON, MinMaxScaler, MultiStep, ScalerPolicy};
use crate::domain::market::Period;
use crate::domain::market_data::DEFAULT_CACHE_CAPACITY;
use crate::ports::config_port::ConfigPort;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_CSV_DIR: &str = "data";
pub const DEFAULT_TIMEOUT_SECS: i64 = 10;
pub const MAX_TIMEOUT_SECS: i64 = 300;
pub const MAX_CACHE_ENTRIES: i64 = 10_000;
pub const DEFAULT_MODEL_PATH: &str = "Latest_stock_price_model.json";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    Csv,
    Yahoo,
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ProviderKind::Csv),
            "yahoo" => Ok(ProviderKind::Yahoo),
            other => Err(format!("unknown provider '{}', expected csv or yahoo", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub provider: ProviderKind,
    pub csv_dir: PathBuf,
    pub timeout_secs: u64,
    /// Histories kept in memory before the oldest is dropped.
    pub cache_entries: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub path: PathBuf,
    pub scaler: ScalerPolicy,
    pub multi_step: MultiStep,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSettings {
    pub period: Period,
    pub currency: String,
    pub show_indicators: bool,
    pub enable_forecast: bool,
    pub horizon: usize,
    pub accuracy_lookback: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebSettings {
    pub listen: SocketAddr,
}

/// Validate every section at once.
pub fn validate_config(config: &dyn ConfigPort) -> Result<(), TickerdeskError> {
    data_settings(config)?;
    model_settings(config)?;
    dashboard_settings(config)?;
    web_settings(config)?;
    Ok(())
}

pub fn data_settings(config: &dyn ConfigPort) -> Result<DataSettings, TickerdeskError> {
    let provider = match non_empty(config, "data", "provider") {
        None => ProviderKind::default(),
        Some(s) => s
            .parse::<ProviderKind>()
            .map_err(|reason| invalid("data", "provider", reason))?,
    };
    let csv_dir = non_empty(config, "data", "csv_dir").unwrap_or_else(|| DEFAULT_CSV_DIR.into());
    let timeout = config.get_int("data", "timeout_secs", DEFAULT_TIMEOUT_SECS);
    if !(1..=MAX_TIMEOUT_SECS).contains(&timeout) {
        return Err(invalid(
            "data",
            "timeout_secs",
            format!("timeout_secs must be between 1 and {}", MAX_TIMEOUT_SECS),
        ));
    }
    let cache_entries =
        config.get_int("data", "cache_entries", DEFAULT_CACHE_CAPACITY as i64);
    if !(1..=MAX_CACHE_ENTRIES).contains(&cache_entries) {
        return Err(invalid(
            "data",
            "cache_entries",
            format!("cache_entries must be between 1 and {}", MAX_CACHE_ENTRIES),
        ));
    }
    Ok(DataSettings {
        provider,
        csv_dir: PathBuf::from(csv_dir),
        timeout_secs: timeout as u64,
        cache_entries: cache_entries as usize,
    })
}

pub fn model_settings(config: &dyn ConfigPort) -> Result<ModelSettings, TickerdeskError> {
    let path = non_empty(config, "model", "path").unwrap_or_else(|| DEFAULT_MODEL_PATH.into());
    let scaler = match non_empty(config, "model", "scaler").as_deref() {
        None | Some("per_call") => ScalerPolicy::PerCall,
        Some("fixed") => ScalerPolicy::Fixed(fixed_scaler(config)?),
        Some(other) => {
            return Err(invalid(
                "model",
                "scaler",
                format!("unknown scaler '{}', expected per_call or fixed", other),
            ));
        }
    };
    let multi_step = match non_empty(config, "model", "multi_step") {
        None => MultiStep::default(),
        Some(s) => s
            .parse::<MultiStep>()
            .map_err(|reason| invalid("model", "multi_step", reason))?,
    };
    Ok(ModelSettings {
        path: PathBuf::from(path),
        scaler,
        multi_step,
    })
}

fn fixed_scaler(config: &dyn ConfigPort) -> Result<MinMaxScaler, TickerdeskError> {
    let min = required_double(config, "model", "scaler_min")?;
    let max = required_double(config, "model", "scaler_max")?;
    MinMaxScaler::new(min, max).ok_or_else(|| {
        invalid(
            "model",
            "scaler_max",
            "scaler_min and scaler_max must be finite with scaler_min <= scaler_max",
        )
    })
}

pub fn dashboard_settings(config: &dyn ConfigPort) -> Result<DashboardSettings, TickerdeskError> {
    let period = match non_empty(config, "dashboard", "period") {
        None => Period::default(),
        Some(s) => s
            .parse::<Period>()
            .map_err(|reason| invalid("dashboard", "period", reason))?,
    };
    let currency = non_empty(config, "dashboard", "currency").unwrap_or_else(|| "USD".into());
    validate_currency(&currency)?;

    let horizon = config.get_int("dashboard", "horizon", 1);
    if !(1..=MAX_HORIZON as i64).contains(&horizon) {
        return Err(invalid(
            "dashboard",
            "horizon",
            format!("horizon must be between 1 and {}", MAX_HORIZON),
        ));
    }
    let lookback = config.get_int("dashboard", "accuracy_lookback", 30);
    if lookback < 1 {
        return Err(invalid(
            "dashboard",
            "accuracy_lookback",
            "accuracy_lookback must be at least 1",
        ));
    }

    Ok(DashboardSettings {
        period,
        currency: currency.to_uppercase(),
        show_indicators: config.get_bool("dashboard", "show_indicators", true),
        enable_forecast: config.get_bool("dashboard", "enable_forecast", true),
        horizon: horizon as usize,
        accuracy_lookback: lookback as usize,
    })
}

pub fn web_settings(config: &dyn ConfigPort) -> Result<WebSettings, TickerdeskError> {
    let listen = non_empty(config, "web", "listen").unwrap_or_else(|| DEFAULT_LISTEN.into());
    let listen = listen
        .parse::<SocketAddr>()
        .map_err(|_| invalid("web", "listen", format!("'{}' is not a socket address", listen)))?;
    Ok(WebSettings { listen })
}

/// Three ASCII letters, e.g. `USD` or `eur`.
pub fn validate_currency(currency: &str) -> Result<(), TickerdeskError> {
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(())
    } else {
        Err(invalid(
            "dashboard",
            "currency",
            format!("'{}' is not a three-letter currency code", currency),
        ))
    }
}

fn non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn required_double(config: &dyn ConfigPort, section: &str, key: &str) -> Result<f64, TickerdeskError> {
    let raw = non_empty(config, section, key).ok_or_else(|| TickerdeskError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    })?;
    raw.parse::<f64>()
        .map_err(|_| invalid(section, key, format!("'{}' is not a number", raw)))
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TickerdeskError {
    TickerdeskError::config_invalid(section, key, reason)
}
