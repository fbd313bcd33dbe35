//! Quotes, fundamentals, options and history ranges.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const NO_SUMMARY: &str = "No detailed business summary available for this company.";

/// Point-in-time price snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quote {
    pub last_price: f64,
    pub previous_close: f64,
    pub volume: u64,
}

impl Quote {
    /// Percentage move from the previous close; `None` without a usable
    /// previous close.
    pub fn day_change_pct(&self) -> Option<f64> {
        (self.previous_close.is_finite() && self.previous_close > 0.0)
            .then(|| (self.last_price - self.previous_close) / self.previous_close * 100.0)
    }

    pub fn day_change(&self) -> f64 {
        self.last_price - self.previous_close
    }

    pub fn converted(&self, rate: f64) -> Self {
        Self {
            last_price: self.last_price * rate,
            previous_close: self.previous_close * rate,
            volume: self.volume,
        }
    }
}

/// Company fundamentals. Every field is optional; providers fill what they have.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyInfo {
    pub name: Option<String>,
    pub summary: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub trailing_pe: Option<f64>,
    pub forward_pe: Option<f64>,
    pub market_cap: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
}

impl CompanyInfo {
    pub fn display_name<'a>(&'a self, ticker: &'a str) -> &'a str {
        self.name.as_deref().filter(|n| !n.trim().is_empty()).unwrap_or(ticker)
    }

    pub fn summary_or_default(&self) -> &str {
        self.summary
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(NO_SUMMARY)
    }

    /// Monetary fields converted at `rate`; ratios are unit-free and kept.
    pub fn converted(&self, rate: f64) -> Self {
        Self {
            market_cap: self.market_cap.map(|v| v * rate),
            fifty_two_week_high: self.fifty_two_week_high.map(|v| v * rate),
            fifty_two_week_low: self.fifty_two_week_low.map(|v| v * rate),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionContract {
    pub strike: f64,
    pub last_price: f64,
    pub volume: Option<u64>,
    pub implied_volatility: Option<f64>,
}

impl OptionContract {
    fn converted(&self, rate: f64) -> Self {
        Self {
            strike: self.strike * rate,
            last_price: self.last_price * rate,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionsChain {
    pub expiry: NaiveDate,
    pub calls: Vec<OptionContract>,
    pub puts: Vec<OptionContract>,
}

impl OptionsChain {
    pub fn converted(&self, rate: f64) -> Self {
        Self {
            expiry: self.expiry,
            calls: self.calls.iter().map(|c| c.converted(rate)).collect(),
            puts: self.puts.iter().map(|c| c.converted(rate)).collect(),
        }
    }
}

/// Pick `requested` when it is listed, otherwise the earliest expiry on or
/// after it, otherwise the first listed one.
pub fn nearest_expiry(expiries: &[NaiveDate], requested: Option<NaiveDate>) -> Option<NaiveDate> {
    let first = expiries.iter().min().copied()?;
    let Some(requested) = requested else {
        return Some(first);
    };
    if expiries.contains(&requested) {
        return Some(requested);
    }
    Some(
        expiries
            .iter()
            .filter(|d| **d >= requested)
            .min()
            .copied()
            .unwrap_or(first),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Period {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    #[default]
    FiveYears,
    TenYears,
    Max,
}

impl Period {
    pub const ALL: [Period; 8] = [
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
        Period::TwoYears,
        Period::FiveYears,
        Period::TenYears,
        Period::Max,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
            Period::TenYears => "10y",
            Period::Max => "max",
        }
    }

    fn months(&self) -> Option<u32> {
        match self {
            Period::OneMonth => Some(1),
            Period::ThreeMonths => Some(3),
            Period::SixMonths => Some(6),
            Period::OneYear => Some(12),
            Period::TwoYears => Some(24),
            Period::FiveYears => Some(60),
            Period::TenYears => Some(120),
            Period::Max => None,
        }
    }

    /// First date covered when the period ends at `end`; `None` for `Max`.
    pub fn start_from(&self, end: NaiveDate) -> Option<NaiveDate> {
        end.checked_sub_months(Months::new(self.months()?))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Period::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown period '{}'", s))
    }
}

/// The span of history requested from a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryRange {
    Period(Period),
    Between { start: NaiveDate, end: NaiveDate },
}

impl Default for HistoryRange {
    fn default() -> Self {
        HistoryRange::Period(Period::default())
    }
}

impl HistoryRange {
    /// Inclusive date bounds when the range ends at `latest`.
    pub fn bounds(&self, latest: NaiveDate) -> (Option<NaiveDate>, NaiveDate) {
        match self {
            HistoryRange::Period(p) => (p.start_from(latest), latest),
            HistoryRange::Between { start, end } => (Some(*start), *end),
        }
    }
}

impl fmt::Display for HistoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryRange::Period(p) => write!(f, "{}", p),
            HistoryRange::Between { start, end } => write!(f, "{}..{}", start, end),
        }
    }
}
