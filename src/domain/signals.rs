//! Discrete trading signals read from the last two rows of an indicator frame.

use crate::domain::indicator::{IndicatorColumn, IndicatorFrame};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Signals need SMA_200 to be meaningful.
pub const MIN_SIGNAL_ROWS: usize = 200;
pub const RSI_OVERBOUGHT: f64 = 70.0;
pub const RSI_OVERSOLD: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SignalName {
    #[serde(rename = "RSI_Status")]
    RsiStatus,
    #[serde(rename = "Trend")]
    Trend,
    #[serde(rename = "MACD_Cross")]
    MacdCross,
}

impl fmt::Display for SignalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalName::RsiStatus => "RSI_Status",
            SignalName::Trend => "Trend",
            SignalName::MacdCross => "MACD_Cross",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalLabel {
    Overbought,
    Oversold,
    Neutral,
    Bullish,
    Bearish,
    BullishCrossover,
    BearishCrossover,
    NoCrossover,
}

impl SignalLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalLabel::Overbought => "Overbought (Potential Sell)",
            SignalLabel::Oversold => "Oversold (Potential Buy)",
            SignalLabel::Neutral => "Neutral",
            SignalLabel::Bullish => "Bullish (Golden Cross Area)",
            SignalLabel::Bearish => "Bearish",
            SignalLabel::BullishCrossover => "Bullish Crossover",
            SignalLabel::BearishCrossover => "Bearish Crossover",
            SignalLabel::NoCrossover => "None",
        }
    }

    /// Positive for buy-side labels, negative for sell-side, zero otherwise.
    pub fn bias(&self) -> i8 {
        match self {
            SignalLabel::Oversold | SignalLabel::Bullish | SignalLabel::BullishCrossover => 1,
            SignalLabel::Overbought | SignalLabel::Bearish | SignalLabel::BearishCrossover => -1,
            SignalLabel::Neutral | SignalLabel::NoCrossover => 0,
        }
    }
}

impl fmt::Display for SignalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SignalLabel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SignalSet(BTreeMap<SignalName, SignalLabel>);

impl SignalSet {
    pub fn get(&self, name: SignalName) -> Option<SignalLabel> {
        self.0.get(&name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SignalName, SignalLabel)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

// Comparisons with an undefined operand are false.
fn gt(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a > b)
}

fn lt(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a < b)
}

fn ge(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a >= b)
}

fn le(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a <= b)
}

/// Classify RSI level, SMA trend and MACD crossover for the latest row.
/// Frames shorter than [`MIN_SIGNAL_ROWS`] produce an empty set.
pub fn check_signals(frame: &IndicatorFrame) -> SignalSet {
    let rows = frame.len();
    if rows < MIN_SIGNAL_ROWS {
        return SignalSet::default();
    }
    let last = rows - 1;
    let prev = rows - 2;
    let at = |col: IndicatorColumn, row: usize| frame.value(col, row);

    let rsi = at(IndicatorColumn::Rsi, last);
    let rsi_status = if gt(rsi, Some(RSI_OVERBOUGHT)) {
        SignalLabel::Overbought
    } else if lt(rsi, Some(RSI_OVERSOLD)) {
        SignalLabel::Oversold
    } else {
        SignalLabel::Neutral
    };

    let trend = if gt(
        at(IndicatorColumn::Sma(50), last),
        at(IndicatorColumn::Sma(200), last),
    ) {
        SignalLabel::Bullish
    } else {
        SignalLabel::Bearish
    };

    let macd_l = at(IndicatorColumn::Macd, last);
    let sig_l = at(IndicatorColumn::SignalLine, last);
    let macd_p = at(IndicatorColumn::Macd, prev);
    let sig_p = at(IndicatorColumn::SignalLine, prev);
    let cross = if gt(macd_l, sig_l) && le(macd_p, sig_p) {
        SignalLabel::BullishCrossover
    } else if lt(macd_l, sig_l) && ge(macd_p, sig_p) {
        SignalLabel::BearishCrossover
    } else {
        SignalLabel::NoCrossover
    };

    let mut set = BTreeMap::new();
    set.insert(SignalName::RsiStatus, rsi_status);
    set.insert(SignalName::Trend, trend);
    set.insert(SignalName::MacdCross, cross);
    SignalSet(set)
}
