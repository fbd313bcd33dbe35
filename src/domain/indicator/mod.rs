//! Technical indicator implementations.
//!
//! Every indicator produces one value per input bar. Warm-up rows carry
//! `None`; a column that was never computed is simply missing from the
//! [`IndicatorFrame`], so "absent" and "undefined" stay distinguishable.
//!
//! - `IndicatorColumn`: column identity, doubles as the frame key
//! - `IndicatorSeries`: one computed column
//! - `IndicatorFrame`: bars plus their derived columns

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stddev;

pub use bollinger::{BollingerSeries, calculate_bollinger};
pub use ema::calculate_ema;
pub use macd::{MacdSeries, calculate_macd};
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use stddev::calculate_stddev;

use crate::domain::ohlcv::{OhlcvBar, OhlcvTable};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndicatorColumn {
    Sma(usize),
    Ema(usize),
    Rsi,
    Macd,
    SignalLine,
    BollingerMiddle,
    BollingerStd,
    BollingerUpper,
    BollingerLower,
}

impl fmt::Display for IndicatorColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorColumn::Sma(period) => write!(f, "SMA_{}", period),
            IndicatorColumn::Ema(period) => write!(f, "EMA_{}", period),
            IndicatorColumn::Rsi => write!(f, "RSI"),
            IndicatorColumn::Macd => write!(f, "MACD"),
            IndicatorColumn::SignalLine => write!(f, "Signal_Line"),
            IndicatorColumn::BollingerMiddle => write!(f, "BB_Middle"),
            IndicatorColumn::BollingerStd => write!(f, "BB_Std"),
            IndicatorColumn::BollingerUpper => write!(f, "BB_Upper"),
            IndicatorColumn::BollingerLower => write!(f, "BB_Lower"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub column: IndicatorColumn,
    pub values: Vec<Option<f64>>,
}

impl IndicatorSeries {
    pub fn undefined(column: IndicatorColumn, len: usize) -> Self {
        Self {
            column,
            values: vec![None; len],
        }
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied().flatten()
    }
}

pub(crate) fn closes(bars: &[OhlcvBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// An OHLCV table augmented with derived indicator columns.
///
/// Every stored column has exactly one entry per bar.
#[derive(Debug, Clone, Default)]
pub struct IndicatorFrame {
    table: OhlcvTable,
    columns: BTreeMap<IndicatorColumn, Vec<Option<f64>>>,
}

impl IndicatorFrame {
    pub fn new(table: OhlcvTable) -> Self {
        Self {
            table,
            columns: BTreeMap::new(),
        }
    }

    pub fn table(&self) -> &OhlcvTable {
        &self.table
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        self.table.bars()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Store a computed column. Series whose length does not match the
    /// bar count are rejected and reported back as `false`.
    pub fn insert(&mut self, series: IndicatorSeries) -> bool {
        if series.values.len() != self.table.len() {
            return false;
        }
        self.columns.insert(series.column, series.values);
        true
    }

    pub fn column(&self, column: IndicatorColumn) -> Option<&[Option<f64>]> {
        self.columns.get(&column).map(Vec::as_slice)
    }

    pub fn has_column(&self, column: IndicatorColumn) -> bool {
        self.columns.contains_key(&column)
    }

    /// Value at `row`; `None` when the column is absent, the row is out of
    /// range, or the value is still in warm-up.
    pub fn value(&self, column: IndicatorColumn, row: usize) -> Option<f64> {
        self.columns.get(&column)?.get(row).copied().flatten()
    }

    pub fn latest(&self, column: IndicatorColumn) -> Option<f64> {
        let last = self.len().checked_sub(1)?;
        self.value(column, last)
    }

    pub fn columns(&self) -> impl Iterator<Item = IndicatorColumn> + '_ {
        self.columns.keys().copied()
    }
}
