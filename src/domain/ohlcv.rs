//! OHLCV bars and the per-query price table.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl OhlcvBar {
    /// Close at or above open. Drawn green on the price chart.
    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }

    fn has_close(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }

    /// Multiply every price field by `factor`; volume is untouched.
    pub fn converted(&self, factor: f64) -> Self {
        Self {
            date: self.date,
            open: self.open * factor,
            high: self.high * factor,
            low: self.low * factor,
            close: self.close * factor,
            volume: self.volume,
        }
    }
}

/// Bars for one ticker, ordered by date with no duplicate dates.
///
/// Bars without a usable close are dropped on construction, so every row
/// of a table can take part in indicator computation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OhlcvTable {
    ticker: String,
    bars: Vec<OhlcvBar>,
}

impl OhlcvTable {
    pub fn new(ticker: impl Into<String>, bars: Vec<OhlcvBar>) -> Self {
        let ticker = ticker.into();
        let total = bars.len();

        let mut kept: Vec<OhlcvBar> = bars.into_iter().filter(OhlcvBar::has_close).collect();
        if kept.len() < total {
            warn!(
                ticker = %ticker,
                dropped = total - kept.len(),
                "dropping bars without a close price"
            );
        }

        // Stable sort, so for a repeated date the bar supplied last wins.
        kept.sort_by_key(|b| b.date);
        let mut bars: Vec<OhlcvBar> = Vec::with_capacity(kept.len());
        for bar in kept {
            match bars.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => bars.push(bar),
            }
        }

        Self { ticker, bars }
    }

    pub fn empty(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            bars: Vec::new(),
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// The last `n` bars (all of them when the table is shorter).
    pub fn tail(&self, n: usize) -> &[OhlcvBar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }

    /// Price fields converted into another currency at `rate` units per USD.
    pub fn converted(&self, rate: f64) -> Self {
        Self {
            ticker: self.ticker.clone(),
            bars: self.bars.iter().map(|b| b.converted(rate)).collect(),
        }
    }
}
