//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line, seeded with the first MACD value
//!
//! Default parameters: fast=12, slow=26, signal=9.
//! Both lines are defined from the first bar.

use crate::domain::indicator::ema::ema_values;
use crate::domain::indicator::{IndicatorColumn, IndicatorSeries, closes};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: IndicatorSeries,
    pub signal: IndicatorSeries,
}

pub fn calculate_macd(
    bars: &[OhlcvBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> MacdSeries {
    if fast == 0 || slow == 0 || signal_period == 0 {
        return MacdSeries {
            macd: IndicatorSeries::undefined(IndicatorColumn::Macd, bars.len()),
            signal: IndicatorSeries::undefined(IndicatorColumn::SignalLine, bars.len()),
        };
    }

    let prices = closes(bars);
    let ema_fast = ema_values(&prices, fast);
    let ema_slow = ema_values(&prices, slow);

    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema_values(&macd_line, signal_period);

    MacdSeries {
        macd: IndicatorSeries {
            column: IndicatorColumn::Macd,
            values: macd_line.into_iter().map(Some).collect(),
        },
        signal: IndicatorSeries {
            column: IndicatorColumn::SignalLine,
            values: signal_line.into_iter().map(Some).collect(),
        },
    }
}
