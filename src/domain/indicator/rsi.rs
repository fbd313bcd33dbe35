//! RSI (Relative Strength Index).
//!
//! Gains and losses use a simple rolling mean over n changes:
//! - change[0] counts as zero gain and zero loss
//! - avg_gain[i] = mean(gain[i-n+1..=i]), likewise for losses
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100 when avg_gain > 0, otherwise 50 (flat window).
//!
//! Warmup: first (n-1) bars are `None`.

use crate::domain::indicator::sma::rolling_mean;
use crate::domain::indicator::{IndicatorColumn, IndicatorSeries, closes};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 14;

/// RSI of a single window from its average gain and loss. Always in [0, 100].
pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss <= 0.0 {
        if avg_gain > 0.0 { 100.0 } else { 50.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

pub fn rsi_values(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut gains = Vec::with_capacity(values.len());
    let mut losses = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        let change = if i == 0 { 0.0 } else { values[i] - values[i - 1] };
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let avg_gains = rolling_mean(&gains, period);
    let avg_losses = rolling_mean(&losses, period);

    avg_gains
        .into_iter()
        .zip(avg_losses)
        .map(|(gain, loss)| Some(rsi_from_averages(gain?, loss?)))
        .collect()
}

pub fn calculate_rsi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    IndicatorSeries {
        column: IndicatorColumn::Rsi,
        values: rsi_values(&closes(bars), period),
    }
}
