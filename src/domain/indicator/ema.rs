//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the first close, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Defined from the first bar onwards; there is no warm-up.

use crate::domain::indicator::{IndicatorColumn, IndicatorSeries, closes};
use crate::domain::ohlcv::OhlcvBar;

pub fn smoothing_factor(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// EMA over raw values. Empty for an empty input or a zero span.
pub fn ema_values(values: &[f64], span: usize) -> Vec<f64> {
    if span == 0 || values.is_empty() {
        return Vec::new();
    }
    let k = smoothing_factor(span);
    let mut out = Vec::with_capacity(values.len());
    let mut ema = values[0];
    out.push(ema);
    for &v in &values[1..] {
        ema = v * k + ema * (1.0 - k);
        out.push(ema);
    }
    out
}

pub fn calculate_ema(bars: &[OhlcvBar], span: usize) -> IndicatorSeries {
    if span == 0 {
        return IndicatorSeries::undefined(IndicatorColumn::Ema(span), bars.len());
    }
    IndicatorSeries {
        column: IndicatorColumn::Ema(span),
        values: ema_values(&closes(bars), span)
            .into_iter()
            .map(Some)
            .collect(),
    }
}
