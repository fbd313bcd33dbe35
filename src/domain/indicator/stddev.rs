//! Rolling standard deviation of closes.
//!
//! Sample standard deviation (divides by n-1) over the trailing n closes.
//! Warmup: first (n-1) bars are `None`; a window of fewer than two values
//! has no sample deviation and stays `None`.

use crate::domain::indicator::{IndicatorColumn, IndicatorSeries, closes};
use crate::domain::ohlcv::OhlcvBar;

pub fn rolling_std(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period < 2 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            let window = &values[i + 1 - period..=i];
            let mean = window.iter().sum::<f64>() / period as f64;
            let variance = window
                .iter()
                .map(|v| {
                    let diff = v - mean;
                    diff * diff
                })
                .sum::<f64>()
                / (period - 1) as f64;
            Some(variance.sqrt())
        })
        .collect()
}

pub fn calculate_stddev(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    IndicatorSeries {
        column: IndicatorColumn::BollingerStd,
        values: rolling_std(&closes(bars), period),
    }
}
