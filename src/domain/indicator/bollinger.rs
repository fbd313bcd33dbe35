//! Bollinger Bands.
//!
//! - Middle: SMA over n periods
//! - Std: sample standard deviation over the same n closes
//! - Upper: Middle + (multiplier × Std)
//! - Lower: Middle - (multiplier × Std)
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are `None`.

use crate::domain::indicator::sma::rolling_mean;
use crate::domain::indicator::stddev::rolling_std;
use crate::domain::indicator::{IndicatorColumn, IndicatorSeries, closes};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerSeries {
    pub middle: IndicatorSeries,
    pub std: IndicatorSeries,
    pub upper: IndicatorSeries,
    pub lower: IndicatorSeries,
}

pub fn calculate_bollinger(bars: &[OhlcvBar], period: usize, multiplier: f64) -> BollingerSeries {
    let prices = closes(bars);
    let middle = rolling_mean(&prices, period);
    let std = rolling_std(&prices, period);

    let band = |sign: f64| -> Vec<Option<f64>> {
        middle
            .iter()
            .zip(&std)
            .map(|(m, s)| Some(m.as_ref()? + sign * multiplier * s.as_ref()?))
            .collect()
    };
    let upper = band(1.0);
    let lower = band(-1.0);

    BollingerSeries {
        middle: IndicatorSeries {
            column: IndicatorColumn::BollingerMiddle,
            values: middle,
        },
        std: IndicatorSeries {
            column: IndicatorColumn::BollingerStd,
            values: std,
        },
        upper: IndicatorSeries {
            column: IndicatorColumn::BollingerUpper,
            values: upper,
        },
        lower: IndicatorSeries {
            column: IndicatorColumn::BollingerLower,
            values: lower,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64]) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect()
    }

    #[test]
    fn bollinger_warmup() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0]);
        let bb = calculate_bollinger(&bars, 3, DEFAULT_MULTIPLIER);

        for series in [&bb.middle, &bb.std, &bb.upper, &bb.lower] {
            assert_eq!(series.values[0], None);
            assert_eq!(series.values[1], None);
            assert!(series.values[2].is_some());
        }
    }

    #[test]
    fn bollinger_known_values() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let bb = calculate_bollinger(&bars, 3, 2.0);

        // mean 20, sample variance (100 + 0 + 100) / 2 = 100, std 10.
        assert!((bb.middle.values[2].unwrap() - 20.0).abs() < f64::EPSILON);
        assert!((bb.std.values[2].unwrap() - 10.0).abs() < f64::EPSILON);
        assert!((bb.upper.values[2].unwrap() - 40.0).abs() < f64::EPSILON);
        assert!((bb.lower.values[2].unwrap() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bollinger_bands_are_ordered() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.4).cos() * 8.0).collect();
        let bb = calculate_bollinger(&make_bars(&prices), DEFAULT_PERIOD, DEFAULT_MULTIPLIER);

        for i in 0..prices.len() {
            if let (Some(u), Some(m), Some(l)) =
                (bb.upper.values[i], bb.middle.values[i], bb.lower.values[i])
            {
                assert!(u >= m && m >= l, "row {} not ordered", i);
            }
        }
    }

    #[test]
    fn bollinger_constant_prices_collapse() {
        let bb = calculate_bollinger(&make_bars(&[50.0; 25]), DEFAULT_PERIOD, DEFAULT_MULTIPLIER);
        assert_eq!(bb.upper.last(), Some(50.0));
        assert_eq!(bb.lower.last(), Some(50.0));
    }

    #[test]
    fn bollinger_columns() {
        let bb = calculate_bollinger(&[], DEFAULT_PERIOD, DEFAULT_MULTIPLIER);
        assert_eq!(bb.middle.column, IndicatorColumn::BollingerMiddle);
        assert_eq!(bb.std.column, IndicatorColumn::BollingerStd);
        assert_eq!(bb.upper.column, IndicatorColumn::BollingerUpper);
        assert_eq!(bb.lower.column, IndicatorColumn::BollingerLower);
        assert!(bb.upper.values.is_empty());
    }
}
