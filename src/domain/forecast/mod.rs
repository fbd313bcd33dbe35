//! Next-day price forecasting with a pre-trained sequence model.
//!
//! Close prices are min-max normalized, the trailing window is fed to the
//! model, and the single normalized prediction is mapped back to price.

pub mod lstm;
pub mod model_handle;
pub mod scaler;

pub use model_handle::ModelHandle;
pub use scaler::{MinMaxScaler, ScalerPolicy};

use crate::domain::error::TickerdeskError;
use crate::domain::ohlcv::OhlcvTable;
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Trailing samples per prediction when the artifact does not say otherwise.
pub const DEFAULT_WINDOW: usize = 100;
/// Fewest rows any forecast is made from, whatever the model window.
pub const MIN_FORECAST_ROWS: usize = DEFAULT_WINDOW;
/// Longest forecast, in calendar days.
pub const MAX_HORIZON: usize = 365;
pub const MIN_EVALUATION_ROWS: usize = 150;
pub const DEFAULT_ACCURACY_LOOKBACK: usize = 30;

/// How forecasts longer than one day are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultiStep {
    /// One model call; the value is repeated on every requested date.
    #[default]
    Hold,
    /// Feed each prediction back into the window and predict again.
    Recursive,
}

impl MultiStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            MultiStep::Hold => "hold",
            MultiStep::Recursive => "recursive",
        }
    }
}

impl fmt::Display for MultiStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MultiStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hold" => Ok(MultiStep::Hold),
            "recursive" => Ok(MultiStep::Recursive),
            other => Err(format!("unknown multi-step mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub price: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Forecast {
    pub points: Vec<ForecastPoint>,
}

impl Forecast {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&ForecastPoint> {
        self.points.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AccuracyPoint {
    pub date: NaiveDate,
    pub actual: f64,
    pub predicted: f64,
}

/// One-step-ahead performance over the most recent closes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracyReport {
    pub points: Vec<AccuracyPoint>,
    /// Mean squared error in normalized units.
    pub mse: f64,
    /// Mean absolute percentage error, in percent.
    pub mape: f64,
    /// `max(0, 100 - mape)`.
    pub accuracy_pct: f64,
}

pub struct ForecastEngine {
    model: Arc<ModelHandle>,
    scaler: ScalerPolicy,
    multi_step: MultiStep,
}

/// Reject horizons outside `1..=MAX_HORIZON`.
pub fn check_horizon(horizon: usize) -> Result<(), TickerdeskError> {
    if (1..=MAX_HORIZON).contains(&horizon) {
        Ok(())
    } else {
        Err(TickerdeskError::InvalidHorizon { horizon })
    }
}

impl ForecastEngine {
    pub fn new(model: Arc<ModelHandle>) -> Self {
        Self {
            model,
            scaler: ScalerPolicy::default(),
            multi_step: MultiStep::default(),
        }
    }

    pub fn with_scaler(mut self, scaler: ScalerPolicy) -> Self {
        self.scaler = scaler;
        self
    }

    pub fn with_multi_step(mut self, multi_step: MultiStep) -> Self {
        self.multi_step = multi_step;
        self
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn multi_step(&self) -> MultiStep {
        self.multi_step
    }

    /// Forecast `horizon` calendar days past the last bar.
    ///
    /// `Ok(None)` when the model is unavailable, the table has fewer than
    /// [`MIN_FORECAST_ROWS`] rows or is shorter than the model window, or the
    /// model produces no usable value.
    pub fn predict_future(
        &self,
        table: &OhlcvTable,
        horizon: usize,
    ) -> Result<Option<Forecast>, TickerdeskError> {
        check_horizon(horizon)?;
        let Some(model) = self.model.get() else {
            return Ok(None);
        };
        let window_len = model.window_len();
        let Some(last_date) = table.last_date() else {
            return Ok(None);
        };
        if window_len == 0 || table.len() < window_len.max(MIN_FORECAST_ROWS) {
            debug!(
                ticker = table.ticker(),
                rows = table.len(),
                window = window_len,
                "not enough history to forecast"
            );
            return Ok(None);
        }

        let closes = table.closes();
        let Some(scaler) = self.scaler.scaler_for(&closes) else {
            return Ok(None);
        };
        let mut window = scaler.transform_all(&closes[closes.len() - window_len..]);

        let steps = match self.multi_step {
            MultiStep::Hold => 1,
            MultiStep::Recursive => horizon,
        };
        let mut prices = Vec::with_capacity(horizon);
        for _ in 0..steps {
            let scaled = match model.predict(&window) {
                Ok(v) if v.is_finite() => v,
                Ok(v) => {
                    warn!(ticker = table.ticker(), value = v, "model returned a non-finite value");
                    return Ok(None);
                }
                Err(e) => {
                    warn!(ticker = table.ticker(), error = %e, "prediction failed");
                    return Ok(None);
                }
            };
            prices.push(scaler.inverse_transform(scaled));
            window.remove(0);
            window.push(scaled);
        }
        if let Some(&held) = prices.last() {
            prices.resize(horizon, held);
        }

        let points: Option<Vec<ForecastPoint>> = prices
            .into_iter()
            .enumerate()
            .map(|(i, price)| {
                let date = last_date.checked_add_days(Days::new(i as u64 + 1))?;
                Some(ForecastPoint { date, price })
            })
            .collect();

        Ok(points.map(|points| Forecast { points }))
    }

    /// Replay one-step predictions over the last `lookback` closes, each
    /// from the window of closes before it, with a single scaler fitted to
    /// the whole table.
    pub fn evaluate(&self, table: &OhlcvTable, lookback: usize) -> Option<AccuracyReport> {
        if lookback == 0 || table.len() < MIN_EVALUATION_ROWS {
            return None;
        }
        let model = self.model.get()?;
        let window_len = model.window_len();
        if table.len() < window_len + lookback {
            return None;
        }

        let closes = table.closes();
        let scaler = self.scaler.scaler_for(&closes)?;
        let scaled = scaler.transform_all(&closes);
        let bars = table.bars();

        let mut points = Vec::with_capacity(lookback);
        let mut squared = 0.0;
        let mut pct = 0.0;
        for t in (closes.len() - lookback)..closes.len() {
            let predicted_scaled = model.predict(&scaled[t - window_len..t]).ok()?;
            if !predicted_scaled.is_finite() {
                return None;
            }
            let predicted = scaler.inverse_transform(predicted_scaled);
            let actual = closes[t];
            squared += (predicted_scaled - scaled[t]).powi(2);
            pct += ((actual - predicted) / actual).abs();
            points.push(AccuracyPoint {
                date: bars[t].date,
                actual,
                predicted,
            });
        }

        let n = points.len() as f64;
        let mape = 100.0 * pct / n;
        Some(AccuracyReport {
            points,
            mse: squared / n,
            mape,
            accuracy_pct: (100.0 - mape).max(0.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use crate::ports::model_port::{ModelLoader, SequenceModel};
    use approx::assert_relative_eq;

    /// Predicts the mean of its window.
    struct MeanModel {
        window: usize,
    }

    impl SequenceModel for MeanModel {
        fn window_len(&self) -> usize {
            self.window
        }

        fn predict(&self, window: &[f64]) -> Result<f64, TickerdeskError> {
            Ok(window.iter().sum::<f64>() / window.len() as f64)
        }
    }

    struct MeanLoader(usize);

    impl ModelLoader for MeanLoader {
        fn describe(&self) -> String {
            "mean".into()
        }

        fn load(&self) -> Result<Arc<dyn SequenceModel>, TickerdeskError> {
            Ok(Arc::new(MeanModel { window: self.0 }))
        }
    }

    struct MissingLoader;

    impl ModelLoader for MissingLoader {
        fn describe(&self) -> String {
            "missing".into()
        }

        fn load(&self) -> Result<Arc<dyn SequenceModel>, TickerdeskError> {
            Err(TickerdeskError::ModelLoad {
                path: "missing.json".into(),
                reason: "not found".into(),
            })
        }
    }

    fn engine(window: usize) -> ForecastEngine {
        ForecastEngine::new(Arc::new(ModelHandle::new(MeanLoader(window))))
    }

    fn make_table(prices: &[f64]) -> OhlcvTable {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = prices
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
            .collect();
        OhlcvTable::new("FC", bars)
    }

    fn wave(n: usize) -> Vec<f64> {
        (0..n).map(|i| 150.0 + (i as f64 * 0.21).sin() * 20.0).collect()
    }

    #[test]
    fn zero_horizon_is_rejected() {
        let result = engine(100).predict_future(&make_table(&wave(120)), 0);
        assert!(matches!(result, Err(TickerdeskError::InvalidHorizon { horizon: 0 })));
    }

    #[test]
    fn short_table_has_no_forecast() {
        let result = engine(100).predict_future(&make_table(&wave(99)), 1).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn missing_model_has_no_forecast() {
        let engine = ForecastEngine::new(Arc::new(ModelHandle::new(MissingLoader)));
        let result = engine.predict_future(&make_table(&wave(300)), 1).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn mean_model_round_trips_through_scaler() {
        let prices = wave(100);
        let forecast = engine(100)
            .predict_future(&make_table(&prices), 1)
            .unwrap()
            .unwrap();
        let mean = prices.iter().sum::<f64>() / prices.len() as f64;
        assert_eq!(forecast.len(), 1);
        assert_relative_eq!(forecast.points[0].price, mean, epsilon = 1e-9);
    }

    #[test]
    fn hold_repeats_value_on_consecutive_days() {
        let table = make_table(&wave(130));
        let forecast = engine(100).predict_future(&table, 5).unwrap().unwrap();

        assert_eq!(forecast.len(), 5);
        let last = table.last_date().unwrap();
        for (i, p) in forecast.points.iter().enumerate() {
            assert_eq!(p.date, last + chrono::Duration::days(i as i64 + 1));
            assert_eq!(p.price, forecast.points[0].price);
        }
    }

    #[test]
    fn recursive_feeds_predictions_back() {
        let table = make_table(&wave(130));
        let forecast = engine(100)
            .with_multi_step(MultiStep::Recursive)
            .predict_future(&table, 3)
            .unwrap()
            .unwrap();

        assert_eq!(forecast.len(), 3);
        assert_ne!(forecast.points[0].price, forecast.points[1].price);
    }

    #[test]
    fn fixed_scaler_is_used() {
        let fixed = MinMaxScaler::new(0.0, 1000.0).unwrap();
        let prices = vec![200.0; 100];
        let forecast = engine(100)
            .with_scaler(ScalerPolicy::Fixed(fixed))
            .predict_future(&make_table(&prices), 1)
            .unwrap()
            .unwrap();
        assert_relative_eq!(forecast.points[0].price, 200.0, epsilon = 1e-9);
    }

    #[test]
    fn horizon_beyond_maximum_is_rejected() {
        let table = make_table(&wave(120));
        for horizon in [MAX_HORIZON + 1, 1_000_000_000, usize::MAX] {
            let result = engine(100).predict_future(&table, horizon);
            assert!(matches!(
                result,
                Err(TickerdeskError::InvalidHorizon { horizon: h }) if h == horizon
            ));
        }
        let forecast = engine(100).predict_future(&table, MAX_HORIZON).unwrap().unwrap();
        assert_eq!(forecast.len(), MAX_HORIZON);
    }

    #[test]
    fn small_model_window_still_needs_100_rows() {
        let engine = engine(50);
        assert!(engine.predict_future(&make_table(&wave(60)), 1).unwrap().is_none());
        assert!(engine.predict_future(&make_table(&wave(99)), 1).unwrap().is_none());
        assert!(engine.predict_future(&make_table(&wave(100)), 1).unwrap().is_some());
    }

    #[test]
    fn large_model_window_needs_its_own_length() {
        let engine = engine(120);
        assert!(engine.predict_future(&make_table(&wave(119)), 1).unwrap().is_none());
        assert!(engine.predict_future(&make_table(&wave(120)), 1).unwrap().is_some());
    }

    #[test]
    fn evaluate_needs_150_rows() {
        assert!(engine(100).evaluate(&make_table(&wave(149)), 30).is_none());
        assert!(engine(100).evaluate(&make_table(&wave(200)), 0).is_none());
    }

    #[test]
    fn evaluate_reports_lookback_points() {
        let table = make_table(&wave(200));
        let report = engine(100).evaluate(&table, 30).unwrap();

        assert_eq!(report.points.len(), 30);
        assert_eq!(report.points[29].date, table.last_date().unwrap());
        assert!(report.mse >= 0.0);
        assert!(report.mape >= 0.0);
        assert!((0.0..=100.0).contains(&report.accuracy_pct));
        assert_relative_eq!(report.accuracy_pct, (100.0 - report.mape).max(0.0));
    }

    #[test]
    fn evaluate_perfect_on_constant_series() {
        let report = engine(100).evaluate(&make_table(&vec![75.0; 160]), 30).unwrap();
        assert_eq!(report.mse, 0.0);
        assert_eq!(report.mape, 0.0);
        assert_eq!(report.accuracy_pct, 100.0);
    }

    #[test]
    fn multi_step_parses() {
        assert_eq!("hold".parse::<MultiStep>(), Ok(MultiStep::Hold));
        assert_eq!(" Recursive ".parse::<MultiStep>(), Ok(MultiStep::Recursive));
        assert!("chain".parse::<MultiStep>().is_err());
    }
}
