#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tickerdesk::domain::error::TickerdeskError;
use tickerdesk::domain::forecast::{ForecastEngine, ModelHandle};
use tickerdesk::domain::market::{CompanyInfo, HistoryRange, OptionContract, OptionsChain, Quote};
use tickerdesk::domain::market_data::{HistoryCache, MarketData};
pub use tickerdesk::domain::ohlcv::{OhlcvBar, OhlcvTable};
use tickerdesk::ports::market_data_port::MarketDataPort;
use tickerdesk::ports::model_port::{ModelLoader, SequenceModel};

#[derive(Default)]
pub struct MockMarketDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
    pub quotes: HashMap<String, Quote>,
    pub companies: HashMap<String, CompanyInfo>,
    pub chains: HashMap<String, Vec<OptionsChain>>,
    pub fx: HashMap<String, f64>,
    pub history_calls: Arc<AtomicUsize>,
}

impl MockMarketDataPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }

    pub fn with_quote(mut self, ticker: &str, last_price: f64, previous_close: f64) -> Self {
        self.quotes.insert(
            ticker.to_string(),
            Quote {
                last_price,
                previous_close,
                volume: 1_000_000,
            },
        );
        self
    }

    pub fn with_company(mut self, ticker: &str, info: CompanyInfo) -> Self {
        self.companies.insert(ticker.to_string(), info);
        self
    }

    pub fn with_chain(mut self, ticker: &str, chain: OptionsChain) -> Self {
        self.chains.entry(ticker.to_string()).or_default().push(chain);
        self
    }

    pub fn with_fx(mut self, currency: &str, rate: f64) -> Self {
        self.fx.insert(currency.to_string(), rate);
        self
    }

    /// Shared counter of `get_history` calls, readable after the port is moved.
    pub fn history_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.history_calls)
    }
}

impl MarketDataPort for MockMarketDataPort {
    fn get_history(
        &self,
        ticker: &str,
        range: &HistoryRange,
    ) -> Result<OhlcvTable, TickerdeskError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.errors.get(ticker) {
            return Err(TickerdeskError::provider(reason.clone()));
        }
        let bars = self.data.get(ticker).cloned().unwrap_or_default();
        let Some(latest) = bars.last().map(|b| b.date) else {
            return Ok(OhlcvTable::empty(ticker));
        };
        let (start, end) = range.bounds(latest);
        let bars = bars
            .into_iter()
            .filter(|b| start.is_none_or(|s| b.date >= s) && b.date <= end)
            .collect();
        Ok(OhlcvTable::new(ticker, bars))
    }

    fn get_quote(&self, ticker: &str) -> Result<Quote, TickerdeskError> {
        self.quotes
            .get(ticker)
            .cloned()
            .ok_or_else(|| TickerdeskError::NoData {
                ticker: ticker.to_string(),
            })
    }

    fn get_company_info(&self, ticker: &str) -> Result<CompanyInfo, TickerdeskError> {
        self.companies
            .get(ticker)
            .cloned()
            .ok_or_else(|| TickerdeskError::NoData {
                ticker: ticker.to_string(),
            })
    }

    fn get_option_expiries(&self, ticker: &str) -> Result<Vec<NaiveDate>, TickerdeskError> {
        Ok(self
            .chains
            .get(ticker)
            .map(|chains| chains.iter().map(|c| c.expiry).collect())
            .unwrap_or_default())
    }

    fn get_options_chain(
        &self,
        ticker: &str,
        expiry: NaiveDate,
    ) -> Result<OptionsChain, TickerdeskError> {
        self.chains
            .get(ticker)
            .and_then(|chains| chains.iter().find(|c| c.expiry == expiry))
            .cloned()
            .ok_or_else(|| TickerdeskError::NoData {
                ticker: ticker.to_string(),
            })
    }

    fn get_fx_rate(&self, currency: &str) -> Result<f64, TickerdeskError> {
        self.fx
            .get(currency)
            .copied()
            .ok_or_else(|| TickerdeskError::provider(format!("no rate for {}", currency)))
    }
}

/// Predicts the mean of its window.
pub struct MeanModel {
    pub window: usize,
}

impl SequenceModel for MeanModel {
    fn window_len(&self) -> usize {
        self.window
    }

    fn predict(&self, window: &[f64]) -> Result<f64, TickerdeskError> {
        Ok(window.iter().sum::<f64>() / window.len() as f64)
    }
}

/// Predicts the last value of its window.
pub struct LastValueModel {
    pub window: usize,
}

impl SequenceModel for LastValueModel {
    fn window_len(&self) -> usize {
        self.window
    }

    fn predict(&self, window: &[f64]) -> Result<f64, TickerdeskError> {
        Ok(window[window.len() - 1])
    }
}

pub struct StubLoader {
    pub model: Option<Arc<dyn SequenceModel>>,
    pub loads: Arc<AtomicUsize>,
}

impl StubLoader {
    pub fn with_model(model: impl SequenceModel + 'static) -> Self {
        Self {
            model: Some(Arc::new(model)),
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn missing() -> Self {
        Self {
            model: None,
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ModelLoader for StubLoader {
    fn describe(&self) -> String {
        "stub".to_string()
    }

    fn load(&self) -> Result<Arc<dyn SequenceModel>, TickerdeskError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.model.clone().ok_or_else(|| TickerdeskError::ModelLoad {
            path: "stub".into(),
            reason: "no such file".into(),
        })
    }
}

pub fn market(port: MockMarketDataPort) -> MarketData {
    MarketData::new(port, HistoryCache::new())
}

pub fn engine(loader: StubLoader) -> ForecastEngine {
    ForecastEngine::new(Arc::new(ModelHandle::new(loader)))
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Daily bars rising by one per day from `start_price`.
pub fn generate_bars(start_date: &str, count: usize, start_price: f64) -> Vec<OhlcvBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    (0..count)
        .map(|i| {
            let close = start_price + i as f64;
            OhlcvBar {
                date: start + chrono::Duration::days(i as i64),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000 + i as u64,
            }
        })
        .collect()
}

/// Bars whose closes follow `closes` exactly.
pub fn bars_from_closes(start_date: &str, closes: &[f64]) -> Vec<OhlcvBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 500,
        })
        .collect()
}

pub fn contract(strike: f64, last_price: f64) -> OptionContract {
    OptionContract {
        strike,
        last_price,
        volume: Some(10),
        implied_volatility: Some(0.4),
    }
}
