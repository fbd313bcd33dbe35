//! Dashboard assembly: one call gathers everything a ticker page shows.

use crate::domain::error::TickerdeskError;
use crate::domain::forecast::{
    AccuracyReport, DEFAULT_ACCURACY_LOOKBACK, Forecast, ForecastEngine, check_horizon,
};
use crate::domain::indicator::IndicatorFrame;
use crate::domain::indicator_engine::add_technical_indicators;
use crate::domain::market::{CompanyInfo, HistoryRange, OptionsChain, Quote};
use crate::domain::market_data::{BASE_CURRENCY, MarketData};
use crate::domain::ohlcv::OhlcvTable;
use crate::domain::signals::{SignalSet, check_signals};
use crate::domain::ticker::{resolve_ticker, validate_symbol};
use chrono::NaiveDate;
use tracing::info;

/// Options rows shown per side of the chain.
pub const OPTIONS_ROWS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardRequest {
    /// Ticker symbol or company name.
    pub query: String,
    pub range: HistoryRange,
    pub currency: String,
    pub show_indicators: bool,
    pub enable_forecast: bool,
    pub horizon: usize,
    pub accuracy_lookback: usize,
    pub expiry: Option<NaiveDate>,
}

impl Default for DashboardRequest {
    fn default() -> Self {
        Self {
            query: "Nvidia".to_string(),
            range: HistoryRange::default(),
            currency: BASE_CURRENCY.to_string(),
            show_indicators: true,
            enable_forecast: true,
            horizon: 1,
            accuracy_lookback: DEFAULT_ACCURACY_LOOKBACK,
            expiry: None,
        }
    }
}

/// Everything rendered for one ticker. Prices are in `currency`.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub ticker: String,
    pub currency: String,
    pub fx_rate: f64,
    pub company: Option<CompanyInfo>,
    pub quote: Option<Quote>,
    pub frame: IndicatorFrame,
    pub signals: SignalSet,
    pub show_indicators: bool,
    pub forecast_enabled: bool,
    pub forecast: Option<Forecast>,
    pub accuracy: Option<AccuracyReport>,
    pub options: Option<OptionsChain>,
    pub expiries: Vec<NaiveDate>,
}

impl Dashboard {
    /// True when the provider had no price history for the ticker.
    pub fn history_empty(&self) -> bool {
        self.frame.is_empty()
    }

    pub fn display_name(&self) -> &str {
        match &self.company {
            Some(info) => info.display_name(&self.ticker),
            None => &self.ticker,
        }
    }
}

/// Resolved ticker and its history converted into the requested currency.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    pub ticker: String,
    pub currency: String,
    pub fx_rate: f64,
    pub table: OhlcvTable,
}

/// Resolve the query, fetch history and convert it. An empty table means the
/// provider had nothing for the ticker. Queries that resolve to something
/// other than a plain symbol are `NoData` before any provider call.
pub fn load_history(
    market: &MarketData,
    request: &DashboardRequest,
) -> Result<PriceHistory, TickerdeskError> {
    let ticker = resolve_ticker(&request.query);
    if ticker.is_empty() {
        return Err(TickerdeskError::NoData {
            ticker: request.query.clone(),
        });
    }
    validate_symbol(&ticker)?;
    let currency = request.currency.trim().to_uppercase();
    let fx_rate = market.fx_rate(&currency);
    let table = market.history(&ticker, &request.range).converted(fx_rate);
    Ok(PriceHistory {
        ticker,
        currency,
        fx_rate,
        table,
    })
}

pub fn build_dashboard(
    market: &MarketData,
    forecaster: &ForecastEngine,
    request: &DashboardRequest,
) -> Result<Dashboard, TickerdeskError> {
    check_horizon(request.horizon)?;
    let PriceHistory {
        ticker,
        currency,
        fx_rate,
        table,
    } = load_history(market, request)?;
    info!(query = %request.query, %ticker, %currency, "building dashboard");

    let company = market.company_info(&ticker).map(|c| c.converted(fx_rate));
    let quote = market.quote(&ticker).map(|q| q.converted(fx_rate));

    let mut dashboard = Dashboard {
        ticker: ticker.clone(),
        currency,
        fx_rate,
        company,
        quote,
        frame: IndicatorFrame::default(),
        signals: SignalSet::default(),
        show_indicators: request.show_indicators,
        forecast_enabled: request.enable_forecast,
        forecast: None,
        accuracy: None,
        options: None,
        expiries: Vec::new(),
    };
    if table.is_empty() {
        info!(%ticker, "no price history, dashboard left empty");
        return Ok(dashboard);
    }

    let frame = add_technical_indicators(&table);
    dashboard.signals = check_signals(&frame);

    if request.enable_forecast {
        dashboard.forecast = forecaster.predict_future(&table, request.horizon)?;
        dashboard.accuracy = forecaster.evaluate(&table, request.accuracy_lookback);
    }
    dashboard.frame = frame;

    let (chain, expiries) = market.options_chain(&ticker, request.expiry);
    dashboard.options = chain.map(|c| c.converted(fx_rate));
    dashboard.expiries = expiries;

    info!(
        %ticker,
        rows = dashboard.frame.len(),
        signals = dashboard.signals.len(),
        forecast = dashboard.forecast.is_some(),
        "dashboard ready"
    );
    Ok(dashboard)
}
