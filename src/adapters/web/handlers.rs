//! HTTP request handlers for web adapter.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::adapters::chart_svg::price_chart_svg;
use crate::adapters::html_report_adapter::render_dashboard;
use crate::domain::config_validation::validate_currency;
use crate::domain::dashboard::{DashboardRequest, build_dashboard, load_history};
use crate::domain::error::TickerdeskError;
use crate::domain::forecast::{AccuracyReport, Forecast, check_horizon};
use crate::domain::indicator::IndicatorColumn;
use crate::domain::indicator_engine::add_technical_indicators;
use crate::domain::market::{HistoryRange, Period};
use crate::domain::signals::{SignalSet, check_signals};

use super::{AppState, WebError};

/// Query parameters shared by every page and endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub ticker: Option<String>,
    pub currency: Option<String>,
    pub forecast: Option<bool>,
    pub indicators: Option<bool>,
    pub period: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub horizon: Option<usize>,
    pub expiry: Option<NaiveDate>,
}

impl DashboardQuery {
    /// Overlay the parameters onto the server defaults.
    pub fn apply(self, defaults: &DashboardRequest) -> Result<DashboardRequest, WebError> {
        let mut request = defaults.clone();
        if let Some(ticker) = self.ticker.filter(|t| !t.trim().is_empty()) {
            request.query = ticker;
        }
        if let Some(currency) = self.currency.filter(|c| !c.trim().is_empty()) {
            validate_currency(currency.trim()).map_err(|e| WebError::bad_request(e.to_string()))?;
            request.currency = currency.trim().to_uppercase();
        }
        if let Some(forecast) = self.forecast {
            request.enable_forecast = forecast;
        }
        if let Some(indicators) = self.indicators {
            request.show_indicators = indicators;
        }
        request.range = match (self.start, self.end, self.period) {
            (Some(start), Some(end), _) if start <= end => HistoryRange::Between { start, end },
            (Some(_), Some(_), _) => return Err(WebError::bad_request("start must not be after end")),
            (Some(_), None, _) | (None, Some(_), _) => {
                return Err(WebError::bad_request("start and end must be given together"));
            }
            (None, None, Some(period)) => HistoryRange::Period(
                period.parse::<Period>().map_err(WebError::bad_request)?,
            ),
            (None, None, None) => request.range,
        };
        if let Some(horizon) = self.horizon {
            check_horizon(horizon).map_err(|e| WebError::bad_request(e.to_string()))?;
            request.horizon = horizon;
        }
        request.expiry = self.expiry.or(request.expiry);
        Ok(request)
    }
}

async fn run_blocking<T, F>(state: Arc<AppState>, work: F) -> Result<T, WebError>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> Result<T, TickerdeskError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || work(&state))
        .await
        .map_err(|e| WebError::internal(format!("worker task failed: {}", e)))?
        .map_err(WebError::from)
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Html<String>, WebError> {
    let request = query.apply(&state.defaults)?;
    let html = run_blocking(state, move |s| {
        let dashboard = build_dashboard(&s.market, &s.forecaster, &request)?;
        render_dashboard(&dashboard, true)
    })
    .await?;
    Ok(Html(html))
}

pub async fn price_chart(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, WebError> {
    let mut request = query.apply(&state.defaults)?;
    request.query = ticker;
    let svg = run_blocking(state, move |s| {
        let history = load_history(&s.market, &request)?;
        if history.table.is_empty() {
            return Err(TickerdeskError::NoData {
                ticker: history.ticker,
            });
        }
        let frame = add_technical_indicators(&history.table);
        Ok(price_chart_svg(&frame, &history.ticker, request.show_indicators))
    })
    .await?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}

#[derive(Debug, Serialize)]
pub struct SignalsResponse {
    pub ticker: String,
    pub currency: String,
    pub as_of: Option<NaiveDate>,
    pub rows: usize,
    pub signals: SignalSet,
    /// Latest indicator values keyed by column name.
    pub latest: BTreeMap<String, Option<f64>>,
}

pub async fn signals_api(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<SignalsResponse>, WebError> {
    let mut request = query.apply(&state.defaults)?;
    request.query = ticker;
    let response = run_blocking(state, move |s| {
        let history = load_history(&s.market, &request)?;
        if history.table.is_empty() {
            return Err(TickerdeskError::NoData {
                ticker: history.ticker,
            });
        }
        let frame = add_technical_indicators(&history.table);
        let latest = [
            IndicatorColumn::Rsi,
            IndicatorColumn::Macd,
            IndicatorColumn::SignalLine,
            IndicatorColumn::Sma(50),
            IndicatorColumn::Sma(200),
        ]
        .into_iter()
        .map(|col| (col.to_string(), frame.latest(col)))
        .collect();
        Ok(SignalsResponse {
            ticker: history.ticker,
            currency: history.currency,
            as_of: history.table.last_date(),
            rows: frame.len(),
            signals: check_signals(&frame),
            latest,
        })
    })
    .await?;
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub ticker: String,
    pub currency: String,
    pub horizon: usize,
    pub multi_step: &'static str,
    pub forecast: Option<Forecast>,
    pub accuracy: Option<AccuracyReport>,
}

pub async fn forecast_api(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<ForecastResponse>, WebError> {
    let mut request = query.apply(&state.defaults)?;
    request.query = ticker;
    let response = run_blocking(state, move |s| {
        check_horizon(request.horizon)?;
        let history = load_history(&s.market, &request)?;
        if history.table.is_empty() {
            return Err(TickerdeskError::NoData {
                ticker: history.ticker,
            });
        }
        let forecast = s.forecaster.predict_future(&history.table, request.horizon)?;
        let accuracy = s
            .forecaster
            .evaluate(&history.table, request.accuracy_lookback);
        Ok(ForecastResponse {
            ticker: history.ticker,
            currency: history.currency,
            horizon: request.horizon,
            multi_step: s.forecaster.multi_step().as_str(),
            forecast,
            accuracy,
        })
    })
    .await?;
    Ok(Json(response))
}

/// Clears cached histories so the next page load refetches.
pub async fn refresh(State(state): State<Arc<AppState>>) -> Redirect {
    state.market.invalidate();
    info!("history cache cleared");
    Redirect::to("/")
}

pub async fn not_found() -> WebError {
    WebError::not_found("Page not found")
}
