//! Web dashboard adapter.
//!
//! Axum server rendering the ticker dashboard as HTML, plus SVG chart and
//! JSON endpoints. Engine work runs on the blocking pool since providers
//! and the model are synchronous.

mod error;
mod handlers;

pub use error::{WebError, status_from_error};
pub use handlers::*;

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::domain::dashboard::DashboardRequest;
use crate::domain::error::TickerdeskError;
use crate::domain::forecast::ForecastEngine;
use crate::domain::market_data::MarketData;

pub struct AppState {
    pub market: Arc<MarketData>,
    pub forecaster: Arc<ForecastEngine>,
    /// Applied when a query parameter is absent.
    pub defaults: DashboardRequest,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::dashboard))
        .route("/chart/{ticker}/price.svg", get(handlers::price_chart))
        .route("/api/{ticker}/signals", get(handlers::signals_api))
        .route("/api/{ticker}/forecast", get(handlers::forecast_api))
        .route("/refresh", post(handlers::refresh))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

pub async fn serve(state: AppState, addr: SocketAddr) -> Result<(), TickerdeskError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "dashboard listening");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
