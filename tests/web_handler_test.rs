#![cfg(feature = "web")]
//! Web handler integration tests.
//!
//! Tests cover:
//! - Dashboard page renders for known and unknown tickers
//! - Query parameter validation
//! - SVG chart and JSON endpoints
//! - Cache refresh redirect and the 404 fallback

mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tickerdesk::adapters::web::{AppState, build_router};
use tickerdesk::domain::dashboard::DashboardRequest;
use tower::ServiceExt;

use common::*;

fn create_test_app() -> (Router, Arc<AtomicUsize>) {
    let port = MockMarketDataPort::new()
        .with_bars("NVDA", generate_bars("2023-01-01", 260, 100.0))
        .with_bars("TEST", generate_bars("2024-01-01", 20, 50.0))
        .with_quote("NVDA", 360.0, 355.0)
        .with_fx("EUR", 0.5);
    let calls = port.history_counter();

    let state = AppState {
        market: Arc::new(market(port)),
        forecaster: Arc::new(engine(StubLoader::with_model(MeanModel { window: 100 }))),
        defaults: DashboardRequest::default(),
    };
    (build_router(state), calls)
}

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&body).into_owned())
}

mod dashboard_tests {
    use super::*;

    #[tokio::test]
    async fn default_ticker_renders() {
        let (app, _) = create_test_app();
        let (status, html) = get(app, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("(NVDA)"));
        assert!(html.contains("Technical Signals"));
        assert!(html.contains("Predicted Next Close"));
        assert!(html.contains("<form"));
    }

    #[tokio::test]
    async fn currency_parameter_converts_prices() {
        let (app, _) = create_test_app();
        let (status, html) = get(app, "/?ticker=nvidia&currency=eur").await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("EUR"));
        assert!(html.contains("180.00"));
    }

    #[tokio::test]
    async fn forecast_can_be_switched_off() {
        let (app, _) = create_test_app();
        let (status, html) = get(app, "/?ticker=NVDA&forecast=false").await;

        assert_eq!(status, StatusCode::OK);
        assert!(!html.contains("Predicted Next Close"));
    }

    #[tokio::test]
    async fn unknown_ticker_shows_no_data_message() {
        let (app, _) = create_test_app();
        let (status, html) = get(app, "/?ticker=ZZZZ").await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("No data found. Please check the ticker symbol."));
    }

    #[tokio::test]
    async fn short_history_has_no_forecast() {
        let (app, _) = create_test_app();
        let (status, html) = get(app, "/?ticker=TEST").await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Model not available or data insufficient."));
    }
}

mod validation_tests {
    use super::*;

    #[tokio::test]
    async fn bad_currency_is_400() {
        let (app, _) = create_test_app();
        let (status, html) = get(app, "/?currency=euros").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(html.contains("400"));
    }

    #[tokio::test]
    async fn bad_period_is_400() {
        let (app, _) = create_test_app();
        let (status, _) = get(app, "/?period=7y").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn reversed_range_is_400() {
        let (app, _) = create_test_app();
        let (status, _) = get(app, "/?start=2024-02-01&end=2024-01-01").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn zero_horizon_is_400() {
        let (app, _) = create_test_app();
        let (status, _) = get(app, "/?horizon=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_horizon_is_400() {
        let (app, calls) = create_test_app();
        let (status, _) = get(app.clone(), "/?horizon=1000000").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = get(app.clone(), "/api/NVDA/forecast?horizon=366").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, body) = get(app, "/api/NVDA/forecast?horizon=365").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["forecast"]["points"].as_array().unwrap().len(), 365);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn path_like_ticker_is_404_without_fetching() {
        let (app, calls) = create_test_app();
        let (status, _) = get(app.clone(), "/?ticker=../secret").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = get(app, "/api/..%2Fsecret/signals").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

mod endpoint_tests {
    use super::*;

    #[tokio::test]
    async fn price_chart_is_svg() {
        let (app, _) = create_test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/chart/NVDA/price.svg")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/svg+xml"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&body).starts_with("<svg"));
    }

    #[tokio::test]
    async fn price_chart_for_unknown_ticker_is_404() {
        let (app, _) = create_test_app();
        let (status, _) = get(app, "/chart/ZZZZ/price.svg").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn signals_api_returns_json() {
        let (app, _) = create_test_app();
        let (status, body) = get(app, "/api/NVDA/signals").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["ticker"], "NVDA");
        assert_eq!(json["rows"], 260);
        assert_eq!(json["signals"]["Trend"], "Bullish (Golden Cross Area)");
        assert_eq!(json["signals"]["RSI_Status"], "Overbought (Potential Sell)");
        assert!(json["latest"]["SMA_200"].is_number());
    }

    #[tokio::test]
    async fn forecast_api_returns_points_and_accuracy() {
        let (app, _) = create_test_app();
        let (status, body) = get(app, "/api/nvidia/forecast?horizon=3").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["ticker"], "NVDA");
        assert_eq!(json["horizon"], 3);
        assert_eq!(json["multi_step"], "hold");
        assert_eq!(json["forecast"]["points"].as_array().unwrap().len(), 3);
        assert_eq!(json["accuracy"]["points"].as_array().unwrap().len(), 30);
    }

    #[tokio::test]
    async fn forecast_api_short_history_has_null_forecast() {
        let (app, _) = create_test_app();
        let (status, body) = get(app, "/api/TEST/forecast").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(json["forecast"].is_null());
        assert!(json["accuracy"].is_null());
    }
}

mod cache_tests {
    use super::*;

    #[tokio::test]
    async fn refresh_clears_cache_and_redirects() {
        let (app, calls) = create_test_app();

        let (status, _) = get(app.clone(), "/api/NVDA/signals").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = get(app.clone(), "/api/NVDA/signals").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");

        let (status, _) = get(app, "/api/NVDA/signals").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn not_found_returns_404_with_error_page() {
        let (app, _) = create_test_app();
        let (status, html) = get(app, "/nonexistent").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(html.contains("Page not found"));
    }
}
