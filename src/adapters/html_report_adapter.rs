//! HTML dashboard adapter implementing ReportPort.
//!
//! Renders a `Dashboard` through an Askama template with inline SVG charts.
//! The web adapter reuses [`render_dashboard`] for its pages.

use std::fs;
use std::path::Path;

use crate::adapters::chart_svg::{forecast_chart_svg, price_chart_svg};
use crate::domain::dashboard::{Dashboard, OPTIONS_ROWS};
use crate::domain::error::TickerdeskError;
use crate::domain::market::OptionContract;
use crate::ports::report_port::ReportPort;

use askama::Template;

struct MetricView {
    label: String,
    value: String,
    delta: Option<String>,
}

struct SignalView {
    name: String,
    label: &'static str,
    class: &'static str,
}

struct OptionRowView {
    strike: String,
    last_price: String,
    volume: String,
    implied_volatility: String,
}

struct FactView {
    label: &'static str,
    value: String,
}

struct ForecastRowView {
    date: String,
    price: String,
}

struct ExpiryView {
    date: String,
    selected: bool,
}

struct AccuracyView {
    mse: String,
    mape: String,
    accuracy: String,
    points: usize,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    interactive: bool,
    ticker: String,
    name: String,
    summary: String,
    currency: String,
    metrics: Vec<MetricView>,
    history_empty: bool,
    price_svg: String,
    forecast_enabled: bool,
    forecast_svg: Option<String>,
    forecast_rows: Vec<ForecastRowView>,
    accuracy: Option<AccuracyView>,
    signals: Vec<SignalView>,
    expiry: Option<String>,
    expiries: Vec<ExpiryView>,
    calls: Vec<OptionRowView>,
    puts: Vec<OptionRowView>,
    fundamentals: Vec<FactView>,
}

/// `1234567.891` with 2 decimals → `1,234,567.89`.
pub fn format_grouped(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

fn option_rows(contracts: &[OptionContract]) -> Vec<OptionRowView> {
    contracts
        .iter()
        .take(OPTIONS_ROWS)
        .map(|c| OptionRowView {
            strike: format_grouped(c.strike, 2),
            last_price: format_grouped(c.last_price, 2),
            volume: c
                .volume
                .map(|v| format_grouped(v as f64, 0))
                .unwrap_or_else(|| "-".into()),
            implied_volatility: c
                .implied_volatility
                .map(|iv| format!("{:.2}%", iv * 100.0))
                .unwrap_or_else(|| "-".into()),
        })
        .collect()
}

fn metrics(dashboard: &Dashboard) -> Vec<MetricView> {
    let Some(quote) = dashboard.quote else {
        return Vec::new();
    };
    vec![
        MetricView {
            label: format!("Current Price ({})", dashboard.currency),
            value: format_grouped(quote.last_price, 2),
            delta: quote.day_change_pct().map(|pct| format!("{:.2}%", pct)),
        },
        MetricView {
            label: format!("Previous Close ({})", dashboard.currency),
            value: format_grouped(quote.previous_close, 2),
            delta: None,
        },
        MetricView {
            label: "Volume".to_string(),
            value: format_grouped(quote.volume as f64, 0),
            delta: None,
        },
    ]
}

fn fundamentals(dashboard: &Dashboard) -> Vec<FactView> {
    let Some(info) = &dashboard.company else {
        return Vec::new();
    };
    let cur = &dashboard.currency;
    let text = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".into());
    let ratio = |v: Option<f64>| v.map(|r| format!("{:.2}", r)).unwrap_or_else(|| "-".into());
    let money = |v: Option<f64>, decimals: usize| {
        v.map(|m| format!("{} {}", format_grouped(m, decimals), cur))
            .unwrap_or_else(|| "-".into())
    };
    vec![
        FactView {
            label: "Sector",
            value: text(&info.sector),
        },
        FactView {
            label: "Industry",
            value: text(&info.industry),
        },
        FactView {
            label: "Market Cap",
            value: money(info.market_cap, 0),
        },
        FactView {
            label: "P/E Ratio",
            value: ratio(info.trailing_pe),
        },
        FactView {
            label: "Forward P/E",
            value: ratio(info.forward_pe),
        },
        FactView {
            label: "52 Week High",
            value: money(info.fifty_two_week_high, 2),
        },
        FactView {
            label: "52 Week Low",
            value: money(info.fifty_two_week_low, 2),
        },
    ]
}

fn signal_class(bias: i8) -> &'static str {
    match bias {
        b if b > 0 => "bullish",
        b if b < 0 => "bearish",
        _ => "neutral",
    }
}

fn build_template(dashboard: &Dashboard, interactive: bool) -> DashboardTemplate {
    let forecast = dashboard.forecast.as_ref();
    DashboardTemplate {
        interactive,
        ticker: dashboard.ticker.clone(),
        name: dashboard.display_name().to_string(),
        summary: dashboard
            .company
            .as_ref()
            .map(|c| c.summary_or_default().to_string())
            .unwrap_or_else(|| crate::domain::market::NO_SUMMARY.to_string()),
        currency: dashboard.currency.clone(),
        metrics: metrics(dashboard),
        history_empty: dashboard.history_empty(),
        price_svg: price_chart_svg(&dashboard.frame, &dashboard.ticker, dashboard.show_indicators),
        forecast_enabled: dashboard.forecast_enabled,
        forecast_svg: forecast.map(|f| forecast_chart_svg(&dashboard.frame, f, &dashboard.ticker)),
        forecast_rows: forecast
            .map(|f| {
                f.points
                    .iter()
                    .map(|p| ForecastRowView {
                        date: p.date.to_string(),
                        price: format_grouped(p.price, 2),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        accuracy: dashboard.accuracy.as_ref().map(|a| AccuracyView {
            mse: format!("{:.6}", a.mse),
            mape: format!("{:.2}%", a.mape),
            accuracy: format!("{:.2}%", a.accuracy_pct),
            points: a.points.len(),
        }),
        signals: dashboard
            .signals
            .iter()
            .map(|(name, label)| SignalView {
                name: name.to_string(),
                label: label.as_str(),
                class: signal_class(label.bias()),
            })
            .collect(),
        expiry: dashboard.options.as_ref().map(|c| c.expiry.to_string()),
        expiries: dashboard
            .expiries
            .iter()
            .map(|d| ExpiryView {
                date: d.to_string(),
                selected: dashboard.options.as_ref().is_some_and(|c| c.expiry == *d),
            })
            .collect(),
        calls: dashboard
            .options
            .as_ref()
            .map(|c| option_rows(&c.calls))
            .unwrap_or_default(),
        puts: dashboard
            .options
            .as_ref()
            .map(|c| option_rows(&c.puts))
            .unwrap_or_default(),
        fundamentals: fundamentals(dashboard),
    }
}

/// Render a dashboard page. `interactive` adds the search form and expiry
/// links used by the web server.
pub fn render_dashboard(dashboard: &Dashboard, interactive: bool) -> Result<String, TickerdeskError> {
    build_template(dashboard, interactive)
        .render()
        .map_err(|e| TickerdeskError::Report {
            reason: e.to_string(),
        })
}

pub struct HtmlReportAdapter;

impl HtmlReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HtmlReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for HtmlReportAdapter {
    fn write(&self, dashboard: &Dashboard, output_path: &str) -> Result<(), TickerdeskError> {
        let html = render_dashboard(dashboard, false)?;

        let path = Path::new(output_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, html)?;

        Ok(())
    }
}
