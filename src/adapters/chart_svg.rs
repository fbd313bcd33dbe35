//! Inline SVG chart rendering for dashboard pages.

use crate::domain::forecast::Forecast;
use crate::domain::indicator::{IndicatorColumn, IndicatorFrame};

pub const UP_COLOR: &str = "#16a34a";
pub const DOWN_COLOR: &str = "#dc2626";
pub const SMA_50_COLOR: &str = "orange";
pub const SMA_200_COLOR: &str = "#2563eb";
pub const BAND_COLOR: &str = "gray";
pub const HISTORY_COLOR: &str = "#2563eb";
pub const FORECAST_COLOR: &str = "#06b6d4";

/// Closes shown for context on the forecast chart.
pub const FORECAST_CONTEXT_BARS: usize = 100;

const WIDTH: f64 = 800.0;
const PRICE_HEIGHT: f64 = 320.0;
const VOLUME_HEIGHT: f64 = 100.0;
const GAP: f64 = 20.0;
const PADDING: f64 = 40.0;

/// Maps a value range onto a vertical pixel band.
struct Scale {
    min: f64,
    max: f64,
    top: f64,
    height: f64,
}

impl Scale {
    fn new(min: f64, max: f64, top: f64, height: f64) -> Self {
        Self {
            min,
            max,
            top,
            height,
        }
    }

    fn y(&self, value: f64) -> f64 {
        let range = self.max - self.min;
        if range > 0.0 {
            self.top + self.height - (value - self.min) / range * self.height
        } else {
            self.top + self.height / 2.0
        }
    }
}

/// Center of slot `i` of `n` across the plot width.
fn x_at(i: usize, n: usize) -> f64 {
    let plot_width = WIDTH - 2.0 * PADDING;
    let slot = plot_width / n.max(1) as f64;
    PADDING + slot * (i as f64 + 0.5)
}

fn slot_width(n: usize) -> f64 {
    (WIDTH - 2.0 * PADDING) / n.max(1) as f64
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Contiguous runs of defined values, as `(index, value)` pairs.
fn defined_runs(values: &[Option<f64>]) -> Vec<Vec<(usize, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (i, v) in values.iter().enumerate() {
        match v {
            Some(v) if v.is_finite() => current.push((i, *v)),
            _ => {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

fn polylines(values: &[Option<f64>], n: usize, scale: &Scale, attrs: &str) -> String {
    defined_runs(values)
        .iter()
        .map(|run| {
            let points: Vec<String> = run
                .iter()
                .map(|&(i, v)| format!("{:.1},{:.1}", x_at(i, n), scale.y(v)))
                .collect();
            format!(
                r#"<polyline fill="none" {} points="{}"/>"#,
                attrs,
                points.join(" ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn band_polygons(upper: &[Option<f64>], lower: &[Option<f64>], n: usize, scale: &Scale) -> String {
    let both: Vec<Option<f64>> = upper
        .iter()
        .zip(lower)
        .map(|(u, l)| match (u, l) {
            (Some(u), Some(_)) => Some(*u),
            _ => None,
        })
        .collect();
    defined_runs(&both)
        .iter()
        .filter_map(|run| {
            let top: Vec<String> = run
                .iter()
                .map(|&(i, u)| format!("{:.1},{:.1}", x_at(i, n), scale.y(u)))
                .collect();
            let bottom: Vec<String> = run
                .iter()
                .rev()
                .map(|&(i, _)| lower[i].map(|l| format!("{:.1},{:.1}", x_at(i, n), scale.y(l))))
                .collect::<Option<Vec<_>>>()?;
            Some(format!(
                r#"<polygon fill="rgba(128,128,128,0.1)" stroke="none" points="{} {}"/>"#,
                top.join(" "),
                bottom.join(" ")
            ))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn overlay_columns(frame: &IndicatorFrame, show_indicators: bool) -> Vec<(IndicatorColumn, &[Option<f64>])> {
    if !show_indicators {
        return Vec::new();
    }
    [
        IndicatorColumn::Sma(50),
        IndicatorColumn::Sma(200),
        IndicatorColumn::BollingerUpper,
        IndicatorColumn::BollingerLower,
    ]
    .into_iter()
    .filter_map(|col| frame.column(col).map(|values| (col, values)))
    .collect()
}

/// Candlesticks with a volume panel and optional SMA/Bollinger overlays.
pub fn price_chart_svg(frame: &IndicatorFrame, ticker: &str, show_indicators: bool) -> String {
    let bars = frame.bars();
    if bars.is_empty() {
        return "No price data available.".to_string();
    }
    let n = bars.len();
    let overlays = overlay_columns(frame, show_indicators);

    let mut min_price = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let mut max_price = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    for (_, values) in &overlays {
        for v in values.iter().flatten().filter(|v| v.is_finite()) {
            min_price = min_price.min(*v);
            max_price = max_price.max(*v);
        }
    }
    let max_volume = bars.iter().map(|b| b.volume).max().unwrap_or(0) as f64;

    let price_scale = Scale::new(min_price, max_price, PADDING, PRICE_HEIGHT - PADDING);
    let volume_top = PRICE_HEIGHT + GAP;
    let height = volume_top + VOLUME_HEIGHT + PADDING / 2.0;
    let body_width = (slot_width(n) * 0.7).max(0.5);

    let mut out = String::new();
    out.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {:.0} {:.0}" width="{:.0}" height="{:.0}" role="img">"#,
        WIDTH, height, WIDTH, height
    ));
    out.push('\n');
    out.push_str(&format!(
        r#"<text x="{:.0}" y="24" font-size="14" font-family="sans-serif">{} Price Action &amp; Volume</text>"#,
        PADDING,
        escape_xml(ticker)
    ));
    out.push('\n');

    let upper = frame.column(IndicatorColumn::BollingerUpper);
    let lower = frame.column(IndicatorColumn::BollingerLower);
    if let (true, Some(upper), Some(lower)) = (show_indicators, upper, lower) {
        out.push_str(&band_polygons(upper, lower, n, &price_scale));
        out.push('\n');
    }

    for (i, bar) in bars.iter().enumerate() {
        let color = if bar.is_up() { UP_COLOR } else { DOWN_COLOR };
        let x = x_at(i, n);
        let body_top = price_scale.y(bar.open.max(bar.close));
        let body_bottom = price_scale.y(bar.open.min(bar.close));
        out.push_str(&format!(
            r#"<line x1="{x:.1}" y1="{:.1}" x2="{x:.1}" y2="{:.1}" stroke="{color}" stroke-width="1"/>"#,
            price_scale.y(bar.high),
            price_scale.y(bar.low),
        ));
        out.push_str(&format!(
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{color}"/>"#,
            x - body_width / 2.0,
            body_top,
            body_width,
            (body_bottom - body_top).max(0.5),
        ));

        if max_volume > 0.0 {
            let bar_height = bar.volume as f64 / max_volume * VOLUME_HEIGHT;
            out.push_str(&format!(
                r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{color}" opacity="0.6"/>"#,
                x - body_width / 2.0,
                volume_top + VOLUME_HEIGHT - bar_height,
                body_width,
                bar_height,
            ));
        }
        out.push('\n');
    }

    for (col, values) in &overlays {
        let attrs = match col {
            IndicatorColumn::Sma(50) => format!(r#"stroke="{}" stroke-width="1""#, SMA_50_COLOR),
            IndicatorColumn::Sma(_) => format!(r#"stroke="{}" stroke-width="1""#, SMA_200_COLOR),
            _ => format!(
                r#"stroke="{}" stroke-width="1" stroke-dasharray="2,2""#,
                BAND_COLOR
            ),
        };
        let lines = polylines(values, n, &price_scale, &attrs);
        if !lines.is_empty() {
            out.push_str(&lines);
            out.push('\n');
        }
    }

    out.push_str(&format!(
        r##"<line x1="{p:.0}" y1="{:.0}" x2="{:.0}" y2="{:.0}" stroke="#9ca3af" stroke-width="1"/>"##,
        volume_top + VOLUME_HEIGHT,
        WIDTH - PADDING,
        volume_top + VOLUME_HEIGHT,
        p = PADDING,
    ));
    out.push_str("\n</svg>");
    out
}

/// Recent closes followed by the forecast trail.
pub fn forecast_chart_svg(frame: &IndicatorFrame, forecast: &Forecast, ticker: &str) -> String {
    let history: Vec<f64> = frame
        .table()
        .tail(FORECAST_CONTEXT_BARS)
        .iter()
        .map(|b| b.close)
        .collect();
    if history.is_empty() && forecast.is_empty() {
        return "No forecast data available.".to_string();
    }

    let n = history.len() + forecast.len();
    let all = history
        .iter()
        .copied()
        .chain(forecast.points.iter().map(|p| p.price));
    let (min, max) = all.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let scale = Scale::new(min, max, PADDING, PRICE_HEIGHT - 2.0 * PADDING);

    let history_values: Vec<Option<f64>> = history.iter().map(|&c| Some(c)).collect();
    // The trail starts at the last close so the two lines join.
    let mut trail: Vec<Option<f64>> = vec![None; history.len().saturating_sub(1)];
    if let Some(&last) = history.last() {
        trail.push(Some(last));
    }
    trail.extend(forecast.points.iter().map(|p| Some(p.price)));

    let mut out = String::new();
    out.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {:.0} {:.0}" width="{:.0}" height="{:.0}" role="img">"#,
        WIDTH, PRICE_HEIGHT, WIDTH, PRICE_HEIGHT
    ));
    out.push('\n');
    out.push_str(&format!(
        r#"<text x="{:.0}" y="24" font-size="14" font-family="sans-serif">{} Forecast Trail</text>"#,
        PADDING,
        escape_xml(ticker)
    ));
    out.push('\n');
    out.push_str(&polylines(
        &history_values,
        n,
        &scale,
        &format!(r#"stroke="{}" stroke-width="1.5""#, HISTORY_COLOR),
    ));
    out.push('\n');
    out.push_str(&polylines(
        &trail,
        n,
        &scale,
        &format!(r#"stroke="{}" stroke-width="2""#, FORECAST_COLOR),
    ));
    out.push('\n');
    for (j, point) in forecast.points.iter().enumerate() {
        out.push_str(&format!(
            r#"<circle cx="{:.1}" cy="{:.1}" r="3" fill="{}"><title>{} {:.2}</title></circle>"#,
            x_at(history.len() + j, n),
            scale.y(point.price),
            FORECAST_COLOR,
            point.date,
            point.price
        ));
        out.push('\n');
    }
    out.push_str("</svg>");
    out
}
