//! Yahoo Finance market data adapter over the public JSON endpoints.
//!
//! Uses a blocking client with a bounded timeout. Response bodies are parsed
//! by free functions so the mapping can be tested without the network.

use crate::domain::config_validation::DataSettings;
use crate::domain::error::TickerdeskError;
use crate::domain::market::{CompanyInfo, HistoryRange, OptionContract, OptionsChain, Quote};
use crate::domain::market_data::fx_symbol;
use crate::domain::ohlcv::{OhlcvBar, OhlcvTable};
use crate::domain::ticker::validate_symbol;
use crate::ports::market_data_port::MarketDataPort;
use chrono::{DateTime, Days, NaiveDate};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const OPTIONS_URL: &str = "https://query2.finance.yahoo.com/v7/finance/options";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; tickerdesk/0.1)";

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<String>,
    description: Option<String>,
}

impl ApiError {
    fn into_error(self, ticker: &str) -> TickerdeskError {
        TickerdeskError::provider(format!(
            "{}: {} {}",
            ticker,
            self.code.unwrap_or_default(),
            self.description.unwrap_or_default()
        ))
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ApiResponse<ChartResult>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    result: Option<Vec<T>>,
    error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    fn first(self, ticker: &str) -> Result<T, TickerdeskError> {
        if let Some(err) = self.error {
            return Err(err.into_error(ticker));
        }
        self.result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| TickerdeskError::NoData {
                ticker: ticker.to_string(),
            })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
    regular_market_volume: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryEnvelope {
    quote_summary: ApiResponse<SummaryResult>,
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`.
#[derive(Debug, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

fn raw(v: &Option<RawValue>) -> Option<f64> {
    v.as_ref().and_then(|r| r.raw).filter(|x| x.is_finite())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AssetProfile {
    sector: Option<String>,
    industry: Option<String>,
    long_business_summary: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PriceModule {
    long_name: Option<String>,
    short_name: Option<String>,
    market_cap: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SummaryDetail {
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<RawValue>,
    market_cap: Option<RawValue>,
    fifty_two_week_high: Option<RawValue>,
    fifty_two_week_low: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SummaryResult {
    asset_profile: AssetProfile,
    price: PriceModule,
    summary_detail: SummaryDetail,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionsEnvelope {
    option_chain: ApiResponse<OptionsResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionsResult {
    #[serde(default)]
    expiration_dates: Vec<i64>,
    #[serde(default)]
    options: Vec<OptionsBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionsBlock {
    expiration_date: i64,
    #[serde(default)]
    calls: Vec<YahooContract>,
    #[serde(default)]
    puts: Vec<YahooContract>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooContract {
    strike: f64,
    #[serde(default)]
    last_price: f64,
    volume: Option<u64>,
    implied_volatility: Option<f64>,
}

impl From<YahooContract> for OptionContract {
    fn from(c: YahooContract) -> Self {
        OptionContract {
            strike: c.strike,
            last_price: c.last_price,
            volume: c.volume,
            implied_volatility: c.implied_volatility,
        }
    }
}

fn parse_error(what: &str, e: serde_json::Error) -> TickerdeskError {
    TickerdeskError::provider(format!("unexpected {} response: {}", what, e))
}

fn date_from_timestamp(ts: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
}

fn timestamp_of(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}

fn chart_result(body: &str, ticker: &str) -> Result<ChartResult, TickerdeskError> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).map_err(|e| parse_error("chart", e))?;
    envelope.chart.first(ticker)
}

/// Daily bars from a v8 chart body. Null closes become NaN and are dropped
/// by the table.
pub fn parse_chart(body: &str, ticker: &str) -> Result<OhlcvTable, TickerdeskError> {
    let result = chart_result(body, ticker)?;
    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Ok(OhlcvTable::empty(ticker));
    };
    let at = |v: &[Option<f64>], i: usize| v.get(i).copied().flatten().unwrap_or(f64::NAN);

    let bars = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let date = date_from_timestamp(ts)?;
            let volume = at(&quote.volume, i);
            Some(OhlcvBar {
                date,
                open: at(&quote.open, i),
                high: at(&quote.high, i),
                low: at(&quote.low, i),
                close: at(&quote.close, i),
                volume: if volume.is_finite() && volume > 0.0 {
                    volume.round() as u64
                } else {
                    0
                },
            })
        })
        .collect();
    Ok(OhlcvTable::new(ticker, bars))
}

/// Latest price snapshot from chart metadata.
pub fn parse_quote(body: &str, ticker: &str) -> Result<Quote, TickerdeskError> {
    let meta = chart_result(body, ticker)?.meta;
    let last_price = meta
        .regular_market_price
        .ok_or_else(|| TickerdeskError::NoData {
            ticker: ticker.to_string(),
        })?;
    Ok(Quote {
        last_price,
        previous_close: meta
            .previous_close
            .or(meta.chart_previous_close)
            .unwrap_or(last_price),
        volume: meta.regular_market_volume.unwrap_or(0),
    })
}

pub fn parse_company_info(body: &str, ticker: &str) -> Result<CompanyInfo, TickerdeskError> {
    let envelope: SummaryEnvelope =
        serde_json::from_str(body).map_err(|e| parse_error("quoteSummary", e))?;
    let result = envelope.quote_summary.first(ticker)?;
    let profile = result.asset_profile;
    let detail = result.summary_detail;
    Ok(CompanyInfo {
        name: result.price.long_name.or(result.price.short_name),
        summary: profile.long_business_summary.or(profile.description),
        sector: profile.sector,
        industry: profile.industry,
        trailing_pe: raw(&detail.trailing_pe),
        forward_pe: raw(&detail.forward_pe),
        market_cap: raw(&result.price.market_cap).or(raw(&detail.market_cap)),
        fifty_two_week_high: raw(&detail.fifty_two_week_high),
        fifty_two_week_low: raw(&detail.fifty_two_week_low),
    })
}

fn options_result(body: &str, ticker: &str) -> Result<OptionsResult, TickerdeskError> {
    let envelope: OptionsEnvelope =
        serde_json::from_str(body).map_err(|e| parse_error("options", e))?;
    envelope.option_chain.first(ticker)
}

pub fn parse_option_expiries(body: &str, ticker: &str) -> Result<Vec<NaiveDate>, TickerdeskError> {
    let result = options_result(body, ticker)?;
    Ok(result
        .expiration_dates
        .into_iter()
        .filter_map(date_from_timestamp)
        .collect())
}

pub fn parse_options_chain(body: &str, ticker: &str) -> Result<OptionsChain, TickerdeskError> {
    let result = options_result(body, ticker)?;
    let block = result
        .options
        .into_iter()
        .next()
        .ok_or_else(|| TickerdeskError::NoData {
            ticker: format!("{} options", ticker),
        })?;
    let expiry = date_from_timestamp(block.expiration_date)
        .ok_or_else(|| TickerdeskError::provider("invalid option expiration timestamp"))?;
    Ok(OptionsChain {
        expiry,
        calls: block.calls.into_iter().map(Into::into).collect(),
        puts: block.puts.into_iter().map(Into::into).collect(),
    })
}

pub struct YahooAdapter {
    client: reqwest::blocking::Client,
}

impl YahooAdapter {
    pub fn new(timeout: Duration) -> Result<Self, TickerdeskError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TickerdeskError::provider(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn from_settings(settings: &DataSettings) -> Result<Self, TickerdeskError> {
        Self::new(Duration::from_secs(settings.timeout_secs))
    }

    fn fetch(&self, url: &str, query: &[(&str, String)]) -> Result<String, TickerdeskError> {
        debug!(url, ?query, "yahoo request");
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| TickerdeskError::provider(format!("request to {} failed: {}", url, e)))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| TickerdeskError::provider(format!("failed to read response: {}", e)))?;
        // Error bodies still carry a JSON error object worth surfacing.
        if !status.is_success() && !body.trim_start().starts_with('{') {
            return Err(TickerdeskError::provider(format!("{} returned {}", url, status)));
        }
        Ok(body)
    }

    fn chart(&self, symbol: &str, query: &[(&str, String)]) -> Result<String, TickerdeskError> {
        self.fetch(&symbol_url(CHART_URL, symbol)?, query)
    }
}

/// Endpoint URL with the symbol as its last path segment.
fn symbol_url(base: &str, symbol: &str) -> Result<String, TickerdeskError> {
    Ok(format!("{}/{}", base, validate_symbol(symbol)?))
}

fn history_query(range: &HistoryRange) -> Vec<(&'static str, String)> {
    let mut query = vec![("interval", "1d".to_string())];
    match range {
        HistoryRange::Period(period) => query.push(("range", period.as_str().to_string())),
        HistoryRange::Between { start, end } => {
            let end_exclusive = end.checked_add_days(Days::new(1)).unwrap_or(*end);
            query.push(("period1", timestamp_of(*start).to_string()));
            query.push(("period2", timestamp_of(end_exclusive).to_string()));
        }
    }
    query
}

impl MarketDataPort for YahooAdapter {
    fn get_history(
        &self,
        ticker: &str,
        range: &HistoryRange,
    ) -> Result<OhlcvTable, TickerdeskError> {
        let body = self.chart(ticker, &history_query(range))?;
        parse_chart(&body, ticker)
    }

    fn get_quote(&self, ticker: &str) -> Result<Quote, TickerdeskError> {
        let body = self.chart(
            ticker,
            &[("interval", "1d".to_string()), ("range", "5d".to_string())],
        )?;
        parse_quote(&body, ticker)
    }

    fn get_company_info(&self, ticker: &str) -> Result<CompanyInfo, TickerdeskError> {
        let body = self.fetch(
            &symbol_url(SUMMARY_URL, ticker)?,
            &[("modules", "assetProfile,price,summaryDetail".to_string())],
        )?;
        parse_company_info(&body, ticker)
    }

    fn get_option_expiries(&self, ticker: &str) -> Result<Vec<NaiveDate>, TickerdeskError> {
        let body = self.fetch(&symbol_url(OPTIONS_URL, ticker)?, &[])?;
        parse_option_expiries(&body, ticker)
    }

    fn get_options_chain(
        &self,
        ticker: &str,
        expiry: NaiveDate,
    ) -> Result<OptionsChain, TickerdeskError> {
        let body = self.fetch(
            &symbol_url(OPTIONS_URL, ticker)?,
            &[("date", timestamp_of(expiry).to_string())],
        )?;
        parse_options_chain(&body, ticker)
    }

    fn get_fx_rate(&self, currency: &str) -> Result<f64, TickerdeskError> {
        let symbol = fx_symbol(currency);
        self.get_quote(&symbol).map(|q| q.last_price)
    }
}
