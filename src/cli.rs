//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::html_report_adapter::HtmlReportAdapter;
use crate::adapters::model_file_adapter::JsonModelLoader;
use crate::domain::config_validation::{
    DashboardSettings, DataSettings, ModelSettings, ProviderKind, WebSettings, dashboard_settings,
    data_settings, model_settings, validate_config, validate_currency, web_settings,
};
use crate::domain::dashboard::{Dashboard, DashboardRequest, build_dashboard, load_history};
use crate::domain::error::TickerdeskError;
use crate::domain::forecast::{ForecastEngine, MIN_FORECAST_ROWS, ModelHandle, check_horizon};
use crate::domain::indicator_engine::add_technical_indicators;
use crate::domain::market::{HistoryRange, Period};
use crate::domain::market_data::{HistoryCache, MarketData};
use crate::domain::signals::check_signals;
use crate::domain::ticker::{resolve_ticker, validate_symbol};
use crate::ports::model_port::ModelLoader;
use crate::ports::report_port::ReportPort;

/// Read when `--config` is not given and the file exists.
pub const DEFAULT_CONFIG: &str = "tickerdesk.ini";

#[derive(Parser, Debug)]
#[command(
    name = "tickerdesk",
    about = "Stock dashboard with technical indicators and LSTM price forecasts"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every data-reading command. Flags override the config.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// INI config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Market data provider: csv or yahoo
    #[arg(long)]
    pub provider: Option<String>,
    /// Directory of CSV price files; implies the csv provider
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// LSTM model artifact (JSON)
    #[arg(long)]
    pub model: Option<PathBuf>,
    /// Display currency, e.g. EUR
    #[arg(long)]
    pub currency: Option<String>,
    /// History period: 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y or max
    #[arg(long)]
    pub period: Option<String>,
    /// First day of an explicit range (YYYY-MM-DD)
    #[arg(long, requires = "end")]
    pub start: Option<NaiveDate>,
    /// Last day of an explicit range (YYYY-MM-DD)
    #[arg(long, requires = "start")]
    pub end: Option<NaiveDate>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the full dashboard and write it as an HTML report
    Analyze {
        /// Ticker symbol or company name
        query: String,
        #[command(flatten)]
        common: CommonArgs,
        /// Calendar days to forecast, 1 to 365
        #[arg(long)]
        horizon: Option<usize>,
        #[arg(long)]
        no_forecast: bool,
        #[arg(long)]
        no_indicators: bool,
        /// Option expiry to show (YYYY-MM-DD); nearest when omitted
        #[arg(long)]
        expiry: Option<NaiveDate>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the technical signals for a ticker
    Signals {
        query: String,
        #[command(flatten)]
        common: CommonArgs,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the price forecast and its backtested accuracy
    Forecast {
        query: String,
        #[command(flatten)]
        common: CommonArgs,
        /// Calendar days to forecast, 1 to 365
        #[arg(long)]
        horizon: Option<usize>,
        /// Days used for the accuracy check
        #[arg(long)]
        lookback: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Show the latest quote
    Quote {
        query: String,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Resolve a company name to a ticker symbol
    Resolve { query: String },
    /// Load a model artifact and check its shapes
    ValidateModel {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        model: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Start the web dashboard
    Serve {
        #[command(flatten)]
        common: CommonArgs,
        /// Listen address, e.g. 127.0.0.1:3000
        #[arg(long)]
        listen: Option<std::net::SocketAddr>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Analyze {
            query,
            common,
            horizon,
            no_forecast,
            no_indicators,
            expiry,
            output,
        } => run_analyze(
            &query,
            &common,
            AnalyzeOptions {
                horizon,
                no_forecast,
                no_indicators,
                expiry,
                output,
            },
        ),
        Command::Signals {
            query,
            common,
            json,
        } => run_signals(&query, &common, json),
        Command::Forecast {
            query,
            common,
            horizon,
            lookback,
            json,
        } => run_forecast(&query, &common, horizon, lookback, json),
        Command::Quote { query, common } => run_quote(&query, &common),
        Command::Resolve { query } => {
            println!("{}", resolve_ticker(&query));
            Ok(())
        }
        Command::ValidateModel { config, model } => run_validate_model(config, model),
        Command::Validate { config } => run_validate(&config),
        Command::Serve { common, listen } => run_serve(&common, listen),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Typed settings after config and flag overrides.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data: DataSettings,
    pub model: ModelSettings,
    pub dashboard: DashboardSettings,
    pub web: WebSettings,
}

pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, TickerdeskError> {
    match path {
        Some(p) => FileConfigAdapter::from_file(p),
        None if Path::new(DEFAULT_CONFIG).exists() => FileConfigAdapter::from_file(DEFAULT_CONFIG),
        None => Ok(FileConfigAdapter::empty()),
    }
}

pub fn load_settings(common: &CommonArgs) -> Result<Settings, TickerdeskError> {
    let config = load_config(common.config.as_deref())?;
    validate_config(&config)?;

    let mut settings = Settings {
        data: data_settings(&config)?,
        model: model_settings(&config)?,
        dashboard: dashboard_settings(&config)?,
        web: web_settings(&config)?,
    };

    if let Some(provider) = &common.provider {
        settings.data.provider = provider
            .parse::<ProviderKind>()
            .map_err(|reason| TickerdeskError::config_invalid("cli", "provider", reason))?;
    }
    if let Some(dir) = &common.data_dir {
        settings.data.provider = ProviderKind::Csv;
        settings.data.csv_dir = dir.clone();
    }
    if let Some(model) = &common.model {
        settings.model.path = model.clone();
    }
    if let Some(currency) = &common.currency {
        validate_currency(currency.trim())?;
        settings.dashboard.currency = currency.trim().to_uppercase();
    }
    if let Some(period) = &common.period {
        settings.dashboard.period = period
            .parse::<Period>()
            .map_err(|reason| TickerdeskError::config_invalid("cli", "period", reason))?;
    }
    Ok(settings)
}

pub fn build_market_data(settings: &DataSettings) -> Result<MarketData, TickerdeskError> {
    match settings.provider {
        ProviderKind::Csv => Ok(MarketData::new(
            CsvAdapter::new(settings.csv_dir.clone()),
            HistoryCache::with_capacity(settings.cache_entries),
        )),
        #[cfg(feature = "yahoo")]
        ProviderKind::Yahoo => {
            let adapter = crate::adapters::yahoo_adapter::YahooAdapter::from_settings(settings)?;
            Ok(MarketData::new(
                adapter,
                HistoryCache::with_capacity(settings.cache_entries),
            ))
        }
        #[cfg(not(feature = "yahoo"))]
        ProviderKind::Yahoo => Err(TickerdeskError::Unsupported {
            what: "the yahoo provider (built without the yahoo feature)".into(),
        }),
    }
}

pub fn build_forecast_engine(settings: &ModelSettings) -> ForecastEngine {
    let handle = ModelHandle::new(JsonModelLoader::new(settings.path.clone()));
    ForecastEngine::new(Arc::new(handle))
        .with_scaler(settings.scaler)
        .with_multi_step(settings.multi_step)
}

pub fn build_dashboard_request(
    query: &str,
    settings: &DashboardSettings,
    common: &CommonArgs,
) -> Result<DashboardRequest, TickerdeskError> {
    let range = match (common.start, common.end) {
        (Some(start), Some(end)) if start > end => {
            return Err(TickerdeskError::config_invalid(
                "cli",
                "start",
                format!("start {} is after end {}", start, end),
            ));
        }
        (Some(start), Some(end)) => HistoryRange::Between { start, end },
        _ => HistoryRange::Period(settings.period),
    };
    Ok(DashboardRequest {
        query: query.to_string(),
        range,
        currency: settings.currency.clone(),
        show_indicators: settings.show_indicators,
        enable_forecast: settings.enable_forecast,
        horizon: settings.horizon,
        accuracy_lookback: settings.accuracy_lookback,
        expiry: None,
    })
}

struct AnalyzeOptions {
    horizon: Option<usize>,
    no_forecast: bool,
    no_indicators: bool,
    expiry: Option<NaiveDate>,
    output: Option<PathBuf>,
}

fn run_analyze(
    query: &str,
    common: &CommonArgs,
    options: AnalyzeOptions,
) -> Result<(), TickerdeskError> {
    let settings = load_settings(common)?;
    let market = build_market_data(&settings.data)?;
    let forecaster = build_forecast_engine(&settings.model);

    let mut request = build_dashboard_request(query, &settings.dashboard, common)?;
    if let Some(h) = options.horizon {
        request.horizon = h;
    }
    request.enable_forecast &= !options.no_forecast;
    request.show_indicators &= !options.no_indicators;
    request.expiry = options.expiry;

    let dashboard = build_dashboard(&market, &forecaster, &request)?;
    let output = options
        .output
        .unwrap_or_else(|| PathBuf::from(format!("{}_dashboard.html", dashboard.ticker)));
    HtmlReportAdapter::new().write(&dashboard, &output.display().to_string())?;

    print_summary(&dashboard);
    eprintln!("\nReport written to: {}", output.display());

    if dashboard.history_empty() {
        return Err(TickerdeskError::NoData {
            ticker: dashboard.ticker,
        });
    }
    Ok(())
}

fn print_summary(dashboard: &Dashboard) {
    println!("{} ({})", dashboard.display_name(), dashboard.ticker);
    match &dashboard.quote {
        Some(q) => {
            let change = q
                .day_change_pct()
                .map(|p| format!(" ({:+.2}%)", p))
                .unwrap_or_default();
            println!(
                "Price: {:.2} {}{}  Previous close: {:.2}  Volume: {}",
                q.last_price, dashboard.currency, change, q.previous_close, q.volume
            );
        }
        None => println!("Real-time data possibly delayed."),
    }
    if dashboard.history_empty() {
        println!("No data found. Please check the ticker symbol.");
        return;
    }
    println!("Bars: {}", dashboard.frame.len());
    for (name, label) in dashboard.signals.iter() {
        println!("{}: {}", name, label);
    }
    if dashboard.forecast_enabled {
        match dashboard.forecast.as_ref().and_then(|f| f.first()) {
            Some(point) => println!(
                "Predicted next close: {:.2} {} ({})",
                point.price, dashboard.currency, point.date
            ),
            None => println!("Model not available or data insufficient."),
        }
        if let Some(acc) = &dashboard.accuracy {
            println!(
                "Accuracy over {} days: {:.2}% (MAPE {:.2}%)",
                acc.points.len(),
                acc.accuracy_pct,
                acc.mape
            );
        }
    }
}

fn run_signals(query: &str, common: &CommonArgs, json: bool) -> Result<(), TickerdeskError> {
    let settings = load_settings(common)?;
    let market = build_market_data(&settings.data)?;
    let request = build_dashboard_request(query, &settings.dashboard, common)?;

    let history = load_history(&market, &request)?;
    if history.table.is_empty() {
        return Err(TickerdeskError::NoData {
            ticker: history.ticker,
        });
    }
    let frame = add_technical_indicators(&history.table);
    let signals = check_signals(&frame);

    if json {
        let body = serde_json::json!({
            "ticker": history.ticker,
            "as_of": history.table.last_date(),
            "rows": frame.len(),
            "signals": signals,
        });
        println!("{}", body);
        return Ok(());
    }
    if signals.is_empty() {
        eprintln!(
            "{}: {} bars, not enough history for signals",
            history.ticker,
            frame.len()
        );
        return Ok(());
    }
    for (name, label) in signals.iter() {
        println!("{}: {}", name, label);
    }
    Ok(())
}

fn run_forecast(
    query: &str,
    common: &CommonArgs,
    horizon: Option<usize>,
    lookback: Option<usize>,
    json: bool,
) -> Result<(), TickerdeskError> {
    let settings = load_settings(common)?;
    let market = build_market_data(&settings.data)?;
    let forecaster = build_forecast_engine(&settings.model);
    let request = build_dashboard_request(query, &settings.dashboard, common)?;
    let horizon = horizon.unwrap_or(request.horizon);
    check_horizon(horizon)?;
    let lookback = lookback.unwrap_or(request.accuracy_lookback);

    let history = load_history(&market, &request)?;
    if history.table.is_empty() {
        return Err(TickerdeskError::NoData {
            ticker: history.ticker,
        });
    }
    let Some(forecast) = forecaster.predict_future(&history.table, horizon)? else {
        // Distinguish a missing model from a short history.
        let model = forecaster.model().try_get()?;
        return Err(TickerdeskError::InsufficientData {
            ticker: history.ticker,
            rows: history.table.len(),
            minimum: model.window_len().max(MIN_FORECAST_ROWS),
        });
    };
    let accuracy = forecaster.evaluate(&history.table, lookback);

    if json {
        let body = serde_json::json!({
            "ticker": history.ticker,
            "currency": history.currency,
            "multi_step": forecaster.multi_step().as_str(),
            "forecast": forecast,
            "accuracy": accuracy,
        });
        println!("{}", body);
        return Ok(());
    }
    for point in &forecast.points {
        println!("{}  {:.2} {}", point.date, point.price, history.currency);
    }
    match accuracy {
        Some(acc) => eprintln!(
            "Accuracy over {} days: {:.2}% (MAPE {:.2}%, MSE {:.6})",
            acc.points.len(),
            acc.accuracy_pct,
            acc.mape,
            acc.mse
        ),
        None => eprintln!("Not enough history for an accuracy check"),
    }
    Ok(())
}

fn run_quote(query: &str, common: &CommonArgs) -> Result<(), TickerdeskError> {
    let settings = load_settings(common)?;
    let market = build_market_data(&settings.data)?;
    let ticker = resolve_ticker(query);
    validate_symbol(&ticker)?;
    let currency = settings.dashboard.currency;
    let rate = market.fx_rate(&currency);

    let quote = market
        .quote(&ticker)
        .map(|q| q.converted(rate))
        .ok_or_else(|| TickerdeskError::NoData {
            ticker: ticker.clone(),
        })?;
    let change = quote
        .day_change_pct()
        .map(|p| format!("{:+.2}%", p))
        .unwrap_or_else(|| "n/a".into());
    println!(
        "{}  {:.2} {}  prev {:.2}  {}  vol {}",
        ticker, quote.last_price, currency, quote.previous_close, change, quote.volume
    );
    Ok(())
}

fn run_validate_model(
    config: Option<PathBuf>,
    model: Option<PathBuf>,
) -> Result<(), TickerdeskError> {
    let path = match model {
        Some(p) => p,
        None => model_settings(&load_config(config.as_deref())?)?.path,
    };
    eprintln!("Validating model: {}", path.display());
    let loader = JsonModelLoader::new(path);
    let network = loader.load_network()?;
    println!(
        "{}: {} LSTM layer(s), {} dense layer(s), window {}",
        loader.describe(),
        network.lstm.len(),
        network.dense.len(),
        network.window
    );
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), TickerdeskError> {
    eprintln!("Loading config from {}", config_path.display());
    let config = FileConfigAdapter::from_file(config_path)?;
    validate_config(&config)?;
    println!("Configuration is valid.");
    Ok(())
}

fn run_serve(
    common: &CommonArgs,
    listen: Option<std::net::SocketAddr>,
) -> Result<(), TickerdeskError> {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{AppState, serve};

        let settings = load_settings(common)?;
        let market = build_market_data(&settings.data)?;
        let forecaster = build_forecast_engine(&settings.model);
        let defaults = build_dashboard_request("Nvidia", &settings.dashboard, common)?;
        let addr = listen.unwrap_or(settings.web.listen);

        eprintln!("Starting web server on {}", addr);
        let state = AppState {
            market: Arc::new(market),
            forecaster: Arc::new(forecaster),
            defaults,
        };
        tokio::runtime::Runtime::new()?.block_on(serve(state, addr))
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = (common, listen);
        Err(TickerdeskError::Unsupported {
            what: "serve (built without the web feature)".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn parses_analyze_with_overrides() {
        let cli = parse(&[
            "tickerdesk",
            "analyze",
            "nvidia",
            "--currency",
            "eur",
            "--horizon",
            "5",
            "--no-forecast",
            "-o",
            "out.html",
        ]);
        match cli.command {
            Command::Analyze {
                query,
                common,
                horizon,
                no_forecast,
                output,
                ..
            } => {
                assert_eq!(query, "nvidia");
                assert_eq!(common.currency.as_deref(), Some("eur"));
                assert_eq!(horizon, Some(5));
                assert!(no_forecast);
                assert_eq!(output, Some(PathBuf::from("out.html")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn start_requires_end() {
        assert!(Cli::try_parse_from(["tickerdesk", "signals", "NVDA", "--start", "2024-01-01"]).is_err());
        assert!(
            Cli::try_parse_from([
                "tickerdesk", "signals", "NVDA", "--start", "2024-01-01", "--end", "2024-02-01"
            ])
            .is_ok()
        );
    }

    #[test]
    fn settings_apply_flag_overrides() {
        let common = CommonArgs {
            data_dir: Some(PathBuf::from("/tmp/prices")),
            currency: Some("gbp".into()),
            period: Some("1y".into()),
            model: Some(PathBuf::from("m.json")),
            ..Default::default()
        };
        let settings = load_settings(&common).unwrap();
        assert_eq!(settings.data.provider, ProviderKind::Csv);
        assert_eq!(settings.data.csv_dir, PathBuf::from("/tmp/prices"));
        assert_eq!(settings.dashboard.currency, "GBP");
        assert_eq!(settings.dashboard.period, Period::OneYear);
        assert_eq!(settings.model.path, PathBuf::from("m.json"));
    }

    #[test]
    fn bad_flag_values_are_config_errors() {
        let common = CommonArgs {
            provider: Some("bloomberg".into()),
            ..Default::default()
        };
        assert!(matches!(
            load_settings(&common),
            Err(TickerdeskError::ConfigInvalid { .. })
        ));
        let common = CommonArgs {
            currency: Some("EURO".into()),
            ..Default::default()
        };
        assert!(matches!(
            load_settings(&common),
            Err(TickerdeskError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn request_uses_explicit_range() {
        let settings = DashboardSettings {
            period: Period::OneYear,
            currency: "USD".into(),
            show_indicators: true,
            enable_forecast: true,
            horizon: 1,
            accuracy_lookback: 30,
        };
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let common = CommonArgs {
            start: Some(start),
            end: Some(end),
            ..Default::default()
        };
        let request = build_dashboard_request("AAPL", &settings, &common).unwrap();
        assert_eq!(request.range, HistoryRange::Between { start, end });

        let reversed = CommonArgs {
            start: Some(end),
            end: Some(start),
            ..Default::default()
        };
        assert!(build_dashboard_request("AAPL", &settings, &reversed).is_err());

        let request = build_dashboard_request("AAPL", &settings, &CommonArgs::default()).unwrap();
        assert_eq!(request.range, HistoryRange::Period(Period::OneYear));
    }

    #[test]
    fn horizon_help_says_calendar_days() {
        use clap::CommandFactory;
        let command = Cli::command();
        for name in ["analyze", "forecast"] {
            let sub = command.find_subcommand(name).unwrap();
            let arg = sub.get_arguments().find(|a| a.get_id() == "horizon").unwrap();
            let help = arg.get_help().unwrap().to_string();
            assert!(help.starts_with("Calendar days"), "{name}: {help}");
        }
    }
}
