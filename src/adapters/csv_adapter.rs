//! CSV file market data adapter.
//!
//! Files live in one directory:
//! - `{TICKER}.csv`: `date,open,high,low,close,volume` daily bars
//! - `{CUR}=X.csv`: same layout, close is units of CUR per USD
//! - `{TICKER}.info.json`: optional company fundamentals
//! - `{TICKER}.options.csv`: optional
//!   `expiry,type,strike,last_price,volume,implied_volatility` rows
//!
//! Period ranges are measured back from the newest bar in the file, so a
//! static snapshot keeps returning the same window.

use crate::domain::error::TickerdeskError;
use crate::domain::market::{CompanyInfo, HistoryRange, OptionContract, OptionsChain, Quote};
use crate::domain::market_data::fx_symbol;
use crate::domain::ohlcv::{OhlcvBar, OhlcvTable};
use crate::domain::ticker::validate_symbol;
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct OptionRow {
    expiry: NaiveDate,
    #[serde(rename = "type")]
    kind: String,
    strike: f64,
    last_price: f64,
    volume: Option<u64>,
    implied_volatility: Option<f64>,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn from_config(config: &dyn ConfigPort) -> Self {
        let dir = config
            .get_string("data", "csv_dir")
            .unwrap_or_else(|| crate::domain::config_validation::DEFAULT_CSV_DIR.to_string());
        Self::new(PathBuf::from(dir))
    }

    /// `{symbol}{suffix}` inside the data directory. Symbols that could
    /// name a path outside it are `NoData`.
    fn file(&self, symbol: &str, suffix: &str) -> Result<PathBuf, TickerdeskError> {
        let symbol = validate_symbol(symbol)?;
        Ok(self.base_path.join(format!("{}{}", symbol, suffix)))
    }

    fn read(path: &Path) -> Result<String, TickerdeskError> {
        fs::read_to_string(path).map_err(|e| {
            TickerdeskError::provider(format!("failed to read {}: {}", path.display(), e))
        })
    }

    fn load_bars(&self, symbol: &str) -> Result<Vec<OhlcvBar>, TickerdeskError> {
        let path = self.file(symbol, ".csv")?;
        if !path.exists() {
            return Err(TickerdeskError::NoData {
                ticker: symbol.to_string(),
            });
        }
        let content = Self::read(&path)?;
        parse_bars(&content)
    }

    fn load_table(&self, symbol: &str) -> Result<OhlcvTable, TickerdeskError> {
        Ok(OhlcvTable::new(symbol, self.load_bars(symbol)?))
    }

    fn load_options(&self, ticker: &str) -> Result<Vec<OptionRow>, TickerdeskError> {
        let path = self.file(ticker, ".options.csv")?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = Self::read(&path)?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        rdr.deserialize()
            .map(|row| {
                row.map_err(|e| TickerdeskError::provider(format!("options CSV parse error: {}", e)))
            })
            .collect()
    }
}

fn field<'a>(record: &'a csv::StringRecord, idx: usize, name: &str) -> Result<&'a str, TickerdeskError> {
    record
        .get(idx)
        .map(str::trim)
        .ok_or_else(|| TickerdeskError::provider(format!("missing {} column", name)))
}

/// Blank cells read as NaN so the table drops the bar.
fn parse_price(record: &csv::StringRecord, idx: usize, name: &str) -> Result<f64, TickerdeskError> {
    let raw = field(record, idx, name)?;
    if raw.is_empty() {
        return Ok(f64::NAN);
    }
    raw.parse()
        .map_err(|e| TickerdeskError::provider(format!("invalid {} value '{}': {}", name, raw, e)))
}

fn parse_volume(record: &csv::StringRecord) -> Result<u64, TickerdeskError> {
    let raw = field(record, 5, "volume")?;
    if raw.is_empty() {
        return Ok(0);
    }
    if let Ok(v) = raw.parse::<u64>() {
        return Ok(v);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v.round() as u64),
        _ => Err(TickerdeskError::provider(format!("invalid volume value '{}'", raw))),
    }
}

fn parse_bars(content: &str) -> Result<Vec<OhlcvBar>, TickerdeskError> {
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut bars = Vec::new();

    for result in rdr.records() {
        let record =
            result.map_err(|e| TickerdeskError::provider(format!("CSV parse error: {}", e)))?;

        let date_str = field(&record, 0, "date")?;
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
            TickerdeskError::provider(format!("invalid date '{}': {}", date_str, e))
        })?;

        bars.push(OhlcvBar {
            date,
            open: parse_price(&record, 1, "open")?,
            high: parse_price(&record, 2, "high")?,
            low: parse_price(&record, 3, "low")?,
            close: parse_price(&record, 4, "close")?,
            volume: parse_volume(&record)?,
        });
    }
    Ok(bars)
}

fn to_contract(row: &OptionRow) -> OptionContract {
    OptionContract {
        strike: row.strike,
        last_price: row.last_price,
        volume: row.volume,
        implied_volatility: row.implied_volatility,
    }
}

impl MarketDataPort for CsvAdapter {
    fn get_history(
        &self,
        ticker: &str,
        range: &HistoryRange,
    ) -> Result<OhlcvTable, TickerdeskError> {
        let table = self.load_table(ticker)?;
        let Some(latest) = table.last_date() else {
            return Ok(table);
        };
        let (start, end) = range.bounds(latest);
        let bars = table
            .bars()
            .iter()
            .filter(|b| start.is_none_or(|s| b.date >= s) && b.date <= end)
            .cloned()
            .collect();
        Ok(OhlcvTable::new(ticker, bars))
    }

    fn get_quote(&self, ticker: &str) -> Result<Quote, TickerdeskError> {
        let table = self.load_table(ticker)?;
        let last = table.tail(2);
        match last {
            [prev, cur] => Ok(Quote {
                last_price: cur.close,
                previous_close: prev.close,
                volume: cur.volume,
            }),
            [only] => Ok(Quote {
                last_price: only.close,
                previous_close: only.close,
                volume: only.volume,
            }),
            _ => Err(TickerdeskError::NoData {
                ticker: ticker.to_string(),
            }),
        }
    }

    fn get_company_info(&self, ticker: &str) -> Result<CompanyInfo, TickerdeskError> {
        let path = self.file(ticker, ".info.json")?;
        if !path.exists() {
            return Err(TickerdeskError::NoData {
                ticker: ticker.to_string(),
            });
        }
        let content = Self::read(&path)?;
        serde_json::from_str(&content).map_err(|e| {
            TickerdeskError::provider(format!("invalid {}: {}", path.display(), e))
        })
    }

    fn get_option_expiries(&self, ticker: &str) -> Result<Vec<NaiveDate>, TickerdeskError> {
        let mut expiries: Vec<NaiveDate> =
            self.load_options(ticker)?.iter().map(|r| r.expiry).collect();
        expiries.sort();
        expiries.dedup();
        Ok(expiries)
    }

    fn get_options_chain(
        &self,
        ticker: &str,
        expiry: NaiveDate,
    ) -> Result<OptionsChain, TickerdeskError> {
        let rows: Vec<OptionRow> = self
            .load_options(ticker)?
            .into_iter()
            .filter(|r| r.expiry == expiry)
            .collect();
        if rows.is_empty() {
            return Err(TickerdeskError::NoData {
                ticker: format!("{} options {}", ticker, expiry),
            });
        }
        let side = |kind: &str| -> Vec<OptionContract> {
            let mut contracts: Vec<OptionContract> = rows
                .iter()
                .filter(|r| r.kind.eq_ignore_ascii_case(kind))
                .map(to_contract)
                .collect();
            contracts.sort_by(|a, b| a.strike.total_cmp(&b.strike));
            contracts
        };
        Ok(OptionsChain {
            expiry,
            calls: side("call"),
            puts: side("put"),
        })
    }

    fn get_fx_rate(&self, currency: &str) -> Result<f64, TickerdeskError> {
        let symbol = fx_symbol(currency);
        let table = self.load_table(&symbol)?;
        table
            .bars()
            .last()
            .map(|b| b.close)
            .ok_or(TickerdeskError::NoData { ticker: symbol })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::Period;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,open,high,low,close,volume\n\
            2023-06-15,90.0,95.0,85.0,92.0,40000\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000.0\n\
            2024-01-17,110.0,120.0,105.0,,55000\n\
            2024-01-18,110.0,120.0,105.0,115.0,55000\n";
        fs::write(path.join("NVDA.csv"), csv_content).unwrap();
        fs::write(
            path.join("EUR=X.csv"),
            "date,open,high,low,close,volume\n\
             2024-01-17,0.9,0.9,0.9,0.91,0\n\
             2024-01-18,0.9,0.9,0.9,0.92,0\n",
        )
        .unwrap();
        fs::write(
            path.join("NVDA.info.json"),
            r#"{"name": "NVIDIA Corporation", "sector": "Technology", "trailing_pe": 65.2}"#,
        )
        .unwrap();
        fs::write(
            path.join("NVDA.options.csv"),
            "expiry,type,strike,last_price,volume,implied_volatility\n\
             2024-02-16,call,120.0,3.5,100,0.45\n\
             2024-02-16,call,110.0,7.5,,0.40\n\
             2024-02-16,put,100.0,2.0,50,\n\
             2024-03-15,call,130.0,4.0,10,0.5\n",
        )
        .unwrap();

        (dir, path)
    }

    #[test]
    fn history_parses_and_drops_blank_close() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let table = adapter
            .get_history("NVDA", &HistoryRange::Period(Period::Max))
            .unwrap();

        assert_eq!(table.len(), 4);
        let bar = &table.bars()[1];
        assert_eq!(bar.date, date(2024, 1, 15));
        assert_eq!(bar.open, 100.0);
        assert_eq!(bar.high, 110.0);
        assert_eq!(bar.low, 90.0);
        assert_eq!(bar.close, 105.0);
        assert_eq!(bar.volume, 50000);
        assert_eq!(table.bars()[2].volume, 60000);
    }

    #[test]
    fn period_is_relative_to_last_bar() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let table = adapter
            .get_history("NVDA", &HistoryRange::Period(Period::OneMonth))
            .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.bars()[0].date, date(2024, 1, 15));
    }

    #[test]
    fn explicit_range_filters() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let range = HistoryRange::Between {
            start: date(2024, 1, 16),
            end: date(2024, 1, 16),
        };
        let table = adapter.get_history("NVDA", &range).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.bars()[0].date, date(2024, 1, 16));
    }

    #[test]
    fn missing_file_is_no_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let result = adapter.get_history("XYZ", &HistoryRange::default());
        assert!(matches!(result, Err(TickerdeskError::NoData { .. })));
    }

    #[test]
    fn symbols_cannot_leave_data_dir() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        fs::create_dir_all(&data).unwrap();
        let secret = "date,open,high,low,close,volume\n2024-01-02,1,1,1,1,1\n";
        fs::write(dir.path().join("SECRET.csv"), secret).unwrap();
        fs::write(dir.path().join("SECRET.info.json"), r#"{"name": "Secret"}"#).unwrap();
        let absolute = dir.path().join("SECRET").display().to_string();
        let adapter = CsvAdapter::new(data);

        for symbol in ["../SECRET", absolute.as_str()] {
            assert!(matches!(
                adapter.get_history(symbol, &HistoryRange::Period(Period::Max)),
                Err(TickerdeskError::NoData { .. })
            ));
            assert!(matches!(
                adapter.get_company_info(symbol),
                Err(TickerdeskError::NoData { .. })
            ));
            assert!(adapter.get_option_expiries(symbol).is_err());
        }
    }

    #[test]
    fn malformed_row_is_provider_error() {
        let (_dir, path) = setup_test_data();
        fs::write(path.join("BAD.csv"), "date,open,high,low,close,volume\nnot-a-date,1,1,1,1,1\n")
            .unwrap();
        let adapter = CsvAdapter::new(path);
        let result = adapter.get_history("BAD", &HistoryRange::default());
        assert!(matches!(result, Err(TickerdeskError::Provider { .. })));
    }

    #[test]
    fn quote_from_last_two_bars() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let quote = adapter.get_quote("NVDA").unwrap();
        assert_eq!(quote.last_price, 115.0);
        assert_eq!(quote.previous_close, 110.0);
        assert_eq!(quote.volume, 55000);
    }

    #[test]
    fn fx_rate_from_symbol_file() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert_eq!(adapter.get_fx_rate("eur").unwrap(), 0.92);
        assert!(adapter.get_fx_rate("GBP").is_err());
    }

    #[test]
    fn company_info_from_json() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let info = adapter.get_company_info("NVDA").unwrap();
        assert_eq!(info.name.as_deref(), Some("NVIDIA Corporation"));
        assert_eq!(info.trailing_pe, Some(65.2));
        assert_eq!(info.summary, None);
        assert!(adapter.get_company_info("AAPL").is_err());
    }

    #[test]
    fn options_chain_split_and_sorted() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        assert_eq!(
            adapter.get_option_expiries("NVDA").unwrap(),
            vec![date(2024, 2, 16), date(2024, 3, 15)]
        );
        let chain = adapter.get_options_chain("NVDA", date(2024, 2, 16)).unwrap();
        assert_eq!(chain.calls.len(), 2);
        assert_eq!(chain.calls[0].strike, 110.0);
        assert_eq!(chain.calls[0].volume, None);
        assert_eq!(chain.puts.len(), 1);
        assert_eq!(chain.puts[0].implied_volatility, None);
    }

    #[test]
    fn no_options_file_means_no_expiries() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert!(adapter.get_option_expiries("AAPL").unwrap().is_empty());
    }
}
