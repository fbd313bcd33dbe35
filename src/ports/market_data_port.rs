//! Market data access port trait.

use crate::domain::error::TickerdeskError;
use crate::domain::market::{CompanyInfo, HistoryRange, OptionsChain, Quote};
use crate::domain::ohlcv::OhlcvTable;
use chrono::NaiveDate;

/// A source of prices and fundamentals for exchange-listed tickers.
///
/// Only `get_history` is mandatory. The remaining methods default to
/// [`TickerdeskError::Unsupported`] so sparse sources stay small.
pub trait MarketDataPort {
    fn get_history(&self, ticker: &str, range: &HistoryRange)
    -> Result<OhlcvTable, TickerdeskError>;

    fn get_quote(&self, _ticker: &str) -> Result<Quote, TickerdeskError> {
        Err(unsupported("quotes"))
    }

    fn get_company_info(&self, _ticker: &str) -> Result<CompanyInfo, TickerdeskError> {
        Err(unsupported("company info"))
    }

    fn get_option_expiries(&self, _ticker: &str) -> Result<Vec<NaiveDate>, TickerdeskError> {
        Err(unsupported("options"))
    }

    fn get_options_chain(
        &self,
        _ticker: &str,
        _expiry: NaiveDate,
    ) -> Result<OptionsChain, TickerdeskError> {
        Err(unsupported("options"))
    }

    /// Units of `currency` per US dollar.
    fn get_fx_rate(&self, _currency: &str) -> Result<f64, TickerdeskError> {
        Err(unsupported("FX rates"))
    }
}

fn unsupported(what: &str) -> TickerdeskError {
    TickerdeskError::Unsupported {
        what: what.to_string(),
    }
}
