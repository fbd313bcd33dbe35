//! Market data service: a provider port plus an explicit history cache.
//!
//! Provider failures stop here. Each accessor logs the error and returns an
//! empty table, `None`, or a neutral exchange rate instead.

use crate::domain::market::{CompanyInfo, HistoryRange, OptionsChain, Quote, nearest_expiry};
use crate::domain::ohlcv::OhlcvTable;
use crate::ports::market_data_port::MarketDataPort;
use chrono::NaiveDate;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

pub const BASE_CURRENCY: &str = "USD";

/// Yahoo-style FX symbol for USD to `currency`.
pub fn fx_symbol(currency: &str) -> String {
    format!("{}=X", currency.trim().to_uppercase())
}

/// Histories kept by [`HistoryCache::new`].
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

type CacheKey = (String, HistoryRange);

#[derive(Debug, Default)]
struct CacheEntries {
    tables: HashMap<CacheKey, OhlcvTable>,
    /// Keys oldest first.
    order: VecDeque<CacheKey>,
}

/// Fetched price histories keyed by ticker and range, holding at most
/// `capacity` tables. The oldest insert is dropped first.
#[derive(Debug)]
pub struct HistoryCache {
    entries: Mutex<CacheEntries>,
    capacity: usize,
}

impl Default for HistoryCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl HistoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(CacheEntries::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, CacheEntries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, ticker: &str, range: &HistoryRange) -> Option<OhlcvTable> {
        self.lock().tables.get(&(ticker.to_string(), *range)).cloned()
    }

    pub fn insert(&self, ticker: &str, range: &HistoryRange, table: OhlcvTable) {
        let key = (ticker.to_string(), *range);
        let mut entries = self.lock();
        if entries.tables.insert(key.clone(), table).is_some() {
            return;
        }
        entries.order.push_back(key);
        while entries.order.len() > self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                entries.tables.remove(&oldest);
                debug!(ticker = %oldest.0, range = %oldest.1, "history evicted");
            }
        }
    }

    pub fn invalidate(&self) {
        let mut entries = self.lock();
        entries.tables.clear();
        entries.order.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().tables.is_empty()
    }
}

pub struct MarketData {
    port: Box<dyn MarketDataPort + Send + Sync>,
    cache: HistoryCache,
}

impl MarketData {
    pub fn new(port: impl MarketDataPort + Send + Sync + 'static, cache: HistoryCache) -> Self {
        Self {
            port: Box::new(port),
            cache,
        }
    }

    /// Price history; empty when the provider fails or has nothing.
    /// Only non-empty tables are cached.
    pub fn history(&self, ticker: &str, range: &HistoryRange) -> OhlcvTable {
        if let Some(table) = self.cache.get(ticker, range) {
            debug!(ticker, %range, "history cache hit");
            return table;
        }
        match self.port.get_history(ticker, range) {
            Ok(table) if !table.is_empty() => {
                info!(ticker, %range, rows = table.len(), "history fetched");
                self.cache.insert(ticker, range, table.clone());
                table
            }
            Ok(_) => {
                warn!(ticker, %range, "no history returned");
                OhlcvTable::empty(ticker)
            }
            Err(e) => {
                warn!(ticker, %range, error = %e, "history fetch failed");
                OhlcvTable::empty(ticker)
            }
        }
    }

    pub fn quote(&self, ticker: &str) -> Option<Quote> {
        self.port
            .get_quote(ticker)
            .inspect_err(|e| warn!(ticker, error = %e, "quote unavailable"))
            .ok()
    }

    pub fn company_info(&self, ticker: &str) -> Option<CompanyInfo> {
        self.port
            .get_company_info(ticker)
            .inspect_err(|e| warn!(ticker, error = %e, "company info unavailable"))
            .ok()
    }

    pub fn option_expiries(&self, ticker: &str) -> Vec<NaiveDate> {
        let mut expiries = self
            .port
            .get_option_expiries(ticker)
            .inspect_err(|e| debug!(ticker, error = %e, "no option expiries"))
            .unwrap_or_default();
        expiries.sort();
        expiries.dedup();
        expiries
    }

    /// Chain for `expiry`, or the nearest listed expiry when that one is
    /// absent, together with every listed expiry.
    pub fn options_chain(
        &self,
        ticker: &str,
        expiry: Option<NaiveDate>,
    ) -> (Option<OptionsChain>, Vec<NaiveDate>) {
        let expiries = self.option_expiries(ticker);
        let Some(chosen) = nearest_expiry(&expiries, expiry) else {
            return (None, expiries);
        };
        let chain = self
            .port
            .get_options_chain(ticker, chosen)
            .inspect_err(|e| warn!(ticker, %chosen, error = %e, "options chain unavailable"))
            .ok();
        (chain, expiries)
    }

    /// Units of `currency` per USD. 1.0 for USD itself, on failure, and for
    /// non-positive quotes.
    pub fn fx_rate(&self, currency: &str) -> f64 {
        let currency = currency.trim().to_uppercase();
        if currency.is_empty() || currency == BASE_CURRENCY {
            return 1.0;
        }
        match self.port.get_fx_rate(&currency) {
            Ok(rate) if rate.is_finite() && rate > 0.0 => rate,
            Ok(rate) => {
                warn!(%currency, rate, "ignoring non-positive exchange rate");
                1.0
            }
            Err(e) => {
                warn!(%currency, error = %e, "exchange rate unavailable");
                1.0
            }
        }
    }

    /// Drop every cached history.
    pub fn invalidate(&self) {
        let dropped = self.cache.len();
        self.cache.invalidate();
        info!(dropped, "history cache cleared");
    }

    pub fn cache(&self) -> &HistoryCache {
        &self.cache
    }
}
