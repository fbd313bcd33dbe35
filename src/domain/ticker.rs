//! Company name to ticker symbol resolution.

use crate::domain::error::TickerdeskError;

/// Known company names and their symbols, in match priority order.
pub const SYMBOL_MAP: [(&str, &str); 11] = [
    ("NVIDIA", "NVDA"),
    ("GOOGLE", "GOOG"),
    ("APPLE", "AAPL"),
    ("TESLA", "TSLA"),
    ("MICROSOFT", "MSFT"),
    ("AMAZON", "AMZN"),
    ("META", "META"),
    ("NETFLIX", "NFLX"),
    ("FACEBOOK", "META"),
    ("AMD", "AMD"),
    ("INTEL", "INTC"),
];

/// Map a free-form query to a ticker symbol.
///
/// The query is trimmed and upper-cased, then matched against
/// [`SYMBOL_MAP`]: an exact name wins, otherwise the first name that
/// contains the query or is contained in it. Anything else is taken to be a
/// symbol already. An empty query resolves to an empty string.
pub fn resolve_ticker(query: &str) -> String {
    let query = query.trim().to_uppercase();
    if query.is_empty() {
        return query;
    }
    if let Some((_, symbol)) = SYMBOL_MAP.iter().find(|(name, _)| *name == query) {
        return symbol.to_string();
    }
    SYMBOL_MAP
        .iter()
        .find(|(name, _)| name.contains(query.as_str()) || query.contains(name))
        .map(|(_, symbol)| symbol.to_string())
        .unwrap_or(query)
}

/// Longest symbol accepted by [`is_valid_symbol`].
pub const MAX_SYMBOL_LEN: usize = 20;

/// True when `symbol` is safe to use as a file stem or URL path segment:
/// `A-Z`, `0-9` and `.^=-` only, not starting with a dot.
pub fn is_valid_symbol(symbol: &str) -> bool {
    !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LEN
        && !symbol.starts_with('.')
        && symbol
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b".^=-".contains(&b))
}

/// `NoData` for symbols [`is_valid_symbol`] rejects.
pub fn validate_symbol(symbol: &str) -> Result<&str, TickerdeskError> {
    if is_valid_symbol(symbol) {
        Ok(symbol)
    } else {
        Err(TickerdeskError::NoData {
            ticker: symbol.to_string(),
        })
    }
}
