//! Augments an OHLCV table with the dashboard's standard indicator columns.

use crate::domain::indicator::{
    IndicatorFrame, bollinger, calculate_bollinger, calculate_ema, calculate_macd, calculate_rsi,
    calculate_sma, macd, rsi,
};
use crate::domain::ohlcv::OhlcvTable;
use tracing::{debug, warn};

pub const SMA_PERIODS: [usize; 3] = [20, 50, 200];
pub const EMA_SPANS: [usize; 2] = [macd::DEFAULT_FAST, macd::DEFAULT_SLOW];

/// Compute SMA 20/50/200, EMA 12/26, RSI 14, MACD with its signal line and
/// Bollinger 20/2 over `table`.
///
/// The frame holds its own copy of the bars. An empty table yields an empty
/// frame with no columns; otherwise every column is present, with `None`
/// for rows still in warm-up.
pub fn add_technical_indicators(table: &OhlcvTable) -> IndicatorFrame {
    let mut frame = IndicatorFrame::new(table.clone());
    if table.is_empty() {
        return frame;
    }
    let bars = table.bars();

    let mut series = Vec::with_capacity(12);
    for period in SMA_PERIODS {
        series.push(calculate_sma(bars, period));
    }
    for span in EMA_SPANS {
        series.push(calculate_ema(bars, span));
    }
    series.push(calculate_rsi(bars, rsi::DEFAULT_PERIOD));

    let macd_series = calculate_macd(
        bars,
        macd::DEFAULT_FAST,
        macd::DEFAULT_SLOW,
        macd::DEFAULT_SIGNAL,
    );
    series.push(macd_series.macd);
    series.push(macd_series.signal);

    let bb = calculate_bollinger(bars, bollinger::DEFAULT_PERIOD, bollinger::DEFAULT_MULTIPLIER);
    series.extend([bb.middle, bb.std, bb.upper, bb.lower]);

    for s in series {
        let column = s.column;
        if !frame.insert(s) {
            warn!(%column, "indicator length mismatch, column skipped");
        }
    }

    debug!(
        ticker = table.ticker(),
        rows = table.len(),
        "technical indicators computed"
    );
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::IndicatorColumn;
    use crate::domain::ohlcv::OhlcvBar;
    use chrono::NaiveDate;

    fn linear_table(n: usize) -> OhlcvTable {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let bars = (0..n)
            .map(|i| {
                let close = 100.0 + i as f64;
                OhlcvBar {
                    date: start + chrono::Duration::days(i as i64),
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000 + i as u64,
                }
            })
            .collect();
        OhlcvTable::new("LIN", bars)
    }

    const ALL_COLUMNS: [IndicatorColumn; 12] = [
        IndicatorColumn::Sma(20),
        IndicatorColumn::Sma(50),
        IndicatorColumn::Sma(200),
        IndicatorColumn::Ema(12),
        IndicatorColumn::Ema(26),
        IndicatorColumn::Rsi,
        IndicatorColumn::Macd,
        IndicatorColumn::SignalLine,
        IndicatorColumn::BollingerMiddle,
        IndicatorColumn::BollingerStd,
        IndicatorColumn::BollingerUpper,
        IndicatorColumn::BollingerLower,
    ];

    #[test]
    fn empty_table_yields_empty_frame() {
        let frame = add_technical_indicators(&OhlcvTable::empty("NONE"));
        assert!(frame.is_empty());
        assert_eq!(frame.columns().count(), 0);
    }

    #[test]
    fn all_columns_present_for_short_table() {
        let frame = add_technical_indicators(&linear_table(30));
        for col in ALL_COLUMNS {
            assert!(frame.has_column(col), "{} missing", col);
        }
        assert!(frame.column(IndicatorColumn::Sma(200)).unwrap().iter().all(Option::is_none));
    }

    #[test]
    fn linear_scenario() {
        let frame = add_technical_indicators(&linear_table(300));
        assert_eq!(frame.latest(IndicatorColumn::Sma(50)), Some(374.5));
        assert_eq!(frame.latest(IndicatorColumn::Rsi), Some(100.0));
        assert!(frame.value(IndicatorColumn::Sma(20), 18).is_none());
        assert!(frame.value(IndicatorColumn::Sma(20), 19).is_some());
        assert_eq!(frame.value(IndicatorColumn::Ema(12), 0), Some(100.0));
    }

    #[test]
    fn bollinger_middle_equals_sma_20() {
        let frame = add_technical_indicators(&linear_table(40));
        assert_eq!(
            frame.column(IndicatorColumn::BollingerMiddle),
            frame.column(IndicatorColumn::Sma(20))
        );
    }

    #[test]
    fn source_table_untouched() {
        let table = linear_table(25);
        let before = table.closes();
        let frame = add_technical_indicators(&table);
        assert_eq!(table.closes(), before);
        assert_eq!(frame.len(), table.len());
    }
}
