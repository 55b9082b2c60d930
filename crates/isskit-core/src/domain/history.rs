use serde::{Deserialize, Serialize};

use super::TradingDay;

/// Daily OHLCV values for one trade date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl HistoryRow {
    pub const fn new(open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// History row as delivered by a provider, tagged with its trade date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub trade_date: TradingDay,
    #[serde(flatten)]
    pub row: HistoryRow,
}

impl HistoryRecord {
    pub const fn new(trade_date: TradingDay, row: HistoryRow) -> Self {
        Self { trade_date, row }
    }
}

/// Interval of dates for which a provider holds history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSpan {
    pub from: TradingDay,
    pub till: TradingDay,
}
