//! # Domain Models
//!
//! Strongly-typed values exchanged between the provider contract, the caches
//! and callers.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SecurityId`] | Validated exchange security code |
//! | [`TradingDay`] | Calendar date in exchange local time |
//! | [`DayRange`] | Inclusive day-by-day iterator |
//! | [`Board`] | Board with its engine and market |
//! | [`FieldValue`] | Scalar descriptor / market-data value |
//! | [`HistoryRow`] | Daily OHLCV values |
//! | [`HistoryRecord`] | Provider history row tagged with its trade date |
//! | [`DateSpan`] | Available history interval |

mod board;
mod history;
mod security_id;
mod trading_day;
mod value;

pub use board::Board;
pub use history::{DateSpan, HistoryRecord, HistoryRow};
pub use security_id::SecurityId;
pub use trading_day::{DayRange, TradingDay};
pub use value::{FieldMap, FieldValue};
