//! Provider contract and payload types.
//!
//! This module defines the boundary the security model depends on
//! (`IssProvider`). Concrete implementations live in [`crate::adapters`].
//!
//! # Endpoints
//!
//! | Endpoint | Method | Payload |
//! |----------|--------|---------|
//! | Descriptor | [`fetch_descriptor`](IssProvider::fetch_descriptor) | [`DescriptorPayload`] |
//! | Market data | [`fetch_market_data`](IssProvider::fetch_market_data) | [`MarketDataPayload`] |
//! | History | [`fetch_history`](IssProvider::fetch_history) | [`HistoryPayload`] |
//! | Search | [`find_security`](IssProvider::find_security) | [`SearchPayload`] |
//! | Indices | [`fetch_indices`](IssProvider::fetch_indices) | [`IndicesPayload`] |
//! | Date range | [`fetch_date_range`](IssProvider::fetch_date_range) | [`DateRangePayload`] |
//!
//! An "empty" answer is a payload whose collection is empty; deciding whether
//! that is an error is left to the caller.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::domain::{Board, DateSpan, FieldMap, FieldValue, HistoryRecord, SecurityId, TradingDay};

/// Boxed future returned by provider calls.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Provider endpoint, used for call accounting and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Descriptor,
    MarketData,
    History,
    Search,
    Indices,
    DateRange,
}

impl Endpoint {
    pub const ALL: [Self; 6] = [
        Self::Descriptor,
        Self::MarketData,
        Self::History,
        Self::Search,
        Self::Indices,
        Self::DateRange,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Descriptor => "descriptor",
            Self::MarketData => "market_data",
            Self::History => "history",
            Self::Search => "search",
            Self::Indices => "indices",
            Self::DateRange => "date_range",
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Transport,
    Status,
    Decode,
    CircuitOpen,
    Throttled,
    InvalidRequest,
    /// A paged response did not finish within the configured page budget.
    Truncated,
}

/// Transport or protocol failure reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    kind: ProviderErrorKind,
    message: String,
    retryable: bool,
}

impl ProviderError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Transport,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn status(endpoint: Endpoint, status: u16) -> Self {
        Self {
            kind: ProviderErrorKind::Status,
            message: format!("iss {endpoint} request returned status {status}"),
            retryable: status == 429 || status >= 500,
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Decode,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn circuit_open(endpoint: Endpoint) -> Self {
        Self {
            kind: ProviderErrorKind::CircuitOpen,
            message: format!("iss circuit breaker is open; skipping {endpoint} request"),
            retryable: true,
        }
    }

    pub fn throttled(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Throttled,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn truncated(endpoint: Endpoint, pages: usize) -> Self {
        Self {
            kind: ProviderErrorKind::Truncated,
            message: format!("iss {endpoint} response still had rows after {pages} pages"),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> ProviderErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ProviderErrorKind::Transport => "provider.transport",
            ProviderErrorKind::Status => "provider.status",
            ProviderErrorKind::Decode => "provider.decode",
            ProviderErrorKind::CircuitOpen => "provider.circuit_open",
            ProviderErrorKind::Throttled => "provider.throttled",
            ProviderErrorKind::InvalidRequest => "provider.invalid_request",
            ProviderErrorKind::Truncated => "provider.truncated",
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for ProviderError {}

/// Static descriptor properties and the boards a security trades on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptorPayload {
    pub properties: Vec<(String, FieldValue)>,
    pub boards: Vec<Board>,
}

impl DescriptorPayload {
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// One market-data row per board.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketDataPayload {
    pub rows: Vec<FieldMap>,
}

/// Daily history rows; days without trading are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryPayload {
    pub rows: Vec<HistoryRecord>,
}

/// Search hit returned by [`IssProvider::find_security`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityMatch {
    pub secid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_board: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPayload {
    pub securities: Vec<SecurityMatch>,
}

/// Index the security is (or was) a constituent of.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMembership {
    pub index_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<TradingDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub till: Option<TradingDay>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicesPayload {
    pub indices: Vec<IndexMembership>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRangePayload {
    pub dates: Vec<DateSpan>,
}

/// Remote information service the security model reads from.
///
/// Implementations must be `Send + Sync`; a single provider is usually shared
/// by many [`Security`](crate::Security) entities behind an `Arc`.
///
/// # Errors
///
/// Every method reports transport and protocol failures as [`ProviderError`].
/// Missing data is not an error at this level: return an empty payload.
pub trait IssProvider: Send + Sync {
    fn fetch_descriptor<'a>(&'a self, secid: &'a SecurityId) -> ProviderFuture<'a, DescriptorPayload>;

    fn fetch_market_data<'a>(
        &'a self,
        engine: &'a str,
        market: &'a str,
        secid: &'a SecurityId,
    ) -> ProviderFuture<'a, MarketDataPayload>;

    /// Daily history for `[from, to]`. Open bounds let the provider choose.
    fn fetch_history<'a>(
        &'a self,
        board: &'a Board,
        secid: &'a SecurityId,
        from: Option<TradingDay>,
        to: Option<TradingDay>,
    ) -> ProviderFuture<'a, HistoryPayload>;

    fn find_security<'a>(&'a self, query: &'a str, limit: usize) -> ProviderFuture<'a, SearchPayload>;

    fn fetch_indices<'a>(&'a self, secid: &'a SecurityId) -> ProviderFuture<'a, IndicesPayload>;

    fn fetch_date_range<'a>(
        &'a self,
        board: &'a Board,
        secid: &'a SecurityId,
    ) -> ProviderFuture<'a, DateRangePayload>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_are_retryable_only_for_server_side_failures() {
        assert!(ProviderError::status(Endpoint::History, 503).retryable());
        assert!(ProviderError::status(Endpoint::History, 429).retryable());
        assert!(!ProviderError::status(Endpoint::History, 404).retryable());
    }

    #[test]
    fn display_includes_stable_code() {
        let error = ProviderError::decode("bad json");
        assert_eq!(error.to_string(), "bad json (provider.decode)");
        assert_eq!(error.kind(), ProviderErrorKind::Decode);
    }
}
