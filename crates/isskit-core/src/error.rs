use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::domain::SecurityId;
use crate::provider::ProviderError;

/// Input validation errors raised before any provider access.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("security id cannot be empty")]
    EmptySecurityId,
    #[error("security id length {len} exceeds max {max}")]
    SecurityIdTooLong { len: usize, max: usize },
    #[error("security id contains invalid character '{ch}' at index {index}")]
    SecurityIdInvalidChar { ch: char, index: usize },

    #[error("trading day must be formatted as YYYY-MM-DD: '{value}'")]
    InvalidTradingDay { value: String },
    #[error("range start {from} is after range end {to}")]
    InvertedRange { from: String, to: String },

    #[error("board '{board}' is not available for {secid}")]
    UnknownBoard { board: String, secid: String },

    #[error("attribute name cannot be empty")]
    EmptyAttributeName,

    #[error("search query cannot be empty")]
    EmptyQuery,
    #[error("search limit must be greater than zero")]
    ZeroLimit,

    #[error("invalid value for {key}: '{value}'")]
    InvalidConfig { key: &'static str, value: String },
}

/// Kind of remote data a lazy load was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Descriptor,
    Boards,
    MarketData,
    History,
    Indices,
    DateRange,
    Security,
}

impl DataKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Descriptor => "descriptor",
            Self::Boards => "boards",
            Self::MarketData => "market data",
            Self::History => "history",
            Self::Indices => "indices",
            Self::DateRange => "date range",
            Self::Security => "security",
        }
    }
}

impl Display for DataKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error surfaced by every [`Security`](crate::Security) operation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SecurityError {
    #[error(transparent)]
    InvalidArgument(#[from] ValidationError),

    #[error("no {what} found for '{secid}'")]
    DataNotFound { what: DataKind, secid: String },

    #[error("unsupported attribute '{name}'")]
    UnsupportedAttribute { name: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl SecurityError {
    pub fn not_found(what: DataKind, secid: &SecurityId) -> Self {
        Self::DataNotFound {
            what,
            secid: secid.to_string(),
        }
    }

    pub fn unsupported(name: impl Into<String>) -> Self {
        Self::UnsupportedAttribute { name: name.into() }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "security.invalid_argument",
            Self::DataNotFound { .. } => "security.data_not_found",
            Self::UnsupportedAttribute { .. } => "security.unsupported_attribute",
            Self::Provider(error) => error.code(),
        }
    }
}
