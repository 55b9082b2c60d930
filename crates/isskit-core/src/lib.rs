//! Core of isskit: lazily loaded securities backed by the MOEX ISS.
//!
//! This crate contains:
//! - Canonical domain models and validation
//! - The provider contract and its ISS / fixture adapters
//! - The [`Security`] entity with its descriptor, market snapshot and
//!   day-indexed history cache
//! - Structured errors, configuration and request throttling
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use isskit_core::{IssAdapter, IssConfig, Security, SecurityError};
//!
//! # async fn demo() -> Result<(), SecurityError> {
//! let provider = Arc::new(IssAdapter::new(IssConfig::default()));
//! let sber = Security::new(provider, "SBER")?;
//!
//! let last = sber.attribute("last price").await?;
//! let rows = sber.history_text(Some("2023-01-02"), Some("2023-01-06")).await?;
//! println!("{last} / {} rows", rows.len());
//! # Ok(())
//! # }
//! ```

pub mod accessor;
pub mod adapters;
pub mod attributes;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod market;
pub mod provider;
pub mod security;
pub mod throttling;

pub use accessor::{normalize, supported_aliases, Resolution};
pub use adapters::{FixtureProvider, FixtureSecurity, IssAdapter};
pub use attributes::{AttributeStore, LoadedAttributes};
pub use cache::{CacheMode, CacheStats, HistoryCache};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use config::{IssConfig, DEFAULT_BASE_URL};
pub use domain::{
    Board, DateSpan, DayRange, FieldMap, FieldValue, HistoryRecord, HistoryRow, SecurityId,
    TradingDay,
};
pub use error::{DataKind, SecurityError, ValidationError};
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient,
};
pub use market::MarketSnapshot;
pub use provider::{
    DateRangePayload, DescriptorPayload, Endpoint, HistoryPayload, IndexMembership,
    IndicesPayload, IssProvider, MarketDataPayload, ProviderError, ProviderErrorKind,
    ProviderFuture, SearchPayload, SecurityMatch,
};
pub use security::{search, Security, RESOLVE_LIMIT};
pub use throttling::RequestThrottle;
