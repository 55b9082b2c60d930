//! Behavior-driven tests for the lifecycle of a lazily loaded security.
//!
//! These tests verify WHEN each piece of remote data is loaded, how failures
//! leave the entity, and how state is shared between concurrent callers.

use std::sync::Arc;

use isskit_core::{
    DataKind, Endpoint, FieldValue, FixtureProvider, ProviderError, ProviderErrorKind, Security,
    SecurityError, TradingDay,
};

fn day(raw: &str) -> TradingDay {
    TradingDay::parse(raw).expect("valid day")
}

fn sample() -> (Arc<FixtureProvider>, Security) {
    let provider = Arc::new(FixtureProvider::sample());
    let security = Security::new(provider.clone(), "SBER").expect("valid code");
    (provider, security)
}

// =============================================================================
// Lifecycle: Lazy Loading
// =============================================================================

#[tokio::test]
async fn when_security_is_constructed_nothing_is_fetched() {
    let provider = Arc::new(FixtureProvider::sample());

    let security = Security::new(provider.clone(), "NOSUCH").expect("valid code");

    assert_eq!(security.id().as_str(), "NOSUCH");
    assert_eq!(provider.total_calls(), 0);
}

#[tokio::test]
async fn when_unknown_code_is_first_accessed_system_reports_missing_descriptor() {
    // Given: An entity for a code the provider does not know
    let provider = Arc::new(FixtureProvider::sample());
    let security = Security::new(provider.clone(), "NOSUCH").expect("valid code");

    // When: An attribute is read
    let error = security.attribute("isin").await.expect_err("unknown code");

    // Then: The failure names the descriptor
    assert_eq!(
        error,
        SecurityError::DataNotFound {
            what: DataKind::Descriptor,
            secid: String::from("NOSUCH"),
        }
    );
    assert_eq!(provider.calls(Endpoint::MarketData), 0);
}

#[tokio::test]
async fn when_descriptor_load_fails_next_access_retries() {
    // Given: The first descriptor request fails in transport
    let (provider, security) = sample();
    provider.fail_next(ProviderError::transport("connection reset"));

    // When: The attribute is read twice
    let first = security.attribute("isin").await;
    let second = security.attribute("isin").await;

    // Then: The first error is propagated unchanged and the retry succeeds
    match first {
        Err(SecurityError::Provider(error)) => {
            assert_eq!(error.kind(), ProviderErrorKind::Transport);
            assert!(error.retryable());
        }
        other => panic!("expected provider error, got {other:?}"),
    }
    assert_eq!(second, Ok(FieldValue::text("RU0009029540")));
    assert_eq!(provider.calls(Endpoint::Descriptor), 2);
}

#[tokio::test]
async fn when_attributes_are_read_repeatedly_each_source_loads_once() {
    let (provider, security) = sample();

    for _ in 0..3 {
        security.attribute("shortname").await.expect("descriptor");
        security.attribute("last_price").await.expect("market data");
        security.attribute("VOLUME").await.expect("market data");
    }

    assert_eq!(provider.calls(Endpoint::Descriptor), 1);
    assert_eq!(provider.calls(Endpoint::MarketData), 1);
    assert_eq!(
        security.attribute("volume").await,
        Ok(FieldValue::Integer(15_400_000_000))
    );
}

// =============================================================================
// Lifecycle: Refresh and Boards
// =============================================================================

#[tokio::test]
async fn when_refreshed_system_refetches_market_data_but_not_history() {
    let (provider, security) = sample();
    security
        .history(Some(day("2023-01-02")), Some(day("2023-01-06")))
        .await
        .expect("history");
    security.market_data().await.expect("snapshot");

    security.refresh().await.expect("refresh");
    security
        .history(Some(day("2023-01-02")), Some(day("2023-01-06")))
        .await
        .expect("cached history");

    assert_eq!(provider.calls(Endpoint::MarketData), 2);
    assert_eq!(provider.calls(Endpoint::History), 1);
}

#[tokio::test]
async fn when_board_is_switched_snapshot_follows_the_board() {
    let (provider, security) = sample();
    assert_eq!(
        security.current_board().await.expect("board").board_id,
        "TQBR"
    );

    security.select_board("SMAL").await.expect("switch");
    let row = security.market_data().await.expect("snapshot");

    assert_eq!(security.current_board().await.expect("board").board_id, "SMAL");
    assert!(row.contains_key("VALTODAY"));
    assert_eq!(provider.calls(Endpoint::MarketData), 1);
}

#[tokio::test]
async fn when_unknown_board_is_selected_current_board_is_kept() {
    let (_provider, security) = sample();

    let error = security.select_board("EQBR").await.expect_err("unknown board");

    assert_eq!(error.code(), "security.invalid_argument");
    assert_eq!(security.current_board().await.expect("board").board_id, "TQBR");
}

#[tokio::test]
async fn when_board_has_no_history_system_reports_missing_history() {
    // Given: The SMAL board, which has no history rows
    let (provider, security) = sample();
    security.select_board("SMAL").await.expect("switch");

    // When: A bounded and an open-ended range are requested
    let bounded = security
        .history(Some(day("2023-01-02")), Some(day("2023-01-06")))
        .await
        .expect_err("no rows");
    let open = security.history(None, None).await.expect_err("no rows");

    // Then: Both report missing history, and the bounded days are remembered as gaps
    for error in [bounded, open] {
        assert_eq!(
            error,
            SecurityError::DataNotFound {
                what: DataKind::History,
                secid: String::from("SBER"),
            }
        );
    }
    assert_eq!(
        provider.history_requests(),
        vec![(Some(day("2023-01-02")), Some(day("2023-01-06"))), (None, None)]
    );
    let cache = security.history_cache("SMAL").await.expect("cache exists");
    assert_eq!(cache.len(), 5);
    assert!(cache.is_gap(day("2023-01-04")));
}

// =============================================================================
// Lifecycle: Indices, Date Range and Resolution
// =============================================================================

#[tokio::test]
async fn when_indices_are_requested_they_are_never_cached() {
    let (provider, security) = sample();

    let first = security.indices().await.expect("indices");
    security.indices().await.expect("indices again");

    assert_eq!(first[0].index_id, "IMOEX");
    assert_eq!(provider.calls(Endpoint::Indices), 2);

    let gazp = Security::new(provider.clone(), "GAZP").expect("valid code");
    assert!(matches!(
        gazp.indices().await,
        Err(SecurityError::DataNotFound {
            what: DataKind::Indices,
            ..
        })
    ));
}

#[tokio::test]
async fn when_history_bounds_are_requested_first_span_is_returned() {
    let (_provider, security) = sample();

    let span = security.history_bounds().await.expect("span");

    assert_eq!(span.from, day("2023-01-02"));
    assert_eq!(span.till, day("2023-03-31"));
}

#[tokio::test]
async fn when_resolving_by_name_system_builds_entity_for_best_match() {
    let provider = Arc::new(FixtureProvider::sample());

    let security = Security::resolve(provider.clone(), "газпром").await.expect("match");

    assert_eq!(security.id().as_str(), "GAZP");
    assert_eq!(provider.calls(Endpoint::Search), 1);
    assert_eq!(provider.calls(Endpoint::Descriptor), 0);
}

// =============================================================================
// Lifecycle: Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn when_tasks_share_a_security_same_range_is_fetched_once() {
    let (provider, security) = sample();
    let security = Arc::new(security);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let security = Arc::clone(&security);
        handles.push(tokio::spawn(async move {
            security
                .history(Some(day("2023-02-01")), Some(day("2023-02-28")))
                .await
        }));
    }

    let mut lengths = Vec::new();
    for handle in handles {
        let rows = handle.await.expect("task joins").expect("history");
        lengths.push(rows.len());
    }

    assert!(lengths.iter().all(|len| *len == 20));
    assert_eq!(provider.calls(Endpoint::History), 1);
    assert_eq!(provider.calls(Endpoint::Descriptor), 1);
    let stats = security.cache_stats().await;
    assert_eq!((stats.hits, stats.misses), (7, 1));
}
