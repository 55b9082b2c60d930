use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use isskit_core::{
    Board, FixtureProvider, HttpClient, HttpError, HttpRequest, HttpResponse,
    IssAdapter, IssConfig, IssProvider, Security, SecurityId, TradingDay,
};

const DESCRIPTOR: &str = r#"{
    "description": {
        "columns": ["name", "title", "value", "type"],
        "data": [
            ["SECID", "Код ценной бумаги", "SBER", "string"],
            ["NAME", "Полное наименование", "Сбербанк России ПАО ао", "string"],
            ["ISIN", "ISIN код", "RU0009029540", "string"],
            ["LOTSIZE", "Размер лота", "10", "number"]
        ]
    },
    "boards": {
        "columns": ["secid", "boardid", "title", "market", "engine", "is_traded", "is_primary", "currencyid"],
        "data": [["SBER", "TQBR", "Т+: Акции и ДР - безадрес.", "shares", "stock", 1, 1, "RUB"]]
    }
}"#;

const EMPTY_DESCRIPTOR: &str = r#"{
    "description": {"columns": ["name", "title", "value", "type"], "data": []},
    "boards": {"columns": ["secid", "boardid"], "data": []}
}"#;

const MARKET_DATA: &str = r#"{
    "marketdata": {
        "columns": ["SECID", "BOARDID", "LAST", "OPEN", "VALTODAY"],
        "data": [
            ["SBER", "SMAL", 270.1, 268.0, 12000],
            ["SBER", "TQBR", 270.5, 268.2, 15400000000]
        ]
    }
}"#;

const HISTORY: &str = r#"{
    "history": {
        "columns": ["BOARDID", "TRADEDATE", "OPEN", "LOW", "HIGH", "CLOSE", "VOLUME"],
        "data": [
            ["TQBR", "2023-01-02", 141.0, 140.1, 142.0, 141.5, 30000000],
            ["TQBR", "2023-01-03", 141.6, 140.3, 142.2, 141.8, 51250440],
            ["TQBR", "2023-01-04", null, null, null, null, 0],
            ["TQBR", "2023-01-06", 142.0, 141.0, 143.5, 143.1, 40000000]
        ]
    },
    "history.cursor": {"columns": ["INDEX", "TOTAL", "PAGESIZE"], "data": [[0, 4, 100]]}
}"#;

const SEARCH: &str = r#"{
    "securities": {
        "columns": ["secid", "shortname", "name", "isin", "primary_boardid"],
        "data": [
            ["SBERP", "Сбербанк-п", "Сбербанк России ПАО ап", "RU0009029557", "TQBR"],
            ["SBER", "Сбербанк", "Сбербанк России ПАО ао", "RU0009029540", "TQBR"]
        ]
    }
}"#;

const INDICES: &str = r#"{
    "indices": {"columns": ["SECID", "SHORTNAME", "FROM", "TILL"], "data": [["IMOEX", "Индекс МосБиржи", "2013-03-25", null]]}
}"#;

const DATES: &str = r#"{"dates": {"columns": ["from", "till"], "data": [["2023-01-02", "2023-03-31"]]}}"#;

/// Answers ISS requests from canned bodies chosen by URL path.
#[derive(Debug, Default)]
struct CannedIssServer {
    paths: Mutex<Vec<String>>,
}

impl CannedIssServer {
    fn body_for(path: &str) -> &'static str {
        if path.ends_with("/dates.json") {
            DATES
        } else if path.ends_with("/indices.json") {
            INDICES
        } else if path.contains("/history/") {
            HISTORY
        } else if path.contains("/engines/") {
            MARKET_DATA
        } else if path.ends_with("/securities.json") {
            SEARCH
        } else if path.ends_with("/securities/SBER.json") {
            DESCRIPTOR
        } else {
            EMPTY_DESCRIPTOR
        }
    }

    fn requests_to(&self, fragment: &str) -> usize {
        self.paths
            .lock()
            .expect("path log should not be poisoned")
            .iter()
            .filter(|path| path.contains(fragment))
            .count()
    }
}

impl HttpClient for CannedIssServer {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let body = Self::body_for(&request.url);
        self.paths
            .lock()
            .expect("path log should not be poisoned")
            .push(request.url);
        Box::pin(async move { Ok(HttpResponse::ok_json(body)) })
    }
}

struct ProviderCase {
    name: &'static str,
    provider: Arc<dyn IssProvider>,
}

fn iss_adapter(server: Arc<CannedIssServer>) -> IssAdapter {
    let config = IssConfig {
        base_url: String::from("https://iss.example.test/iss"),
        requests_per_second: 0,
        ..IssConfig::default()
    };
    IssAdapter::with_http_client(config, server)
}

fn provider_cases() -> Vec<ProviderCase> {
    vec![
        ProviderCase {
            name: "fixture",
            provider: Arc::new(FixtureProvider::sample()),
        },
        ProviderCase {
            name: "iss",
            provider: Arc::new(iss_adapter(Arc::new(CannedIssServer::default()))),
        },
    ]
}

fn sber() -> SecurityId {
    SecurityId::parse("SBER").expect("valid secid")
}

fn day(raw: &str) -> TradingDay {
    TradingDay::parse(raw).expect("valid day")
}

fn tqbr() -> Board {
    Board::new("TQBR", "stock", "shares")
}

#[tokio::test]
async fn descriptor_is_populated_for_known_and_empty_for_unknown_securities() {
    for case in provider_cases() {
        let known = case
            .provider
            .fetch_descriptor(&sber())
            .await
            .unwrap_or_else(|error| panic!("provider '{}' descriptor failed: {error}", case.name));
        assert!(!known.is_empty(), "provider '{}': properties", case.name);
        assert!(
            known.boards.iter().any(|board| board.board_id == "TQBR"),
            "provider '{}': boards",
            case.name
        );

        let unknown = case
            .provider
            .fetch_descriptor(&SecurityId::parse("NOSUCH").expect("valid"))
            .await
            .unwrap_or_else(|error| panic!("provider '{}' unknown descriptor failed: {error}", case.name));
        assert!(unknown.is_empty(), "provider '{}': unknown is empty", case.name);
    }
}

#[tokio::test]
async fn market_data_rows_carry_turnover() {
    for case in provider_cases() {
        let payload = case
            .provider
            .fetch_market_data("stock", "shares", &sber())
            .await
            .unwrap_or_else(|error| panic!("provider '{}' market data failed: {error}", case.name));

        assert!(!payload.rows.is_empty(), "provider '{}': rows", case.name);
        for row in &payload.rows {
            assert!(
                row.get("VALTODAY").and_then(|value| value.as_f64()).is_some(),
                "provider '{}': numeric VALTODAY",
                case.name
            );
        }
    }
}

#[tokio::test]
async fn history_rows_are_ascending_unique_and_within_bounds() {
    let (from, to) = (day("2023-01-02"), day("2023-01-06"));

    for case in provider_cases() {
        let payload = case
            .provider
            .fetch_history(&tqbr(), &sber(), Some(from), Some(to))
            .await
            .unwrap_or_else(|error| panic!("provider '{}' history failed: {error}", case.name));

        assert!(!payload.rows.is_empty(), "provider '{}': rows", case.name);
        for pair in payload.rows.windows(2) {
            assert!(
                pair[0].trade_date < pair[1].trade_date,
                "provider '{}': ascending unique dates",
                case.name
            );
        }
        for record in &payload.rows {
            assert!(
                record.trade_date >= from && record.trade_date <= to,
                "provider '{}': {} outside bounds",
                case.name,
                record.trade_date
            );
            assert!(record.row.high >= record.row.low, "provider '{}': high >= low", case.name);
        }
    }
}

#[tokio::test]
async fn search_respects_limit() {
    for case in provider_cases() {
        let payload = case
            .provider
            .find_security("SBER", 1)
            .await
            .unwrap_or_else(|error| panic!("provider '{}' search failed: {error}", case.name));

        assert_eq!(payload.securities.len(), 1, "provider '{}': limit", case.name);
    }
}

#[tokio::test]
async fn indices_and_date_range_are_available_for_sber() {
    for case in provider_cases() {
        let indices = case
            .provider
            .fetch_indices(&sber())
            .await
            .unwrap_or_else(|error| panic!("provider '{}' indices failed: {error}", case.name));
        assert_eq!(indices.indices[0].index_id, "IMOEX", "provider '{}'", case.name);

        let dates = case
            .provider
            .fetch_date_range(&tqbr(), &sber())
            .await
            .unwrap_or_else(|error| panic!("provider '{}' dates failed: {error}", case.name));
        assert_eq!(dates.dates[0].from, day("2023-01-02"), "provider '{}'", case.name);
    }
}

#[tokio::test]
async fn security_over_iss_adapter_caches_history_and_gaps() {
    // Given: An entity backed by the ISS adapter and a canned server
    let server = Arc::new(CannedIssServer::default());
    let provider: Arc<dyn IssProvider> = Arc::new(iss_adapter(server.clone()));
    let security = Security::new(provider, "SBER").expect("valid code");

    // When: The week is requested, then a sub-range of it
    let week = security
        .history_text(Some("2023-01-02"), Some("2023-01-06"))
        .await
        .expect("week");
    let middle = security
        .history_text(Some("2023-01-03"), Some("2023-01-05"))
        .await
        .expect("middle");

    // Then: The priceless row became a gap and the second query never hit the server
    assert_eq!(week.len(), 3);
    assert_eq!(middle.len(), 1);
    assert_eq!(server.requests_to("/history/"), 1);

    let cache = security.history_cache("TQBR").await.expect("cache exists");
    assert!(cache.is_gap(day("2023-01-04")));
    assert!(cache.is_gap(day("2023-01-05")));

    // And: Market data picks the busiest board's row
    let last = security.attribute("last price").await.expect("last price");
    assert_eq!(last.as_f64(), Some(270.5));
    assert_eq!(server.requests_to("/engines/"), 1);
}

#[tokio::test]
async fn resolve_over_iss_adapter_prefers_exact_code() {
    let server = Arc::new(CannedIssServer::default());
    let provider: Arc<dyn IssProvider> = Arc::new(iss_adapter(server.clone()));

    let security = Security::resolve(provider, "sber").await.expect("resolves");

    assert_eq!(security.id().as_str(), "SBER");
    assert_eq!(server.requests_to("/securities.json"), 1);
}
