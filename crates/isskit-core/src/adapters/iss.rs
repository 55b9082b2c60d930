use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::config::IssConfig;
use crate::domain::{
    Board, DateSpan, FieldMap, FieldValue, HistoryRecord, HistoryRow, SecurityId, TradingDay,
};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, ReqwestHttpClient};
use crate::provider::{
    DateRangePayload, DescriptorPayload, Endpoint, HistoryPayload, IndexMembership,
    IndicesPayload, IssProvider, MarketDataPayload, ProviderError, ProviderFuture, SearchPayload,
    SecurityMatch,
};
use crate::throttling::RequestThrottle;

/// [`IssProvider`] backed by the MOEX ISS JSON API.
#[derive(Clone)]
pub struct IssAdapter {
    config: IssConfig,
    http_client: Arc<dyn HttpClient>,
    auth: HttpAuth,
    circuit_breaker: Arc<CircuitBreaker>,
    throttle: RequestThrottle,
}

impl IssAdapter {
    pub fn new(config: IssConfig) -> Self {
        Self::with_http_client(config, Arc::new(ReqwestHttpClient::new()))
    }

    pub fn with_http_client(config: IssConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            auth: config.auth(),
            circuit_breaker: Arc::new(CircuitBreaker::new(config.circuit_breaker)),
            throttle: RequestThrottle::per_second(config.requests_per_second),
            config,
            http_client,
        }
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    pub fn config(&self) -> &IssConfig {
        &self.config
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    fn request(&self, path: &str) -> HttpRequest {
        HttpRequest::get(format!("{}{path}", self.config.base_url))
            .with_query("iss.meta", "off")
            .with_auth(&self.auth)
            .with_timeout_ms(self.config.timeout_ms)
    }

    async fn fetch_blocks(
        &self,
        endpoint: Endpoint,
        request: HttpRequest,
    ) -> Result<IssBlocks, ProviderError> {
        if !self.circuit_breaker.allow_request() {
            return Err(ProviderError::circuit_open(endpoint));
        }

        self.throttle.acquire().await;
        debug!(%endpoint, url = %request.full_url(), "iss request");

        let response = self.http_client.execute(request).await.map_err(|error| {
            self.circuit_breaker.record_failure();
            if error.retryable() {
                ProviderError::transport(format!("iss transport error: {}", error.message()))
            } else {
                ProviderError::invalid_request(format!("iss transport error: {}", error.message()))
            }
        })?;

        if !response.is_success() {
            self.circuit_breaker.record_failure();
            return Err(ProviderError::status(endpoint, response.status));
        }

        self.circuit_breaker.record_success();
        IssBlocks::decode(endpoint, &response.body)
    }

    async fn descriptor(&self, secid: &SecurityId) -> Result<DescriptorPayload, ProviderError> {
        let request = self
            .request(&format!("/securities/{}.json", encode(secid.as_str())))
            .with_query("iss.only", "description,boards");
        let mut blocks = self.fetch_blocks(Endpoint::Descriptor, request).await?;

        let properties = blocks
            .take_rows("description")
            .into_iter()
            .filter_map(descriptor_property)
            .collect();
        let boards = blocks
            .take_rows("boards")
            .into_iter()
            .filter_map(board_from_row)
            .collect();

        Ok(DescriptorPayload { properties, boards })
    }

    async fn market_data(
        &self,
        engine: &str,
        market: &str,
        secid: &SecurityId,
    ) -> Result<MarketDataPayload, ProviderError> {
        let request = self
            .request(&format!(
                "/engines/{}/markets/{}/securities/{}.json",
                encode(engine),
                encode(market),
                encode(secid.as_str())
            ))
            .with_query("iss.only", "marketdata");
        let mut blocks = self.fetch_blocks(Endpoint::MarketData, request).await?;

        Ok(MarketDataPayload {
            rows: blocks.take_rows("marketdata"),
        })
    }

    async fn history(
        &self,
        board: &Board,
        secid: &SecurityId,
        from: Option<TradingDay>,
        to: Option<TradingDay>,
    ) -> Result<HistoryPayload, ProviderError> {
        let path = format!(
            "/history/engines/{}/markets/{}/boards/{}/securities/{}.json",
            encode(&board.engine),
            encode(&board.market),
            encode(&board.board_id),
            encode(secid.as_str())
        );

        let page_limit = self.config.history_page_limit.max(1);
        let mut rows = Vec::new();
        let mut start = 0_u64;
        for _ in 0..page_limit {
            let mut request = self
                .request(&path)
                .with_query("iss.only", "history,history.cursor")
                .with_query("start", start);
            if let Some(from) = from {
                request = request.with_query("from", from);
            }
            if let Some(to) = to {
                request = request.with_query("till", to);
            }

            let mut blocks = self.fetch_blocks(Endpoint::History, request).await?;
            let page = blocks.take_rows("history");
            let page_len = page.len() as u64;
            rows.extend(page.into_iter().filter_map(history_record));

            match blocks.take_rows("history.cursor").first().and_then(Cursor::from_row) {
                Some(cursor) if cursor.next_start() < cursor.total && page_len > 0 => {
                    start = cursor.next_start();
                }
                _ => return Ok(HistoryPayload { rows }),
            }
        }

        warn!(
            %secid,
            pages = page_limit,
            fetched = rows.len(),
            "iss history pagination limit reached"
        );
        Err(ProviderError::truncated(Endpoint::History, page_limit))
    }

    async fn search(&self, query: &str, limit: usize) -> Result<SearchPayload, ProviderError> {
        let request = self
            .request("/securities.json")
            .with_query("iss.only", "securities")
            .with_query("q", query)
            .with_query("limit", limit);
        let mut blocks = self.fetch_blocks(Endpoint::Search, request).await?;

        let securities = blocks
            .take_rows("securities")
            .into_iter()
            .filter_map(|row| {
                Some(SecurityMatch {
                    secid: text(&row, "SECID")?,
                    short_name: text(&row, "SHORTNAME"),
                    name: text(&row, "NAME"),
                    isin: text(&row, "ISIN"),
                    primary_board: text(&row, "PRIMARY_BOARDID"),
                })
            })
            .take(limit)
            .collect();

        Ok(SearchPayload { securities })
    }

    async fn indices(&self, secid: &SecurityId) -> Result<IndicesPayload, ProviderError> {
        let request = self.request(&format!("/securities/{}/indices.json", encode(secid.as_str())));
        let mut blocks = self.fetch_blocks(Endpoint::Indices, request).await?;

        let indices = blocks
            .take_rows("indices")
            .into_iter()
            .filter_map(|row| {
                Some(IndexMembership {
                    index_id: text(&row, "SECID")?,
                    short_name: text(&row, "SHORTNAME"),
                    from: day(&row, "FROM"),
                    till: day(&row, "TILL"),
                })
            })
            .collect();

        Ok(IndicesPayload { indices })
    }

    async fn date_range(
        &self,
        board: &Board,
        secid: &SecurityId,
    ) -> Result<DateRangePayload, ProviderError> {
        let request = self.request(&format!(
            "/history/engines/{}/markets/{}/boards/{}/securities/{}/dates.json",
            encode(&board.engine),
            encode(&board.market),
            encode(&board.board_id),
            encode(secid.as_str())
        ));
        let mut blocks = self.fetch_blocks(Endpoint::DateRange, request).await?;

        let dates = blocks
            .take_rows("dates")
            .into_iter()
            .filter_map(|row| {
                Some(DateSpan {
                    from: day(&row, "FROM")?,
                    till: day(&row, "TILL")?,
                })
            })
            .collect();

        Ok(DateRangePayload { dates })
    }
}

impl IssProvider for IssAdapter {
    fn fetch_descriptor<'a>(&'a self, secid: &'a SecurityId) -> ProviderFuture<'a, DescriptorPayload> {
        Box::pin(self.descriptor(secid))
    }

    fn fetch_market_data<'a>(
        &'a self,
        engine: &'a str,
        market: &'a str,
        secid: &'a SecurityId,
    ) -> ProviderFuture<'a, MarketDataPayload> {
        Box::pin(self.market_data(engine, market, secid))
    }

    fn fetch_history<'a>(
        &'a self,
        board: &'a Board,
        secid: &'a SecurityId,
        from: Option<TradingDay>,
        to: Option<TradingDay>,
    ) -> ProviderFuture<'a, HistoryPayload> {
        Box::pin(self.history(board, secid, from, to))
    }

    fn find_security<'a>(&'a self, query: &'a str, limit: usize) -> ProviderFuture<'a, SearchPayload> {
        Box::pin(async move {
            if query.trim().is_empty() {
                return Err(ProviderError::invalid_request("iss search query must not be empty"));
            }
            self.search(query.trim(), limit).await
        })
    }

    fn fetch_indices<'a>(&'a self, secid: &'a SecurityId) -> ProviderFuture<'a, IndicesPayload> {
        Box::pin(self.indices(secid))
    }

    fn fetch_date_range<'a>(
        &'a self,
        board: &'a Board,
        secid: &'a SecurityId,
    ) -> ProviderFuture<'a, DateRangePayload> {
        Box::pin(self.date_range(board, secid))
    }
}

// ============================================================================
// ISS block decoding
// ============================================================================

/// ISS table: `{"columns": [...], "data": [[...], ...]}`.
#[derive(Debug, Deserialize)]
struct IssBlock {
    columns: Vec<String>,
    data: Vec<Vec<Value>>,
}

impl IssBlock {
    fn into_rows(self) -> Vec<FieldMap> {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|column| column.to_ascii_uppercase())
            .collect();

        self.data
            .into_iter()
            .map(|values| {
                columns
                    .iter()
                    .cloned()
                    .zip(values.into_iter().map(FieldValue::from))
                    .collect()
            })
            .collect()
    }
}

#[derive(Debug)]
struct IssBlocks(BTreeMap<String, IssBlock>);

impl IssBlocks {
    fn decode(endpoint: Endpoint, body: &str) -> Result<Self, ProviderError> {
        serde_json::from_str(body).map(Self).map_err(|error| {
            ProviderError::decode(format!("failed to parse iss {endpoint} response: {error}"))
        })
    }

    /// Rows of the named block; a block ISS left out reads as empty.
    fn take_rows(&mut self, name: &str) -> Vec<FieldMap> {
        self.0
            .remove(name)
            .map(IssBlock::into_rows)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy)]
struct Cursor {
    index: u64,
    total: u64,
    page_size: u64,
}

impl Cursor {
    fn from_row(row: &FieldMap) -> Option<Self> {
        Some(Self {
            index: unsigned(row, "INDEX")?,
            total: unsigned(row, "TOTAL")?,
            page_size: unsigned(row, "PAGESIZE").filter(|size| *size > 0)?,
        })
    }

    fn next_start(self) -> u64 {
        self.index.saturating_add(self.page_size)
    }
}

fn descriptor_property(row: FieldMap) -> Option<(String, FieldValue)> {
    let name = text(&row, "NAME")?;
    let value = row.get("VALUE").cloned().unwrap_or_default();
    let value = match (row.get("TYPE").and_then(FieldValue::as_str), &value) {
        (Some("number"), FieldValue::Text(raw)) => FieldValue::parse_number(raw),
        _ => value,
    };
    Some((name, value))
}

fn board_from_row(row: FieldMap) -> Option<Board> {
    let (Some(board_id), Some(engine), Some(market)) = (
        text(&row, "BOARDID"),
        text(&row, "ENGINE"),
        text(&row, "MARKET"),
    ) else {
        warn!(?row, "skipping iss board row without boardid/engine/market");
        return None;
    };

    Some(Board {
        board_id,
        engine,
        market,
        title: text(&row, "TITLE"),
        is_primary: flag(&row, "IS_PRIMARY"),
        is_traded: flag(&row, "IS_TRADED"),
        currency: text(&row, "CURRENCYID"),
    })
}

fn history_record(row: FieldMap) -> Option<HistoryRecord> {
    let Some(trade_date) = day(&row, "TRADEDATE") else {
        warn!(?row, "skipping iss history row without a valid TRADEDATE");
        return None;
    };

    let number = |field: &str| row.get(field).and_then(FieldValue::as_f64);
    match (
        number("OPEN"),
        number("HIGH"),
        number("LOW"),
        number("CLOSE"),
    ) {
        (Some(open), Some(high), Some(low), Some(close)) => {
            let volume = number("VOLUME").unwrap_or(0.0);
            Some(HistoryRecord::new(
                trade_date,
                HistoryRow::new(open, high, low, close, volume),
            ))
        }
        _ => {
            debug!(%trade_date, "iss history row without prices treated as no-trade day");
            None
        }
    }
}

fn text(row: &FieldMap, field: &str) -> Option<String> {
    match row.get(field)? {
        FieldValue::Text(value) if !value.trim().is_empty() => Some(value.clone()),
        FieldValue::Integer(value) => Some(value.to_string()),
        _ => None,
    }
}

fn day(row: &FieldMap, field: &str) -> Option<TradingDay> {
    row.get(field)
        .and_then(FieldValue::as_str)
        .and_then(|raw| TradingDay::parse(raw).ok())
}

fn flag(row: &FieldMap, field: &str) -> bool {
    row.get(field)
        .and_then(FieldValue::as_f64)
        .is_some_and(|value| value != 0.0)
}

fn unsigned(row: &FieldMap, field: &str) -> Option<u64> {
    match row.get(field)? {
        FieldValue::Integer(value) => u64::try_from(*value).ok(),
        _ => None,
    }
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
