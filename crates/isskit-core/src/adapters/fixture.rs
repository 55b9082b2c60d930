use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use time::Weekday;

use crate::domain::{
    Board, DateSpan, FieldMap, FieldValue, HistoryRecord, HistoryRow, SecurityId, TradingDay,
};
use crate::provider::{
    DateRangePayload, DescriptorPayload, Endpoint, HistoryPayload, IndexMembership,
    IndicesPayload, IssProvider, MarketDataPayload, ProviderError, ProviderFuture, SearchPayload,
    SecurityMatch,
};

/// Canned data for one security served by [`FixtureProvider`].
#[derive(Debug, Clone, Default)]
pub struct FixtureSecurity {
    pub properties: Vec<(String, FieldValue)>,
    pub boards: Vec<Board>,
    pub market_rows: Vec<FieldMap>,
    /// History rows keyed by board id.
    pub history: BTreeMap<String, Vec<HistoryRecord>>,
    pub indices: Vec<IndexMembership>,
    pub dates: Vec<DateSpan>,
}

impl FixtureSecurity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.properties.push((name.into(), value.into()));
        self
    }

    pub fn with_board(mut self, board: Board) -> Self {
        self.boards.push(board);
        self
    }

    pub fn with_market_row<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.market_rows.push(
            fields
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        );
        self
    }

    pub fn with_history(mut self, board_id: impl Into<String>, rows: Vec<HistoryRecord>) -> Self {
        self.history.entry(board_id.into()).or_default().extend(rows);
        self
    }

    pub fn with_index(mut self, index: IndexMembership) -> Self {
        self.indices.push(index);
        self
    }

    pub fn with_dates(mut self, span: DateSpan) -> Self {
        self.dates.push(span);
        self
    }
}

/// In-memory [`IssProvider`] for tests and offline runs.
///
/// Unknown securities produce empty payloads. Every call is counted per
/// [`Endpoint`], and scripted failures can be queued with [`fail_next`](Self::fail_next).
#[derive(Debug, Default)]
pub struct FixtureProvider {
    securities: BTreeMap<String, FixtureSecurity>,
    calls: Mutex<HashMap<Endpoint, usize>>,
    history_requests: Mutex<Vec<(Option<TradingDay>, Option<TradingDay>)>>,
    failures: Mutex<VecDeque<ProviderError>>,
}

impl FixtureProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_security(mut self, secid: impl Into<String>, security: FixtureSecurity) -> Self {
        self.securities.insert(secid.into(), security);
        self
    }

    /// Makes the next provider call fail with `error`.
    pub fn fail_next(&self, error: ProviderError) {
        lock(&self.failures).push_back(error);
    }

    pub fn calls(&self, endpoint: Endpoint) -> usize {
        lock(&self.calls).get(&endpoint).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.calls).values().sum()
    }

    /// `(from, to)` of every history request, in call order.
    pub fn history_requests(&self) -> Vec<(Option<TradingDay>, Option<TradingDay>)> {
        lock(&self.history_requests).clone()
    }

    fn record(&self, endpoint: Endpoint) -> Result<(), ProviderError> {
        *lock(&self.calls).entry(endpoint).or_insert(0) += 1;
        match lock(&self.failures).pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn security(&self, secid: &SecurityId) -> Option<&FixtureSecurity> {
        self.securities.get(secid.as_str())
    }

    /// Deterministic two-security data set used by `isskit --mock`.
    pub fn sample() -> Self {
        let tqbr = Board::new("TQBR", "stock", "shares")
            .with_title("Т+: Акции и ДР - безадрес.")
            .primary();
        let smal = Board::new("SMAL", "stock", "shares").with_title("Т+: Неполные лоты");

        let sber = FixtureSecurity::new()
            .with_property("SECID", "SBER")
            .with_property("NAME", "Сбербанк России ПАО ао")
            .with_property("SHORTNAME", "Сбербанк")
            .with_property("ISIN", "RU0009029540")
            .with_property("LOTSIZE", 10_i64)
            .with_board(tqbr.clone())
            .with_board(smal.clone())
            .with_market_row([
                ("BOARDID", FieldValue::text("TQBR")),
                ("LAST", FieldValue::Number(270.5)),
                ("OPEN", FieldValue::Number(268.0)),
                ("LOW", FieldValue::Number(267.1)),
                ("HIGH", FieldValue::Number(271.9)),
                ("VALTODAY", FieldValue::Integer(15_400_000_000)),
                ("CHANGE", FieldValue::Number(2.4)),
                ("LASTTOPREVPRICE", FieldValue::Number(0.9)),
            ])
            .with_market_row([
                ("BOARDID", FieldValue::text("SMAL")),
                ("LAST", FieldValue::Number(270.2)),
                ("VALTODAY", FieldValue::Integer(1_200_000)),
            ])
            .with_history("TQBR", synthetic_history(140.0))
            .with_index(IndexMembership {
                index_id: String::from("IMOEX"),
                short_name: Some(String::from("Индекс МосБиржи")),
                from: TradingDay::from_ymd(2013, 3, 25).ok(),
                till: None,
            })
            .with_dates(synthetic_span());

        let gazp = FixtureSecurity::new()
            .with_property("SECID", "GAZP")
            .with_property("NAME", "\"Газпром\" (ПАО) ао")
            .with_property("SHORTNAME", "ГАЗПРОМ ао")
            .with_property("ISIN", "RU0007661625")
            .with_board(tqbr)
            .with_market_row([
                ("BOARDID", FieldValue::text("TQBR")),
                ("LAST", FieldValue::Number(162.3)),
                ("VALTODAY", FieldValue::Integer(4_100_000_000)),
            ])
            .with_history("TQBR", synthetic_history(165.0))
            .with_dates(synthetic_span());

        Self::new().with_security("SBER", sber).with_security("GAZP", gazp)
    }
}

impl IssProvider for FixtureProvider {
    fn fetch_descriptor<'a>(&'a self, secid: &'a SecurityId) -> ProviderFuture<'a, DescriptorPayload> {
        Box::pin(async move {
            self.record(Endpoint::Descriptor)?;
            Ok(self
                .security(secid)
                .map(|security| DescriptorPayload {
                    properties: security.properties.clone(),
                    boards: security.boards.clone(),
                })
                .unwrap_or_default())
        })
    }

    fn fetch_market_data<'a>(
        &'a self,
        _engine: &'a str,
        _market: &'a str,
        secid: &'a SecurityId,
    ) -> ProviderFuture<'a, MarketDataPayload> {
        Box::pin(async move {
            self.record(Endpoint::MarketData)?;
            Ok(MarketDataPayload {
                rows: self
                    .security(secid)
                    .map(|security| security.market_rows.clone())
                    .unwrap_or_default(),
            })
        })
    }

    fn fetch_history<'a>(
        &'a self,
        board: &'a Board,
        secid: &'a SecurityId,
        from: Option<TradingDay>,
        to: Option<TradingDay>,
    ) -> ProviderFuture<'a, HistoryPayload> {
        Box::pin(async move {
            self.record(Endpoint::History)?;
            lock(&self.history_requests).push((from, to));

            let mut rows: Vec<HistoryRecord> = self
                .security(secid)
                .and_then(|security| security.history.get(&board.board_id))
                .map(|rows| {
                    rows.iter()
                        .filter(|record| from.map_or(true, |from| record.trade_date >= from))
                        .filter(|record| to.map_or(true, |to| record.trade_date <= to))
                        .copied()
                        .collect()
                })
                .unwrap_or_default();
            rows.sort_by_key(|record| record.trade_date);

            Ok(HistoryPayload { rows })
        })
    }

    fn find_security<'a>(&'a self, query: &'a str, limit: usize) -> ProviderFuture<'a, SearchPayload> {
        Box::pin(async move {
            self.record(Endpoint::Search)?;
            let needle = query.trim().to_lowercase();

            let securities = self
                .securities
                .iter()
                .filter(|(secid, security)| {
                    secid.to_lowercase().contains(&needle)
                        || security.properties.iter().any(|(name, value)| {
                            matches!(name.as_str(), "NAME" | "SHORTNAME" | "ISIN")
                                && value
                                    .as_str()
                                    .is_some_and(|text| text.to_lowercase().contains(&needle))
                        })
                })
                .take(limit)
                .map(|(secid, security)| SecurityMatch {
                    secid: secid.clone(),
                    short_name: property_text(security, "SHORTNAME"),
                    name: property_text(security, "NAME"),
                    isin: property_text(security, "ISIN"),
                    primary_board: security.boards.first().map(|board| board.board_id.clone()),
                })
                .collect();

            Ok(SearchPayload { securities })
        })
    }

    fn fetch_indices<'a>(&'a self, secid: &'a SecurityId) -> ProviderFuture<'a, IndicesPayload> {
        Box::pin(async move {
            self.record(Endpoint::Indices)?;
            Ok(IndicesPayload {
                indices: self
                    .security(secid)
                    .map(|security| security.indices.clone())
                    .unwrap_or_default(),
            })
        })
    }

    fn fetch_date_range<'a>(
        &'a self,
        _board: &'a Board,
        secid: &'a SecurityId,
    ) -> ProviderFuture<'a, DateRangePayload> {
        Box::pin(async move {
            self.record(Endpoint::DateRange)?;
            Ok(DateRangePayload {
                dates: self
                    .security(secid)
                    .map(|security| security.dates.clone())
                    .unwrap_or_default(),
            })
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn property_text(security: &FixtureSecurity, name: &str) -> Option<String> {
    security
        .properties
        .iter()
        .find(|(key, _)| key == name)
        .and_then(|(_, value)| value.as_str().map(str::to_owned))
}

fn synthetic_span() -> DateSpan {
    let (from, till) = synthetic_bounds();
    DateSpan { from, till }
}

fn synthetic_bounds() -> (TradingDay, TradingDay) {
    let from = TradingDay::from_date(time::macros::date!(2023 - 01 - 02));
    let till = TradingDay::from_date(time::macros::date!(2023 - 03 - 31));
    (from, till)
}

/// Weekday-only OHLCV series for the first quarter of 2023.
fn synthetic_history(base: f64) -> Vec<HistoryRecord> {
    let (from, till) = synthetic_bounds();
    from.through(till)
        .filter(|day| !matches!(day.into_inner().weekday(), Weekday::Saturday | Weekday::Sunday))
        .enumerate()
        .map(|(index, day)| {
            let drift = (index % 7) as f64 * 0.5 - 1.5;
            let open = base + drift;
            let close = open + if index % 2 == 0 { 0.8 } else { -0.6 };
            let row = HistoryRow::new(
                open,
                open.max(close) + 0.4,
                open.min(close) - 0.4,
                close,
                1_000_000.0 + (index as f64) * 25_000.0,
            );
            HistoryRecord::new(day, row)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderErrorKind;

    fn day(raw: &str) -> TradingDay {
        TradingDay::parse(raw).expect("valid day")
    }

    #[tokio::test]
    async fn unknown_security_yields_empty_payloads() {
        let provider = FixtureProvider::sample();
        let secid = SecurityId::parse("NOPE").expect("valid");

        assert!(provider.fetch_descriptor(&secid).await.expect("ok").is_empty());
        assert!(provider
            .fetch_market_data("stock", "shares", &secid)
            .await
            .expect("ok")
            .rows
            .is_empty());
        assert_eq!(provider.calls(Endpoint::Descriptor), 1);
        assert_eq!(provider.calls(Endpoint::MarketData), 1);
    }

    #[tokio::test]
    async fn history_is_filtered_to_requested_bounds_and_skips_weekends() {
        let provider = FixtureProvider::sample();
        let secid = SecurityId::parse("SBER").expect("valid");
        let board = Board::new("TQBR", "stock", "shares");

        let payload = provider
            .fetch_history(&board, &secid, Some(day("2023-01-02")), Some(day("2023-01-08")))
            .await
            .expect("history");

        let dates: Vec<String> = payload.rows.iter().map(|r| r.trade_date.format()).collect();
        assert_eq!(
            dates,
            vec!["2023-01-02", "2023-01-03", "2023-01-04", "2023-01-05", "2023-01-06"]
        );
        assert_eq!(
            provider.history_requests(),
            vec![(Some(day("2023-01-02")), Some(day("2023-01-08")))]
        );
    }

    #[tokio::test]
    async fn scripted_failure_applies_to_next_call_only() {
        let provider = FixtureProvider::sample();
        let secid = SecurityId::parse("SBER").expect("valid");
        provider.fail_next(ProviderError::transport("boom"));

        let error = provider.fetch_descriptor(&secid).await.expect_err("must fail");
        assert_eq!(error.kind(), ProviderErrorKind::Transport);
        assert!(!provider.fetch_descriptor(&secid).await.expect("ok").is_empty());
        assert_eq!(provider.calls(Endpoint::Descriptor), 2);
    }

    #[tokio::test]
    async fn search_matches_names_case_insensitively() {
        let provider = FixtureProvider::sample();
        let hits = provider.find_security("газпром", 10).await.expect("search");
        assert_eq!(hits.securities.len(), 1);
        assert_eq!(hits.securities[0].secid, "GAZP");
    }
}
