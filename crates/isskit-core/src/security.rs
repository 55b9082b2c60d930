//! The lazily loaded security entity.
//!
//! A [`Security`] starts out knowing only its exchange code. Descriptor
//! properties, the market-data snapshot and daily history are fetched from the
//! injected [`IssProvider`] the first time something needs them, then kept for
//! the lifetime of the entity. History is cached per board, day by day.

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::accessor::{self, Resolution};
use crate::attributes::AttributeStore;
use crate::cache::{CacheMode, CacheStats, HistoryCache};
use crate::domain::{Board, DateSpan, FieldMap, FieldValue, HistoryRow, SecurityId, TradingDay};
use crate::error::{DataKind, SecurityError, ValidationError};
use crate::market::MarketSnapshot;
use crate::provider::{IndexMembership, IssProvider, SecurityMatch};

/// Candidates requested from the provider by [`Security::resolve`].
pub const RESOLVE_LIMIT: usize = 10;

pub struct Security {
    id: SecurityId,
    provider: Arc<dyn IssProvider>,
    state: Mutex<SecurityState>,
}

#[derive(Default)]
struct SecurityState {
    attributes: AttributeStore,
    snapshot: MarketSnapshot,
    history: BTreeMap<String, HistoryCache>,
}

impl Security {
    /// Creates an entity for `code` without touching the provider.
    pub fn new(provider: Arc<dyn IssProvider>, code: &str) -> Result<Self, ValidationError> {
        Ok(Self::with_id(provider, SecurityId::parse(code)?))
    }

    pub fn with_id(provider: Arc<dyn IssProvider>, id: SecurityId) -> Self {
        Self {
            id,
            provider,
            state: Mutex::new(SecurityState::default()),
        }
    }

    /// Looks `query` up by name, code or ISIN and builds an entity for the best match.
    ///
    /// An exact code match (ignoring case) wins over the provider's ranking.
    pub async fn resolve(provider: Arc<dyn IssProvider>, query: &str) -> Result<Self, SecurityError> {
        let query = query.trim();
        let candidates = search(provider.as_ref(), query, RESOLVE_LIMIT).await?;
        let chosen = candidates
            .iter()
            .find(|candidate| candidate.secid.eq_ignore_ascii_case(query))
            .or_else(|| candidates.first())
            .ok_or_else(|| SecurityError::DataNotFound {
                what: DataKind::Security,
                secid: query.to_owned(),
            })?;

        debug!(query, secid = %chosen.secid, candidates = candidates.len(), "resolved security");
        Ok(Self::new(provider, &chosen.secid)?)
    }

    pub const fn id(&self) -> &SecurityId {
        &self.id
    }

    /// Reads an attribute by name: descriptor properties first, then the
    /// market-data aliases listed by [`accessor::supported_aliases`].
    pub async fn attribute(&self, name: &str) -> Result<FieldValue, SecurityError> {
        let key = accessor::normalize(name)?;
        let mut state = self.state.lock().await;
        let SecurityState {
            attributes,
            snapshot,
            ..
        } = &mut *state;

        let loaded = attributes.ensure_loaded(self.provider.as_ref(), &self.id).await?;
        match accessor::resolve(&key, loaded.properties())? {
            Resolution::Descriptor(value) => Ok(value),
            Resolution::MarketField(field) => {
                let board = loaded.current_board(&self.id)?;
                let row = snapshot
                    .ensure_loaded(self.provider.as_ref(), board, &self.id)
                    .await?;
                Ok(row.get(field).cloned().unwrap_or_default())
            }
        }
    }

    pub async fn properties(&self) -> Result<FieldMap, SecurityError> {
        let mut state = self.state.lock().await;
        let loaded = state
            .attributes
            .ensure_loaded(self.provider.as_ref(), &self.id)
            .await?;
        Ok(loaded.properties().clone())
    }

    pub async fn boards(&self) -> Result<Vec<Board>, SecurityError> {
        let mut state = self.state.lock().await;
        let loaded = state
            .attributes
            .ensure_loaded(self.provider.as_ref(), &self.id)
            .await?;
        Ok(loaded.boards().to_vec())
    }

    pub async fn current_board(&self) -> Result<Board, SecurityError> {
        let mut state = self.state.lock().await;
        let loaded = state
            .attributes
            .ensure_loaded(self.provider.as_ref(), &self.id)
            .await?;
        loaded.current_board(&self.id).cloned()
    }

    /// Switches the current board. The market snapshot is dropped when the
    /// board changes; cached history of every board is kept.
    pub async fn select_board(&self, board_id: &str) -> Result<Board, SecurityError> {
        let mut state = self.state.lock().await;
        let SecurityState {
            attributes,
            snapshot,
            ..
        } = &mut *state;

        let loaded = attributes.ensure_loaded(self.provider.as_ref(), &self.id).await?;
        if loaded.select_board(board_id.trim(), &self.id)? {
            snapshot.invalidate();
            info!(secid = %self.id, board = board_id, "switched board");
        }
        loaded.current_board(&self.id).cloned()
    }

    /// The market-data row for the current board, fetched on first use.
    pub async fn market_data(&self) -> Result<FieldMap, SecurityError> {
        let mut state = self.state.lock().await;
        let SecurityState {
            attributes,
            snapshot,
            ..
        } = &mut *state;

        let loaded = attributes.ensure_loaded(self.provider.as_ref(), &self.id).await?;
        let board = loaded.current_board(&self.id)?;
        snapshot
            .ensure_loaded(self.provider.as_ref(), board, &self.id)
            .await
            .cloned()
    }

    /// Re-fetches market data. History is never touched.
    pub async fn refresh(&self) -> Result<FieldMap, SecurityError> {
        let mut state = self.state.lock().await;
        let SecurityState {
            attributes,
            snapshot,
            ..
        } = &mut *state;

        let loaded = attributes.ensure_loaded(self.provider.as_ref(), &self.id).await?;
        let board = loaded.current_board(&self.id)?;
        snapshot
            .refresh(self.provider.as_ref(), board, &self.id)
            .await
            .cloned()
    }

    /// Daily history of the current board for `[from, to]`, oldest first.
    ///
    /// When the provider has no rows for the range the call fails with
    /// [`DataKind::History`]; the days of a bounded range are still recorded
    /// as gaps, so asking again is answered from the cache with no rows.
    pub async fn history(
        &self,
        from: Option<TradingDay>,
        to: Option<TradingDay>,
    ) -> Result<Vec<(TradingDay, HistoryRow)>, SecurityError> {
        self.history_with_mode(from, to, CacheMode::Use).await
    }

    /// Like [`Security::history`] with `YYYY-MM-DD` bounds.
    pub async fn history_text(
        &self,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Vec<(TradingDay, HistoryRow)>, SecurityError> {
        let from = from.map(TradingDay::parse).transpose()?;
        let to = to.map(TradingDay::parse).transpose()?;
        self.history(from, to).await
    }

    pub async fn history_with_mode(
        &self,
        from: Option<TradingDay>,
        to: Option<TradingDay>,
        mode: CacheMode,
    ) -> Result<Vec<(TradingDay, HistoryRow)>, SecurityError> {
        let bounds = from.zip(to);
        if let Some((from, to)) = bounds {
            if from > to {
                return Err(ValidationError::InvertedRange {
                    from: from.to_string(),
                    to: to.to_string(),
                }
                .into());
            }
        }

        let mut state = self.state.lock().await;
        let SecurityState {
            attributes,
            history,
            ..
        } = &mut *state;

        let loaded = attributes.ensure_loaded(self.provider.as_ref(), &self.id).await?;
        let board = loaded.current_board(&self.id)?;
        let cache = history.entry(board.board_id.clone()).or_default();

        if let (true, Some((from, to))) = (mode.reads(), bounds) {
            if let Some(rows) = cache.lookup(from, to) {
                debug!(secid = %self.id, board = %board.board_id, %from, %to, rows = rows.len(), "history cache hit");
                return Ok(rows);
            }
            debug!(secid = %self.id, board = %board.board_id, %from, %to, "history cache miss");
        }

        let payload = self
            .provider
            .fetch_history(board, &self.id, from, to)
            .await?;

        let rows = if mode.writes() {
            let rows = cache.merge(&payload.rows, bounds);
            info!(
                secid = %self.id,
                board = %board.board_id,
                fetched = rows.len(),
                cached_days = cache.len(),
                "merged history into cache"
            );
            rows
        } else {
            HistoryCache::requested(&payload.rows, bounds)
        };

        if rows.is_empty() {
            return Err(SecurityError::not_found(DataKind::History, &self.id));
        }
        Ok(rows)
    }

    /// Index memberships; always fetched fresh.
    pub async fn indices(&self) -> Result<Vec<IndexMembership>, SecurityError> {
        let payload = self.provider.fetch_indices(&self.id).await?;
        if payload.indices.is_empty() {
            return Err(SecurityError::not_found(DataKind::Indices, &self.id));
        }
        Ok(payload.indices)
    }

    /// First and last trade dates with history on the current board.
    pub async fn history_bounds(&self) -> Result<DateSpan, SecurityError> {
        let mut state = self.state.lock().await;
        let loaded = state
            .attributes
            .ensure_loaded(self.provider.as_ref(), &self.id)
            .await?;
        let board = loaded.current_board(&self.id)?;

        let payload = self.provider.fetch_date_range(board, &self.id).await?;
        payload
            .dates
            .into_iter()
            .next()
            .ok_or_else(|| SecurityError::not_found(DataKind::DateRange, &self.id))
    }

    /// Hit/miss counters summed over every board's history cache.
    pub async fn cache_stats(&self) -> CacheStats {
        let state = self.state.lock().await;
        state
            .history
            .values()
            .map(HistoryCache::stats)
            .fold(CacheStats::default(), |total, stats| CacheStats {
                hits: total.hits + stats.hits,
                misses: total.misses + stats.misses,
            })
    }

    /// Copy of the history cache kept for `board_id`, if any history was queried there.
    pub async fn history_cache(&self, board_id: &str) -> Option<HistoryCache> {
        let state = self.state.lock().await;
        state
            .history
            .iter()
            .find(|(id, _)| id.eq_ignore_ascii_case(board_id))
            .map(|(_, cache)| cache.clone())
    }
}

impl Debug for Security {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Security")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Candidate securities for a free-text query, in provider order.
pub async fn search(
    provider: &dyn IssProvider,
    query: &str,
    limit: usize,
) -> Result<Vec<SecurityMatch>, SecurityError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ValidationError::EmptyQuery.into());
    }
    if limit == 0 {
        return Err(ValidationError::ZeroLimit.into());
    }

    let payload = provider.find_security(query, limit).await?;
    debug!(query, matches = payload.securities.len(), "security search");
    Ok(payload.securities)
}
