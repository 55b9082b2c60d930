//! Live market-data row for the current board.

use tracing::{debug, info};

use crate::domain::{Board, FieldMap, FieldValue, SecurityId};
use crate::error::{DataKind, SecurityError};
use crate::provider::IssProvider;

/// At most one selected market-data row, replaced on refresh.
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    row: Option<FieldMap>,
}

impl MarketSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn is_loaded(&self) -> bool {
        self.row.is_some()
    }

    pub const fn row(&self) -> Option<&FieldMap> {
        self.row.as_ref()
    }

    /// Missing fields read as [`FieldValue::Null`].
    pub fn field(&self, name: &str) -> FieldValue {
        self.row
            .as_ref()
            .and_then(|row| row.get(name))
            .cloned()
            .unwrap_or_default()
    }

    pub fn invalidate(&mut self) {
        self.row = None;
    }

    pub async fn ensure_loaded(
        &mut self,
        provider: &dyn IssProvider,
        board: &Board,
        secid: &SecurityId,
    ) -> Result<&FieldMap, SecurityError> {
        if self.row.is_none() {
            self.refresh(provider, board, secid).await?;
        }
        self.row
            .as_ref()
            .ok_or_else(|| SecurityError::not_found(DataKind::MarketData, secid))
    }

    /// Always re-fetches. The previous row survives a failed fetch.
    pub async fn refresh(
        &mut self,
        provider: &dyn IssProvider,
        board: &Board,
        secid: &SecurityId,
    ) -> Result<&FieldMap, SecurityError> {
        let payload = provider
            .fetch_market_data(&board.engine, &board.market, secid)
            .await?;
        debug!(secid = %secid, rows = payload.rows.len(), "market data fetched");

        let row = select_row(payload.rows)
            .ok_or_else(|| SecurityError::not_found(DataKind::MarketData, secid))?;
        let row: FieldMap = row
            .into_iter()
            .map(|(name, value)| (name.to_ascii_uppercase(), value))
            .collect();
        info!(secid = %secid, board = %board.board_id, fields = row.len(), "market snapshot loaded");

        Ok(self.row.insert(row))
    }
}

/// Picks the row with the largest numeric `VALTODAY`; the first row wins ties.
pub fn select_row(rows: Vec<FieldMap>) -> Option<FieldMap> {
    let mut best: Option<(Option<f64>, FieldMap)> = None;
    for row in rows {
        let turnover = turnover(&row);
        let better = match &best {
            None => true,
            Some((current, _)) => match (turnover, *current) {
                (Some(candidate), Some(current)) => candidate > current,
                (Some(_), None) => true,
                (None, _) => false,
            },
        };
        if better {
            best = Some((turnover, row));
        }
    }
    best.map(|(_, row)| row)
}

fn turnover(row: &FieldMap) -> Option<f64> {
    row.iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("VALTODAY"))
        .and_then(|(_, value)| value.as_f64())
}
