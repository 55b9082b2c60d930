//! Descriptor properties and boards of a security, loaded once on first use.

use tracing::info;

use crate::domain::{Board, FieldMap, FieldValue, SecurityId};
use crate::error::{DataKind, SecurityError, ValidationError};
use crate::provider::IssProvider;

#[derive(Debug, Clone, Default)]
pub enum AttributeStore {
    #[default]
    Unloaded,
    Loaded(LoadedAttributes),
}

#[derive(Debug, Clone)]
pub struct LoadedAttributes {
    properties: FieldMap,
    boards: Vec<Board>,
    current: usize,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Fetches the descriptor unless it is already loaded.
    ///
    /// A failed load leaves the store unloaded so the next access retries.
    pub async fn ensure_loaded(
        &mut self,
        provider: &dyn IssProvider,
        secid: &SecurityId,
    ) -> Result<&mut LoadedAttributes, SecurityError> {
        if let Self::Unloaded = self {
            let payload = provider.fetch_descriptor(secid).await?;
            if payload.is_empty() {
                return Err(SecurityError::not_found(DataKind::Descriptor, secid));
            }

            let properties: FieldMap = payload
                .properties
                .into_iter()
                .map(|(name, value)| (name.trim().to_ascii_uppercase(), value))
                .collect();
            info!(
                secid = %secid,
                properties = properties.len(),
                boards = payload.boards.len(),
                "loaded security descriptor"
            );
            *self = Self::Loaded(LoadedAttributes {
                properties,
                boards: payload.boards,
                current: 0,
            });
        }

        match self {
            Self::Loaded(loaded) => Ok(loaded),
            Self::Unloaded => Err(SecurityError::not_found(DataKind::Descriptor, secid)),
        }
    }
}

impl LoadedAttributes {
    pub const fn properties(&self) -> &FieldMap {
        &self.properties
    }

    /// Case-insensitive descriptor lookup.
    pub fn property(&self, name: &str) -> Option<&FieldValue> {
        self.properties.get(&name.to_ascii_uppercase())
    }

    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    pub fn current_board(&self, secid: &SecurityId) -> Result<&Board, SecurityError> {
        self.boards
            .get(self.current)
            .ok_or_else(|| SecurityError::not_found(DataKind::Boards, secid))
    }

    /// Makes `board_id` current. Returns whether the current board changed.
    pub fn select_board(&mut self, board_id: &str, secid: &SecurityId) -> Result<bool, SecurityError> {
        let index = self
            .boards
            .iter()
            .position(|board| board.matches(board_id))
            .ok_or_else(|| ValidationError::UnknownBoard {
                board: board_id.to_owned(),
                secid: secid.to_string(),
            })?;

        let changed = index != self.current;
        self.current = index;
        Ok(changed)
    }
}
