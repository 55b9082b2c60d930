use serde::{Deserialize, Serialize};

/// Trading board of a security together with the engine and market it lives under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub board_id: String,
    pub engine: String,
    pub market: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub is_traded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl Board {
    pub fn new(
        board_id: impl Into<String>,
        engine: impl Into<String>,
        market: impl Into<String>,
    ) -> Self {
        Self {
            board_id: board_id.into(),
            engine: engine.into(),
            market: market.into(),
            title: None,
            is_primary: false,
            is_traded: true,
            currency: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn matches(&self, board_id: &str) -> bool {
        self.board_id.eq_ignore_ascii_case(board_id.trim())
    }
}
