use std::sync::Arc;

use isskit_core::{Board, IssProvider, Security};
use serde::Serialize;

use crate::cli::SecurityArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct BoardsResponseData {
    secid: String,
    current: String,
    boards: Vec<Board>,
}

pub async fn run(args: &SecurityArgs, provider: Arc<dyn IssProvider>) -> Result<CommandResult, CliError> {
    let security = Security::new(provider, &args.secid)?;
    let boards = security.boards().await?;
    let current = security.current_board().await?;

    let data = serde_json::to_value(BoardsResponseData {
        secid: security.id().to_string(),
        current: current.board_id,
        boards,
    })?;
    Ok(CommandResult::ok(data))
}
