use std::sync::Arc;

use isskit_core::{DateSpan, IssProvider};
use serde::Serialize;

use crate::cli::BoardArgs;
use crate::error::CliError;

use super::{open_security, CommandResult};

#[derive(Debug, Serialize)]
struct DatesResponseData {
    secid: String,
    board: String,
    #[serde(flatten)]
    span: DateSpan,
}

pub async fn run(args: &BoardArgs, provider: Arc<dyn IssProvider>) -> Result<CommandResult, CliError> {
    let security = open_security(provider, &args.secid, args.board.as_deref()).await?;
    let span = security.history_bounds().await?;
    let board = security.current_board().await?;

    let data = serde_json::to_value(DatesResponseData {
        secid: security.id().to_string(),
        board: board.board_id,
        span,
    })?;
    Ok(CommandResult::ok(data))
}
