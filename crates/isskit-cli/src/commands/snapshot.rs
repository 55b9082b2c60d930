use std::sync::Arc;

use isskit_core::{FieldMap, IssProvider};
use serde::Serialize;

use crate::cli::BoardArgs;
use crate::error::CliError;

use super::{open_security, CommandResult};

#[derive(Debug, Serialize)]
struct SnapshotResponseData {
    secid: String,
    board: String,
    fields: FieldMap,
}

pub async fn run(args: &BoardArgs, provider: Arc<dyn IssProvider>) -> Result<CommandResult, CliError> {
    let security = open_security(provider, &args.secid, args.board.as_deref()).await?;
    let fields = security.market_data().await?;
    let board = security.current_board().await?;

    let data = serde_json::to_value(SnapshotResponseData {
        secid: security.id().to_string(),
        board: board.board_id,
        fields,
    })?;
    Ok(CommandResult::ok(data))
}
