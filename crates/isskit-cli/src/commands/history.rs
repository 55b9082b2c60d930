use std::sync::Arc;

use isskit_core::{HistoryRecord, IssProvider, TradingDay};
use serde::Serialize;

use crate::cli::HistoryArgs;
use crate::error::CliError;

use super::{open_security, CommandResult};

#[derive(Debug, Serialize)]
struct HistoryResponseData {
    secid: String,
    board: String,
    from: Option<TradingDay>,
    to: Option<TradingDay>,
    rows: Vec<HistoryRecord>,
}

pub async fn run(args: &HistoryArgs, provider: Arc<dyn IssProvider>) -> Result<CommandResult, CliError> {
    let from = args.from.as_deref().map(TradingDay::parse).transpose()?;
    let to = args.to.as_deref().map(TradingDay::parse).transpose()?;

    let security = open_security(provider, &args.secid, args.board.as_deref()).await?;
    let rows = security.history(from, to).await?;
    let board = security.current_board().await?;

    let mut result = CommandResult::ok(serde_json::to_value(HistoryResponseData {
        secid: security.id().to_string(),
        board: board.board_id,
        from,
        to,
        rows: rows
            .into_iter()
            .map(|(day, row)| HistoryRecord::new(day, row))
            .collect(),
    })?);

    if from.is_none() || to.is_none() {
        result = result.with_warning("open-ended ranges always fetch the full provider history");
    }
    Ok(result)
}
