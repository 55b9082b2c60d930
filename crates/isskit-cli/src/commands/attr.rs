use std::sync::Arc;

use isskit_core::{FieldValue, IssProvider};
use serde::Serialize;

use crate::cli::AttrArgs;
use crate::error::CliError;

use super::{open_security, CommandResult};

#[derive(Debug, Serialize)]
struct AttributeValue {
    name: String,
    value: FieldValue,
}

#[derive(Debug, Serialize)]
struct AttrResponseData {
    secid: String,
    board: String,
    attributes: Vec<AttributeValue>,
}

pub async fn run(args: &AttrArgs, provider: Arc<dyn IssProvider>) -> Result<CommandResult, CliError> {
    let security = open_security(provider, &args.secid, args.board.as_deref()).await?;

    let mut attributes = Vec::with_capacity(args.names.len());
    for name in &args.names {
        let value = security.attribute(name).await?;
        attributes.push(AttributeValue {
            name: name.clone(),
            value,
        });
    }

    let board = security.current_board().await?;
    let data = serde_json::to_value(AttrResponseData {
        secid: security.id().to_string(),
        board: board.board_id,
        attributes,
    })?;
    Ok(CommandResult::ok(data))
}
