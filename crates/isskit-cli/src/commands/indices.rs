use std::sync::Arc;

use isskit_core::{IndexMembership, IssProvider, Security};
use serde::Serialize;

use crate::cli::SecurityArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct IndicesResponseData {
    secid: String,
    indices: Vec<IndexMembership>,
}

pub async fn run(args: &SecurityArgs, provider: Arc<dyn IssProvider>) -> Result<CommandResult, CliError> {
    let security = Security::new(provider, &args.secid)?;
    let indices = security.indices().await?;

    let data = serde_json::to_value(IndicesResponseData {
        secid: security.id().to_string(),
        indices,
    })?;
    Ok(CommandResult::ok(data))
}
