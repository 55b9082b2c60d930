use serde::Serialize;

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct AliasEntry {
    alias: &'static str,
    field: &'static str,
}

pub fn run() -> Result<CommandResult, CliError> {
    let aliases: Vec<AliasEntry> = isskit_core::supported_aliases()
        .iter()
        .map(|&(alias, field)| AliasEntry { alias, field })
        .collect();

    Ok(CommandResult::ok(serde_json::to_value(aliases)?))
}
