use isskit_core::{IssProvider, SecurityMatch};
use serde::Serialize;

use crate::cli::SearchArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct SearchResponseData {
    query: String,
    results: Vec<SecurityMatch>,
}

pub async fn run(args: &SearchArgs, provider: &dyn IssProvider) -> Result<CommandResult, CliError> {
    let results = isskit_core::search(provider, &args.query, args.limit).await?;

    let mut result = CommandResult::ok(serde_json::to_value(SearchResponseData {
        query: args.query.trim().to_owned(),
        results,
    })?);
    if result.data["results"].as_array().is_some_and(Vec::is_empty) {
        result = result.with_warning(format!("no securities match '{}'", args.query.trim()));
    }
    Ok(result)
}
