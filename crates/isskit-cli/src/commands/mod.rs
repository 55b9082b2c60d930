mod aliases;
mod attr;
mod boards;
mod dates;
mod history;
mod indices;
mod search;
mod snapshot;

use std::sync::Arc;
use std::time::Instant;

use isskit_core::{FixtureProvider, IssAdapter, IssConfig, IssProvider, Security};
use serde_json::Value;
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::{Envelope, Metadata};

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let provider = build_provider(cli)?;
    let started = Instant::now();

    let command_result = match &cli.command {
        Command::Attr(args) => attr::run(args, provider).await?,
        Command::Boards(args) => boards::run(args, provider).await?,
        Command::Snapshot(args) => snapshot::run(args, provider).await?,
        Command::History(args) => history::run(args, provider).await?,
        Command::Search(args) => search::run(args, provider.as_ref()).await?,
        Command::Indices(args) => indices::run(args, provider).await?,
        Command::Dates(args) => dates::run(args, provider).await?,
        Command::Aliases => aliases::run()?,
    };

    let CommandResult { data, mut warnings } = command_result;

    if cli.mock {
        warnings.push(String::from("--mock serves canned data, not live ISS responses"));
    }

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let mut metadata = Metadata::new(latency_ms)?;
    for warning in warnings {
        metadata.push_warning(warning);
    }

    Ok(Envelope::new(metadata, data))
}

fn build_provider(cli: &Cli) -> Result<Arc<dyn IssProvider>, CliError> {
    if cli.mock {
        return Ok(Arc::new(FixtureProvider::sample()));
    }

    let mut config = IssConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url.as_str());
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_timeout_ms(timeout_ms);
    }
    debug!(base_url = %config.base_url, timeout_ms = config.timeout_ms, "using ISS adapter");

    Ok(Arc::new(IssAdapter::new(config)))
}

/// Builds the entity and switches to `board` when one is requested.
async fn open_security(
    provider: Arc<dyn IssProvider>,
    secid: &str,
    board: Option<&str>,
) -> Result<Security, CliError> {
    let security = Security::new(provider, secid)?;
    if let Some(board) = board {
        security.select_board(board).await?;
    }
    Ok(security)
}
