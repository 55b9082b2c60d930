//! CLI argument definitions for isskit.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `attr` | Read attributes by name (descriptor or market data) |
//! | `boards` | List boards and the current one |
//! | `snapshot` | Current market-data row |
//! | `history` | Daily OHLCV history |
//! | `search` | Find securities by code, name or ISIN |
//! | `indices` | Index memberships |
//! | `dates` | Available history date span |
//! | `aliases` | Supported market-data attribute aliases |
//!
//! # Examples
//!
//! ```bash
//! isskit attr SBER "last price" isin
//! isskit history SBER --from 2023-01-02 --to 2023-01-06 --pretty
//! isskit --mock search газпром
//! ```

use clap::{Args, Parser, Subcommand};

/// Query the MOEX information service from the command line.
#[derive(Debug, Parser)]
#[command(name = "isskit", author, version, about = "MOEX ISS security data CLI")]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Serve canned data instead of calling the ISS.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    /// ISS base URL.
    #[arg(long, global = true, env = "ISSKIT_BASE_URL")]
    pub base_url: Option<String>,

    /// Request timeout in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Read one or more attributes of a security.
    Attr(AttrArgs),
    /// List the boards a security trades on.
    Boards(SecurityArgs),
    /// Show the market-data row of the current board.
    Snapshot(BoardArgs),
    /// Show daily history.
    History(HistoryArgs),
    /// Search securities.
    Search(SearchArgs),
    /// List index memberships.
    Indices(SecurityArgs),
    /// Show the first and last dates with history.
    Dates(BoardArgs),
    /// List market-data attribute aliases.
    Aliases,
}

#[derive(Debug, Args)]
pub struct SecurityArgs {
    /// Exchange security code, e.g. SBER.
    pub secid: String,
}

#[derive(Debug, Args)]
pub struct BoardArgs {
    pub secid: String,

    /// Board to use instead of the primary one.
    #[arg(long)]
    pub board: Option<String>,
}

#[derive(Debug, Args)]
pub struct AttrArgs {
    pub secid: String,

    /// Attribute names, e.g. ISIN or "last price".
    #[arg(required = true)]
    pub names: Vec<String>,

    #[arg(long)]
    pub board: Option<String>,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    pub secid: String,

    /// First day, YYYY-MM-DD.
    #[arg(long)]
    pub from: Option<String>,

    /// Last day, YYYY-MM-DD.
    #[arg(long)]
    pub to: Option<String>,

    #[arg(long)]
    pub board: Option<String>,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    pub query: String,

    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}
