//! Command line interface

pub mod commands;

use clap::{Parser, Subcommand};

use commands::fetch::FetchCommands;
use commands::url::UrlCommands;

#[derive(Parser)]
#[command(
    name = "erp-workspace",
    version,
    about = "Inspect workspace URLs and exercise the record fetch engine"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode or encode workspace URL state
    #[command(subcommand)]
    Url(UrlCommands),

    /// Fetch records for an entity through the configured datasource
    Fetch(FetchCommands),
}
