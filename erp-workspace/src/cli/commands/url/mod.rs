//! `url` command: decode and encode workspace query strings

pub mod handler;

use std::path::PathBuf;

use clap::Subcommand;

pub use handler::handle_url_command;

#[derive(Subcommand)]
pub enum UrlCommands {
    /// Print the windows described by a query string (or full URL)
    Decode {
        query: String,

        /// Print the windows as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Read windows from a JSON file and print the URL for them
    Encode { file: PathBuf },
}
