use anyhow::Result;
use clap::Parser;
use log::{debug, warn};

use erp_workspace::cli::commands::fetch::handle_fetch_command;
use erp_workspace::cli::commands::url::handle_url_command;
use erp_workspace::cli::{Cli, Commands};
use erp_workspace::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = Config::load_default()?;
    debug!(
        "Datasource: {}",
        config.datasource.base_url.as_deref().unwrap_or("(not configured)")
    );
    if !erp_workspace::init_global_config(config) {
        warn!("Config was already initialized");
    }

    match cli.command {
        Commands::Url(command) => handle_url_command(command).await,
        Commands::Fetch(args) => handle_fetch_command(args).await,
    }
}
