//! Navigation and record-fetch engine for a multi-window ERP workspace
//!
//! - [`url`] encodes the open windows into a shareable query string and back
//! - [`window`] holds the window/tab state store and its provider scope
//! - [`persistence`] is the per-tab table state facade over the store
//! - [`reconcile`] cascades a parent tab's selection change to its children
//! - [`fetch`] loads records per tab, with pagination, caching and tree mode
//! - [`api`] defines the datasource contract and its HTTP implementation

pub mod api;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod persistence;
pub mod reconcile;
pub mod url;
pub mod window;

use once_cell::sync::OnceCell;

use config::Config;

static CONFIG: OnceCell<Config> = OnceCell::new();

/// Install the process-wide config; returns false if one was already set
pub fn init_global_config(config: Config) -> bool {
    CONFIG.set(config).is_ok()
}

/// Process-wide config, defaults until [`init_global_config`] runs
pub fn global_config() -> &'static Config {
    CONFIG.get_or_init(Config::default)
}
