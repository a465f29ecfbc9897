//! `fetch` command: run the record fetch engine against the HTTP datasource

pub mod handler;

use clap::Args;

pub use handler::handle_fetch_command;

#[derive(Args)]
pub struct FetchCommands {
    /// Entity to fetch
    pub entity: String,

    /// Rows per page (overrides the configured page size)
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Number of pages to load
    #[arg(long, default_value_t = 1)]
    pub pages: usize,

    /// Free-text search across the searchable columns
    #[arg(long)]
    pub search: Option<String>,

    /// Searchable columns, as NAME or NAME:KIND (text, date, numeric, boolean, select, reference)
    #[arg(long = "column", value_name = "COLUMN")]
    pub columns: Vec<String>,

    /// Column filter, as COLUMN=VALUE (repeatable)
    #[arg(long = "filter", value_name = "COLUMN=VALUE")]
    pub filters: Vec<String>,

    /// Base criterion, as FIELD=VALUE (repeatable)
    #[arg(long = "criteria", value_name = "FIELD=VALUE")]
    pub criteria: Vec<String>,

    /// Sort key; prefix with '-' for descending
    #[arg(long)]
    pub sort: Option<String>,

    /// Apply the implicit filter
    #[arg(long)]
    pub implicit: bool,

    /// Window id sent with the request
    #[arg(long)]
    pub window: Option<String>,

    /// Tab id sent with the request
    #[arg(long)]
    pub tab: Option<String>,

    /// Render as a tree
    #[arg(long)]
    pub tree: bool,

    /// Referenced table id for tree requests
    #[arg(long, requires = "tree")]
    pub referenced_table: Option<String>,

    /// Entity queried for tree nodes
    #[arg(long, requires = "tree")]
    pub tree_entity: Option<String>,

    /// Node ids to expand after loading (repeatable)
    #[arg(long = "expand", value_name = "ID", requires = "tree")]
    pub expand: Vec<String>,

    /// Print records as JSON
    #[arg(long)]
    pub json: bool,
}
