//! Fetch command handler

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use colored::*;
use log::info;
use serde_json::Value;

use super::FetchCommands;
use crate::api::{record_id, Column, ColumnKind, Criteria, HttpDatasource, Record};
use crate::fetch::tree::{IS_PARENT_FIELD, LEVEL_FIELD};
use crate::fetch::{FetchOutcome, FetchQuery, RecordFetcher, TreeCapability, TreeMetadataCache};
use crate::window::{ColumnFilter, ColumnSort};

const DEFAULT_WINDOW: &str = "cli";

pub async fn handle_fetch_command(args: FetchCommands) -> Result<()> {
    let config = crate::global_config();

    let Some(base_url) = config.datasource.base_url.as_deref() else {
        bail!(
            "No datasource configured. Set datasource.base_url in the config file or {}",
            crate::config::BASE_URL_VAR
        );
    };
    if args.pages == 0 {
        bail!("--pages must be at least 1");
    }

    let datasource = Arc::new(HttpDatasource::new(
        base_url,
        config.datasource.token.clone(),
        config.timeout(),
    )?);

    let mut fetch_config = config.to_fetch_config();
    if let Some(page_size) = args.page_size {
        if page_size == 0 {
            bail!("--page-size must be at least 1");
        }
        fetch_config.page_size = page_size;
    }

    let window_id = args.window.clone().unwrap_or_else(|| DEFAULT_WINDOW.to_string());
    let tab_id = args.tab.clone().unwrap_or_else(|| args.entity.clone());

    let mut query = FetchQuery::new(&args.entity)
        .for_tab(&window_id, &tab_id)
        .with_columns(parse_columns(&args.columns)?)
        .with_base_criteria(parse_criteria(&args.criteria)?)
        .with_search(args.search.clone().unwrap_or_default());
    query.filters = parse_filters(&args.filters)?;
    query.sorting = args.sort.as_deref().map(parse_sort).into_iter().collect();
    query.is_implicit_filter_applied = args.implicit;

    let mut fetcher = RecordFetcher::new(datasource, fetch_config, query);

    if args.tree {
        let Some(referenced_table) = args.referenced_table.clone() else {
            bail!("--tree requires --referenced-table");
        };
        let mut metadata = TreeMetadataCache::new(config.tree_metadata_ttl());
        let capability = metadata.get_or_insert_with(&window_id, &tab_id, || {
            TreeCapability::tree(referenced_table, args.tree_entity.clone())
        });
        fetcher = fetcher.with_tree(capability);
    }

    let start = Instant::now();
    report(fetcher.load().await)?;
    for _ in 1..args.pages {
        if !fetcher.has_more_records() {
            break;
        }
        report(fetcher.fetch_more().await)?;
    }

    for node_id in &args.expand {
        fetcher
            .expand(node_id)
            .await
            .with_context(|| format!("Failed to expand node {}", node_id))?;
    }

    let rows = fetcher.displayed_records();
    info!("Fetched {} rows in {:.2?}", rows.len(), start.elapsed());

    if args.json {
        let output = serde_json::to_string_pretty(&rows).context("Failed to serialize records")?;
        println!("{}", output);
        return Ok(());
    }

    for row in &rows {
        print_row(row);
    }

    println!();
    println!(
        "{} {} (page {}{})",
        rows.len().to_string().bright_green().bold(),
        if rows.len() == 1 { "record" } else { "records" },
        fetcher.page(),
        if fetcher.has_more_records() { ", more available" } else { "" }
    );
    if !fetcher.query().is_implicit_filter_applied && args.implicit {
        println!("{}", "Implicit filter was dropped after a failed fetch".yellow());
    }
    Ok(())
}

fn report(outcome: FetchOutcome) -> Result<()> {
    match outcome {
        FetchOutcome::Failed(message) => bail!("Fetch failed: {}", message),
        FetchOutcome::Loaded {
            implicit_filter_dropped: true,
            ..
        } => {
            eprintln!("{}", "Filtered fetch failed, retried without the implicit filter".yellow());
            Ok(())
        }
        _ => Ok(()),
    }
}

fn print_row(row: &Record) {
    let level = row.get(LEVEL_FIELD).and_then(Value::as_u64).unwrap_or(0) as usize;
    let indent = "  ".repeat(level);
    let marker = match row.get(IS_PARENT_FIELD) {
        Some(Value::Bool(true)) => "▸ ",
        Some(Value::Bool(false)) => "  ",
        _ => "",
    };

    let id = record_id(row).unwrap_or_else(|| "-".to_string());
    let label = row
        .get("_identifier")
        .or_else(|| row.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("");

    println!("{}{}{} {}", indent, marker, id.bright_cyan(), label);
}

fn split_pair<'a>(raw: &'a str, what: &str) -> Result<(&'a str, &'a str)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => bail!("Invalid {} '{}', expected KEY=VALUE", what, raw),
    }
}

fn parse_filters(raw: &[String]) -> Result<Vec<ColumnFilter>> {
    raw.iter()
        .map(|entry| {
            let (column, value) = split_pair(entry, "filter")?;
            Ok(ColumnFilter::new(column, Value::String(value.to_string())))
        })
        .collect()
}

fn parse_criteria(raw: &[String]) -> Result<Vec<Criteria>> {
    raw.iter()
        .map(|entry| {
            let (field, value) = split_pair(entry, "criteria")?;
            Ok(Criteria::equals(field, value))
        })
        .collect()
}

fn parse_columns(raw: &[String]) -> Result<Vec<Column>> {
    raw.iter()
        .map(|entry| {
            let (name, kind) = entry.split_once(':').unwrap_or((entry.as_str(), "text"));
            let kind: ColumnKind = serde_json::from_value(Value::String(kind.trim().to_lowercase()))
                .with_context(|| format!("Unknown column kind in '{}'", entry))?;
            Ok(Column::new(name.trim(), kind))
        })
        .collect()
}

fn parse_sort(raw: &str) -> ColumnSort {
    match raw.strip_prefix('-') {
        Some(column) => ColumnSort::desc(column),
        None => ColumnSort::asc(raw),
    }
}
