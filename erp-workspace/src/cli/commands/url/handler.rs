//! URL command handler

use std::fs;

use anyhow::{bail, Context, Result};
use colored::*;

use super::UrlCommands;
use crate::url::{decode, has_windows, MemoryHistory, UrlNavigator};
use crate::window::{WindowState, WindowStore};

pub async fn handle_url_command(command: UrlCommands) -> Result<()> {
    match command {
        UrlCommands::Decode { query, json } => decode_command(&query, json),
        UrlCommands::Encode { file } => {
            if !file.exists() {
                bail!("Windows file does not exist: {}", file.display());
            }
            let content = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read windows file: {}", file.display()))?;
            encode_command(&content)
        }
    }
}

fn decode_command(query: &str, json: bool) -> Result<()> {
    if !has_windows(query) {
        println!("{}", "No windows in URL (home route)".dimmed());
        return Ok(());
    }

    // Hydrate through the store so the output matches what the workspace would show
    let mut store = WindowStore::new();
    store.hydrate_from_url(decode(query));
    let windows = store.get_all_windows();

    if json {
        let output = serde_json::to_string_pretty(&windows).context("Failed to serialize windows")?;
        println!("{}", output);
        return Ok(());
    }

    for window in &windows {
        print_window(window);
    }
    Ok(())
}

fn print_window(window: &WindowState) {
    let marker = if window.is_active {
        "●".bright_green().to_string()
    } else {
        "○".dimmed().to_string()
    };
    let title = window.title.as_deref().unwrap_or("(untitled)");

    println!(
        "{} {} {} {}",
        marker,
        format!("#{}", window.order).dimmed(),
        window.window_identifier.bright_cyan().bold(),
        title
    );

    if let Some(record) = &window.form_record_id {
        let mode = window.form_mode.map(|m| m.as_str()).unwrap_or("-");
        println!("    form: {} ({})", record.yellow(), mode);
    }

    for (tab_id, tab) in &window.tabs {
        let selected = tab.selected_record.as_deref().unwrap_or("-");
        let mut line = format!("    tab {}: selected {}", tab_id.cyan(), selected.yellow());
        if let Some(record) = &tab.form.record_id {
            let mode = tab.form.mode.map(|m| m.as_str()).unwrap_or("-");
            line.push_str(&format!(", form {} [{}]", record.yellow(), mode));
        }
        println!("{}", line);
    }
}

fn encode_command(content: &str) -> Result<()> {
    let windows: Vec<WindowState> =
        serde_json::from_str(content).context("Failed to parse windows JSON")?;

    let base_path = crate::global_config().url.base_path.clone();
    let mut navigator = UrlNavigator::new(MemoryHistory::new("/"), base_path);
    navigator.sync(&windows);

    println!("{}", navigator.history().href());
    Ok(())
}
