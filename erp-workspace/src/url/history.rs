//! Browser history writer
//!
//! The codec is pure; writing the result back to the address bar belongs to
//! [`UrlNavigator`], which replaces the current history entry only when the
//! encoded query actually changed.

use log::debug;

use super::codec::{decode, encode};
use crate::window::WindowState;

/// Minimal view of the browser history the navigator writes to
pub trait History {
    /// Query string of the current entry, without the leading `?`
    fn current_query(&self) -> String;

    /// Replace the current entry with `href`
    fn replace(&mut self, href: &str);
}

/// In-memory history, used by the CLI and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    current: String,
    replacements: usize,
}

impl MemoryHistory {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            current: href.into(),
            replacements: 0,
        }
    }

    pub fn href(&self) -> &str {
        &self.current
    }

    /// Number of `replace` calls seen so far
    pub fn replacements(&self) -> usize {
        self.replacements
    }
}

impl History for MemoryHistory {
    fn current_query(&self) -> String {
        self.current
            .split_once('?')
            .map(|(_, query)| query.to_string())
            .unwrap_or_default()
    }

    fn replace(&mut self, href: &str) {
        self.current = href.to_string();
        self.replacements += 1;
    }
}

/// Keeps a [`History`] in sync with the window list
pub struct UrlNavigator<H: History> {
    history: H,
    base_path: String,
}

impl<H: History> UrlNavigator<H> {
    pub fn new(history: H, base_path: impl Into<String>) -> Self {
        Self {
            history,
            base_path: base_path.into(),
        }
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    /// Windows encoded in the current history entry
    pub fn current_windows(&self) -> Vec<WindowState> {
        decode(&self.history.current_query())
    }

    /// Link target for a query: `{base_path}?{query}`, or `/` when empty
    pub fn href(&self, query: &str) -> String {
        if query.is_empty() {
            "/".to_string()
        } else {
            format!("{}?{}", self.base_path, query)
        }
    }

    /// Write `windows` to history; returns false when the URL was already current
    pub fn sync(&mut self, windows: &[WindowState]) -> bool {
        let query = encode(windows);
        if query == self.history.current_query() {
            debug!("URL unchanged, skipping history replace");
            return false;
        }

        let href = self.href(&query);
        debug!("Replacing history entry with {}", href);
        self.history.replace(&href);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_skips_identical_query() {
        let mut navigator = UrlNavigator::new(MemoryHistory::new("/"), "/window");
        let windows = vec![WindowState::new("143_1").active().with_order(1)];

        assert!(navigator.sync(&windows));
        assert!(!navigator.sync(&windows));
        assert_eq!(navigator.history().replacements(), 1);
        assert!(navigator.history().href().starts_with("/window?w_143=active"));
    }

    #[test]
    fn test_sync_empty_goes_home() {
        let mut navigator = UrlNavigator::new(MemoryHistory::new("/window?w_1=active"), "/window");
        assert!(navigator.sync(&[]));
        assert_eq!(navigator.history().href(), "/");
    }

    #[test]
    fn test_current_windows_reads_history() {
        let navigator = UrlNavigator::new(
            MemoryHistory::new("/window?w_143=active&o_143=1"),
            "/window",
        );
        let windows = navigator.current_windows();
        assert_eq!(windows.len(), 1);
        assert!(windows[0].is_active);
    }
}
