//! Window, tab, table and form state types
//!
//! These are the plain data types held by the window store and serialized into
//! the browser URL. Every type is cheap to clone; the store hands out clones so
//! callers can never mutate state behind the setters.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::identifiers::window_id_from_identifier;

/// Sentinel record id used while a record is being created
pub const NEW_RECORD_ID: &str = "new";

/// Display mode of a tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabMode {
    #[default]
    Table,
    Form,
}

impl TabMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TabMode::Table => "table",
            TabMode::Form => "form",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "table" => Some(TabMode::Table),
            "form" => Some(TabMode::Form),
            _ => None,
        }
    }
}

/// Interaction mode of a record form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormMode {
    New,
    Edit,
    View,
}

impl FormMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormMode::New => "new",
            FormMode::Edit => "edit",
            FormMode::View => "view",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new" => Some(FormMode::New),
            "edit" => Some(FormMode::Edit),
            "view" => Some(FormMode::View),
            _ => None,
        }
    }

    /// Form mode implied by a record id: `new` for the sentinel, `edit` otherwise
    pub fn for_record(record_id: &str) -> Self {
        if record_id == NEW_RECORD_ID {
            FormMode::New
        } else {
            FormMode::Edit
        }
    }
}

/// Form pointer of a tab. An empty value means "not in form view".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabFormState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<TabMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_mode: Option<FormMode>,
}

impl TabFormState {
    /// Build a form pointer for a record.
    ///
    /// `mode` defaults to [`TabMode::Form`]; `form_mode` defaults to `new` for
    /// the [`NEW_RECORD_ID`] sentinel and `edit` for anything else.
    pub fn for_record(
        record_id: impl Into<String>,
        mode: Option<TabMode>,
        form_mode: Option<FormMode>,
    ) -> Self {
        let record_id = record_id.into();
        let form_mode = form_mode.unwrap_or_else(|| FormMode::for_record(&record_id));
        Self {
            mode: Some(mode.unwrap_or(TabMode::Form)),
            record_id: Some(record_id),
            form_mode: Some(form_mode),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mode.is_none() && self.record_id.is_none() && self.form_mode.is_none()
    }

    /// Whether the tab is showing a record form (the user may be mid-edit)
    pub fn is_form_view(&self) -> bool {
        self.mode == Some(TabMode::Form)
            && self.record_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// Drop values equal to their defaults (`table` mode, empty ids)
    pub fn normalized(&self) -> Self {
        Self {
            mode: self.mode.filter(|m| *m != TabMode::Table),
            record_id: self.record_id.clone().filter(|id| !id.is_empty()),
            form_mode: self.form_mode,
        }
    }
}

/// One active column filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFilter {
    pub id: String,
    pub value: serde_json::Value,
}

impl ColumnFilter {
    pub fn new(id: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
        }
    }
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSort {
    pub id: String,
    pub desc: bool,
}

impl ColumnSort {
    pub fn asc(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            desc: false,
        }
    }

    pub fn desc(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            desc: true,
        }
    }
}

/// Column visibility keyed by the column's display label
pub type VisibilityState = HashMap<String, bool>;

/// Per-tab table view state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableState {
    pub filters: Vec<ColumnFilter>,
    pub visibility: VisibilityState,
    pub sorting: Vec<ColumnSort>,
    pub order: Vec<String>,
    /// `None` until the tab decides whether its implicit filter applies
    pub is_implicit_filter_applied: Option<bool>,
}

/// Per-window hierarchy navigation state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    /// Hierarchy depths currently expanded, ascending
    pub active_levels: Vec<usize>,
    /// Depth -> tab id shown at that depth
    pub active_tabs_by_level: BTreeMap<usize, String>,
    pub initialized: bool,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            active_levels: vec![0],
            active_tabs_by_level: BTreeMap::new(),
            initialized: false,
        }
    }
}

/// State of one tab (one level of the window's entity hierarchy)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabState {
    #[serde(default)]
    pub table: TableState,
    #[serde(default)]
    pub form: TabFormState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_record: Option<String>,
}

impl TabState {
    /// Whether the tab carries any state worth writing to the URL
    pub fn has_url_state(&self) -> bool {
        self.selected_record.as_deref().is_some_and(|id| !id.is_empty())
            || !self.form.normalized().is_empty()
    }
}

/// One open entity browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowState {
    /// Window definition id, shared by every instance of the same window
    pub window_id: String,
    /// Unique id of this open instance, stable across reloads
    pub window_identifier: String,
    #[serde(default)]
    pub is_active: bool,
    /// Tab-strip position, dense from 1
    #[serde(default)]
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Top-level form pointer kept for links that predate per-tab forms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_record_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_mode: Option<FormMode>,
    #[serde(default)]
    pub navigation: NavigationState,
    #[serde(default)]
    pub tabs: BTreeMap<String, TabState>,
}

impl WindowState {
    /// Fresh inactive window; `window_id` is derived from the identifier
    pub fn new(window_identifier: impl Into<String>) -> Self {
        let window_identifier = window_identifier.into();
        Self {
            window_id: window_id_from_identifier(&window_identifier).to_string(),
            window_identifier,
            is_active: false,
            order: 0,
            title: None,
            form_record_id: None,
            form_mode: None,
            navigation: NavigationState::default(),
            tabs: BTreeMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    pub fn active(mut self) -> Self {
        self.is_active = true;
        self
    }

    pub fn tab(&self, tab_id: &str) -> Option<&TabState> {
        self.tabs.get(tab_id)
    }

    /// Copy with empty optional fields dropped and tabs reduced to URL-visible state
    pub fn normalized(&self) -> Self {
        let tabs = self
            .tabs
            .iter()
            .filter(|(_, tab)| tab.has_url_state())
            .map(|(id, tab)| {
                (
                    id.clone(),
                    TabState {
                        table: TableState::default(),
                        form: tab.form.normalized(),
                        selected_record: tab.selected_record.clone().filter(|r| !r.is_empty()),
                    },
                )
            })
            .collect();

        Self {
            window_id: self.window_id.clone(),
            window_identifier: self.window_identifier.clone(),
            is_active: self.is_active,
            order: self.order,
            title: self.title.clone().filter(|t| !t.is_empty()),
            form_record_id: self.form_record_id.clone().filter(|r| !r.is_empty()),
            form_mode: self.form_mode,
            navigation: NavigationState::default(),
            tabs,
        }
    }
}

/// Partial window data merged by `set_window_active`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowPatch {
    #[serde(default)]
    pub window_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub form_record_id: Option<String>,
    #[serde(default)]
    pub form_mode: Option<FormMode>,
    #[serde(default)]
    pub navigation: Option<NavigationState>,
    #[serde(default)]
    pub tabs: Option<BTreeMap<String, TabState>>,
}

impl WindowPatch {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Merge the supplied fields onto an existing window
    pub fn apply(&self, window: &mut WindowState) {
        if let Some(window_id) = &self.window_id {
            window.window_id = window_id.clone();
        }
        if let Some(title) = &self.title {
            window.title = Some(title.clone());
        }
        if let Some(record_id) = &self.form_record_id {
            window.form_record_id = Some(record_id.clone());
        }
        if let Some(form_mode) = self.form_mode {
            window.form_mode = Some(form_mode);
        }
        if let Some(navigation) = &self.navigation {
            window.navigation = navigation.clone();
        }
        if let Some(tabs) = &self.tabs {
            window.tabs = tabs.clone();
        }
    }
}
