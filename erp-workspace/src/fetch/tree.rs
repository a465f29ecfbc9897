//! Tree mode state
//!
//! Roots come from the main record list; children are fetched lazily per node
//! and kept in a `parent id -> children` map. Collapsing a node evicts its
//! children so the next expansion fetches them again. The displayed list is a
//! depth-first flatten over expanded nodes.

use std::collections::{HashMap, HashSet};

use log::debug;
use serde_json::Value;

use crate::api::{record_id, Record};

pub const LEVEL_FIELD: &str = "__level";
pub const IS_PARENT_FIELD: &str = "__isParent";
pub const TREE_PARENT_FIELD: &str = "__treeParentId";
/// Server flag telling whether a non-root node has children
pub const SHOW_DROP_ICON_FIELD: &str = "showDropIcon";

/// What the caller has to do after an expand request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandAction {
    /// Children must be fetched for this node
    Fetch(String),
    /// Children are already in memory (or on their way)
    Ready,
    /// The node cannot have children
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct TreeState {
    expanded: HashSet<String>,
    children: HashMap<String, Vec<Record>>,
    loaded: HashSet<String>,
    pending: HashSet<String>,
}

/// Whether a row at `level` can be expanded
pub fn is_parent(record: &Record, level: usize) -> bool {
    level == 0 || record.get(SHOW_DROP_ICON_FIELD) == Some(&Value::Bool(true))
}

fn annotate(record: &Record, level: usize, parent_id: Option<&str>) -> Record {
    let mut row = record.clone();
    row.insert(LEVEL_FIELD.to_string(), Value::from(level));
    row.insert(IS_PARENT_FIELD.to_string(), Value::Bool(is_parent(record, level)));
    row.insert(
        TREE_PARENT_FIELD.to_string(),
        parent_id.map_or(Value::Null, |id| Value::String(id.to_string())),
    );
    row
}

impl TreeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, node_id: &str) -> bool {
        self.expanded.contains(node_id)
    }

    pub fn is_loaded(&self, node_id: &str) -> bool {
        self.loaded.contains(node_id)
    }

    /// Expanded node ids, sorted for stable iteration
    pub fn expanded_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.expanded.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn children_of(&self, node_id: &str) -> Option<&[Record]> {
        self.children.get(node_id).map(|c| c.as_slice())
    }

    /// Mark a node expanded and report whether its children must be fetched.
    ///
    /// `row` is the displayed (annotated) row; rows flagged as non-parents are
    /// ignored.
    pub fn expand(&mut self, row: &Record) -> ExpandAction {
        let Some(node_id) = record_id(row) else {
            return ExpandAction::Ignored;
        };
        if row.get(IS_PARENT_FIELD) == Some(&Value::Bool(false)) {
            debug!("Ignoring expand of leaf node {}", node_id);
            return ExpandAction::Ignored;
        }

        self.expanded.insert(node_id.clone());
        if self.loaded.contains(&node_id) || !self.pending.insert(node_id.clone()) {
            return ExpandAction::Ready;
        }
        ExpandAction::Fetch(node_id)
    }

    /// Collapse a node and evict its children
    pub fn collapse(&mut self, node_id: &str) {
        self.expanded.remove(node_id);
        self.children.remove(node_id);
        self.loaded.remove(node_id);
        self.pending.remove(node_id);
    }

    /// Store fetched children, de-duplicated by id in server order
    pub fn set_children(&mut self, node_id: &str, records: Vec<Record>) {
        self.pending.remove(node_id);
        if !self.expanded.contains(node_id) {
            debug!("Dropping children of collapsed node {}", node_id);
            return;
        }

        let mut seen = HashSet::new();
        let children: Vec<Record> = records
            .into_iter()
            .filter(|r| record_id(r).is_none_or(|id| seen.insert(id)))
            .collect();

        self.children.insert(node_id.to_string(), children);
        self.loaded.insert(node_id.to_string());
    }

    /// A child fetch failed; the node collapses so a new expand retries
    pub fn fail_children(&mut self, node_id: &str) {
        self.pending.remove(node_id);
        self.expanded.remove(node_id);
    }

    /// Forget loaded children but keep the expanded set, before a reload
    pub fn invalidate_children(&mut self) {
        self.children.clear();
        self.loaded.clear();
        self.pending.clear();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Depth-first flatten of `roots` and their expanded descendants
    pub fn flatten(&self, roots: &[Record]) -> Vec<Record> {
        let mut rows = Vec::new();
        let mut path = HashSet::new();
        for root in roots {
            self.push_node(root, 0, None, &mut path, &mut rows);
        }
        rows
    }

    fn push_node(
        &self,
        record: &Record,
        level: usize,
        parent_id: Option<&str>,
        path: &mut HashSet<String>,
        rows: &mut Vec<Record>,
    ) {
        rows.push(annotate(record, level, parent_id));

        let Some(node_id) = record_id(record) else {
            return;
        };
        if !self.expanded.contains(&node_id) || !path.insert(node_id.clone()) {
            return;
        }

        if let Some(children) = self.children.get(&node_id) {
            for child in children {
                self.push_node(child, level + 1, Some(&node_id), path, rows);
            }
        }
        path.remove(&node_id);
    }
}
