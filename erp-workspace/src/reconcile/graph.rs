//! Tab hierarchy graph
//!
//! Parent links come from window metadata, not from the stored state, so the
//! caller builds a [`TabGraph`] once per window definition and hands it to the
//! reconciler.

use std::collections::{HashMap, HashSet, VecDeque};

/// One tab and its parent, as declared by window metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabNode {
    pub tab_id: String,
    pub parent_tab_id: Option<String>,
}

impl TabNode {
    pub fn root(tab_id: impl Into<String>) -> Self {
        Self {
            tab_id: tab_id.into(),
            parent_tab_id: None,
        }
    }

    pub fn child(tab_id: impl Into<String>, parent_tab_id: impl Into<String>) -> Self {
        Self {
            tab_id: tab_id.into(),
            parent_tab_id: Some(parent_tab_id.into()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TabGraph {
    /// tab -> its parent
    parents: HashMap<String, String>,
    /// parent -> children, in declaration order
    children: HashMap<String, Vec<String>>,
    tabs: Vec<String>,
}

impl TabGraph {
    pub fn build(nodes: impl IntoIterator<Item = TabNode>) -> Self {
        let mut graph = TabGraph::default();

        for node in nodes {
            if let Some(parent) = node.parent_tab_id {
                // Self-references would make every traversal loop
                if parent != node.tab_id {
                    graph
                        .children
                        .entry(parent.clone())
                        .or_default()
                        .push(node.tab_id.clone());
                    graph.parents.insert(node.tab_id.clone(), parent);
                }
            }
            graph.tabs.push(node.tab_id);
        }

        graph
    }

    pub fn tabs(&self) -> &[String] {
        &self.tabs
    }

    pub fn parent_of(&self, tab_id: &str) -> Option<&str> {
        self.parents.get(tab_id).map(|s| s.as_str())
    }

    pub fn is_top_level(&self, tab_id: &str) -> bool {
        !self.parents.contains_key(tab_id)
    }

    pub fn children_of(&self, tab_id: &str) -> &[String] {
        self.children
            .get(tab_id)
            .map(|c| c.as_slice())
            .unwrap_or_default()
    }

    /// All tabs below `tab_id`, breadth first
    pub fn descendants_of(&self, tab_id: &str) -> Vec<String> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(tab_id);
        visited.insert(tab_id.to_string());

        while let Some(current) = queue.pop_front() {
            for child in self.children_of(current) {
                if visited.insert(child.clone()) {
                    result.push(child.clone());
                    queue.push_back(child);
                }
            }
        }

        result
    }

    /// Depth of a tab, 0 for top-level tabs
    pub fn level_of(&self, tab_id: &str) -> usize {
        let mut level = 0;
        let mut current = tab_id;
        let mut seen = HashSet::new();
        while let Some(parent) = self.parent_of(current) {
            if !seen.insert(parent) {
                break;
            }
            level += 1;
            current = parent;
        }
        level
    }
}
