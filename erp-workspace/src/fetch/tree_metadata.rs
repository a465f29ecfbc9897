//! Tree capability cache
//!
//! Whether a tab can render as a tree is metadata supplied by the caller. The
//! cache keeps one capability per (window, tab) for a fixed time-to-live,
//! measured with an injectable [`Clock`].

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let (Ok(mut now), Ok(delta)) = (self.now.lock(), chrono::Duration::from_std(by)) {
            *now += delta;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|_| Utc::now())
    }
}

/// How a tab renders in tree mode
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeCapability {
    pub supports_tree_mode: bool,
    /// Entity queried for tree nodes, when it differs from the tab's entity
    #[serde(default)]
    pub tree_entity: Option<String>,
    #[serde(default)]
    pub referenced_table_id: Option<String>,
}

impl TreeCapability {
    pub fn unsupported() -> Self {
        Self::default()
    }

    pub fn tree(referenced_table_id: impl Into<String>, tree_entity: Option<String>) -> Self {
        Self {
            supports_tree_mode: true,
            tree_entity,
            referenced_table_id: Some(referenced_table_id.into()),
        }
    }
}

struct CachedCapability {
    stored_at: DateTime<Utc>,
    capability: TreeCapability,
}

pub struct TreeMetadataCache<C: Clock = SystemClock> {
    clock: C,
    ttl: Duration,
    entries: HashMap<(String, String), CachedCapability>,
}

impl TreeMetadataCache<SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(SystemClock, ttl)
    }
}

impl<C: Clock> TreeMetadataCache<C> {
    pub fn with_clock(clock: C, ttl: Duration) -> Self {
        Self {
            clock,
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn is_fresh(&self, stored_at: DateTime<Utc>) -> bool {
        let age = self.clock.now().signed_duration_since(stored_at);
        age.to_std().map(|age| age < self.ttl).unwrap_or(true)
    }

    /// Fresh capability for a tab; expired entries are dropped
    pub fn get(&mut self, window_id: &str, tab_id: &str) -> Option<TreeCapability> {
        let key = (window_id.to_string(), tab_id.to_string());
        let stored_at = self.entries.get(&key)?.stored_at;
        if !self.is_fresh(stored_at) {
            debug!("Tree metadata for {}/{} expired", window_id, tab_id);
            self.entries.remove(&key);
            return None;
        }
        self.entries.get(&key).map(|entry| entry.capability.clone())
    }

    pub fn insert(&mut self, window_id: &str, tab_id: &str, capability: TreeCapability) {
        let entry = CachedCapability {
            stored_at: self.clock.now(),
            capability,
        };
        self.entries
            .insert((window_id.to_string(), tab_id.to_string()), entry);
    }

    /// Cached capability, or the loader's result (which is then cached)
    pub fn get_or_insert_with(
        &mut self,
        window_id: &str,
        tab_id: &str,
        load: impl FnOnce() -> TreeCapability,
    ) -> TreeCapability {
        if let Some(capability) = self.get(window_id, tab_id) {
            return capability;
        }
        let capability = load();
        self.insert(window_id, tab_id, capability.clone());
        capability
    }

    pub fn invalidate(&mut self, window_id: &str, tab_id: &str) {
        self.entries
            .remove(&(window_id.to_string(), tab_id.to_string()));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
