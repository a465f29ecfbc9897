//! Record cache
//!
//! Cached pages are keyed by a signature over the entity, the resolved query
//! and the implicit-filter flag. A matching signature lets a remounted tab skip
//! its fetch; any mismatch means the entry is stale. The cache is advisory:
//! a miss only costs a fetch.

use std::collections::HashMap;

use log::debug;
use serde::Serialize;

use crate::api::{Criteria, Record};

/// Canonical key of a query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuerySignature(String);

impl QuerySignature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignatureParts<'a> {
    entity: &'a str,
    criteria: &'a [Criteria],
    sort_by: Option<&'a str>,
    page_size: usize,
    parent_id: Option<&'a str>,
    is_implicit_filter_applied: bool,
}

/// Signature of a query; equal inputs always produce equal signatures
pub fn query_signature(
    entity: &str,
    criteria: &[Criteria],
    sort_by: Option<&str>,
    page_size: usize,
    parent_id: Option<&str>,
    is_implicit_filter_applied: bool,
) -> QuerySignature {
    let parts = SignatureParts {
        entity,
        criteria,
        sort_by,
        page_size,
        parent_id,
        is_implicit_filter_applied,
    };
    // Serializing plain data into a String cannot fail
    QuerySignature(serde_json::to_string(&parts).unwrap_or_default())
}

/// Records loaded for one signature
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub signature: QuerySignature,
    pub records: Vec<Record>,
    pub has_more_records: bool,
    /// Last page included in `records`
    pub page: usize,
}

/// Cache entries keyed by tab (or any caller-chosen key)
#[derive(Debug, Clone, Default)]
pub struct RecordCache {
    entries: HashMap<String, CacheEntry>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Entry for `key`, only if it was stored under `signature`
    pub fn lookup(&self, key: &str, signature: &QuerySignature) -> Option<&CacheEntry> {
        self.entries
            .get(key)
            .filter(|entry| &entry.signature == signature)
    }

    /// Store an entry; returns true if it replaced one with another signature
    pub fn insert(&mut self, key: impl Into<String>, entry: CacheEntry) -> bool {
        let key = key.into();
        let evicted = self
            .entries
            .get(&key)
            .is_some_and(|previous| previous.signature != entry.signature);
        if evicted {
            debug!("Evicting stale cache entry for {}", key);
        }
        self.entries.insert(key, entry);
        evicted
    }

    pub fn invalidate(&mut self, key: &str) -> Option<CacheEntry> {
        self.entries.remove(key)
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
