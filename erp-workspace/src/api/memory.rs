//! In-memory datasource
//!
//! Serves a fixed record set with the same paging and tree semantics as the
//! backend, records every request, and can be told to fail. Used by the test
//! suites and for exercising the engine without a server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::datasource::{
    record_id, Datasource, DatasourceRequest, DatasourceResponse, Record, TREE_ROOT_PARENT,
};

#[derive(Debug, Default)]
pub struct MemoryDatasource {
    records: Vec<Record>,
    children: HashMap<String, Vec<Record>>,
    requests: Mutex<Vec<DatasourceRequest>>,
    fail_all: AtomicBool,
    fail_implicit: AtomicBool,
}

impl MemoryDatasource {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    pub fn with_children(mut self, parent_id: impl Into<String>, children: Vec<Record>) -> Self {
        self.children.insert(parent_id.into(), children);
        self
    }

    /// Make every request fail with a transport error
    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Make requests with the implicit filter applied answer `ok: false`
    pub fn fail_with_implicit_filter(&self, fail: bool) {
        self.fail_implicit.store(fail, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<DatasourceRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    fn page(records: &[Record], request: &DatasourceRequest) -> Vec<Record> {
        records
            .iter()
            .skip(request.start_row)
            .take((request.end_row + 1).saturating_sub(request.start_row))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Datasource for MemoryDatasource {
    async fn fetch(&self, request: &DatasourceRequest) -> Result<DatasourceResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if self.fail_all.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        if self.fail_implicit.load(Ordering::SeqCst) && request.is_implicit_filter_applied {
            return Ok(DatasourceResponse::failure("implicit filter rejected"));
        }

        let source: Vec<Record> = match request.parent_id.as_deref() {
            Some(parent) if parent != TREE_ROOT_PARENT => {
                self.children.get(parent).cloned().unwrap_or_default()
            }
            _ => match &request.direct_navigation {
                Some(target) => self
                    .records
                    .iter()
                    .filter(|r| record_id(r).as_deref() == Some(target.as_str()))
                    .cloned()
                    .collect(),
                None => self.records.clone(),
            },
        };

        Ok(DatasourceResponse::success(Self::page(&source, request)))
    }
}
