//! Per-tab record fetcher
//!
//! State machine: `Idle -> Loading -> Loaded | Errored`. `Loading` is entered
//! again by `fetch_more` (next page), `refetch` (page 1) or after a query
//! setter reports a real change. Query setters compare by value, so handing
//! in an equal filter list never resets pagination.
//!
//! The fetcher is split into a synchronous core ([`RecordFetcher::begin_fetch`]
//! and [`RecordFetcher::complete`]) and async drivers (`load`, `fetch_more`,
//! `refetch`, tree expansion) that run the core against the [`Datasource`].

use std::sync::Arc;

use anyhow::Result;
use futures::future::join_all;
use log::{debug, warn};

use super::cache::{query_signature, CacheEntry, QuerySignature};
use super::config::FetchConfig;
use super::in_flight::{InFlightGuard, InFlightPermit};
use super::navigation::{NavigationStep, RecordNavigation};
use super::tree::{ExpandAction, TreeState};
use super::tree_metadata::TreeCapability;
use crate::api::criteria::{combine, direct_navigation_target, sort_by};
use crate::api::{
    record_id, Column, Criteria, Datasource, DatasourceRequest, DatasourceResponse, Record,
    TREE_ROOT_PARENT,
};
use crate::window::{ColumnFilter, ColumnSort, TableState};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Errored(String),
}

impl FetchStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchStatus::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchStatus::Errored(message) => Some(message.as_str()),
            _ => None,
        }
    }
}

/// Everything that shapes a tab's record query
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchQuery {
    pub entity: String,
    pub window_id: Option<String>,
    pub tab_id: Option<String>,
    pub columns: Vec<Column>,
    /// Criteria supplied by the caller, such as the parent link
    pub base_criteria: Vec<Criteria>,
    pub search_query: String,
    pub filters: Vec<ColumnFilter>,
    pub sorting: Vec<ColumnSort>,
    pub is_implicit_filter_applied: bool,
    /// Do not fetch (e.g. a child tab without a selected parent record)
    pub skip: bool,
}

impl FetchQuery {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            ..Self::default()
        }
    }

    pub fn for_tab(mut self, window_id: impl Into<String>, tab_id: impl Into<String>) -> Self {
        self.window_id = Some(window_id.into());
        self.tab_id = Some(tab_id.into());
        self
    }

    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_base_criteria(mut self, criteria: Vec<Criteria>) -> Self {
        self.base_criteria = criteria;
        self
    }

    pub fn with_search(mut self, search_query: impl Into<String>) -> Self {
        self.search_query = search_query.into();
        self
    }

    /// Take filters, sorting and the implicit filter flag from a table state
    pub fn with_table_state(mut self, table: &TableState) -> Self {
        self.filters = table.filters.clone();
        self.sorting = table.sorting.clone();
        self.is_implicit_filter_applied = table.is_implicit_filter_applied.unwrap_or(false);
        self
    }

    pub fn skipped(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }
}

/// A fetch that has been started but not completed
#[derive(Debug)]
pub struct PendingFetch {
    request: DatasourceRequest,
    signature: QuerySignature,
    page: usize,
    generation: u64,
    _permit: InFlightPermit,
}

impl PendingFetch {
    pub fn request(&self) -> &DatasourceRequest {
        &self.request
    }

    pub fn page(&self) -> usize {
        self.page
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Loaded {
        received: usize,
        /// The implicit filter was dropped after a failed filtered fetch
        implicit_filter_dropped: bool,
    },
    /// The filtered fetch failed; the implicit filter is now off and the
    /// fetch should run again
    RetryWithoutImplicitFilter,
    Failed(String),
    /// The query changed while the fetch was in flight
    Discarded,
    /// Another fetch for this tab is still running
    Busy,
    /// The tab is skipped or has nothing more to load
    Skipped,
}

pub struct RecordFetcher {
    datasource: Arc<dyn Datasource>,
    config: FetchConfig,
    query: FetchQuery,
    page_size: usize,
    page: usize,
    records: Vec<Record>,
    has_more_records: bool,
    status: FetchStatus,
    guard: InFlightGuard,
    generation: u64,
    loaded_signature: Option<QuerySignature>,
    tree: Option<TreeCapability>,
    tree_state: TreeState,
}

impl RecordFetcher {
    pub fn new(datasource: Arc<dyn Datasource>, config: FetchConfig, query: FetchQuery) -> Self {
        let page_size = config.page_size;
        Self {
            datasource,
            config,
            query,
            page_size,
            page: 1,
            records: Vec::new(),
            has_more_records: false,
            status: FetchStatus::Idle,
            guard: InFlightGuard::new(),
            generation: 0,
            loaded_signature: None,
            tree: None,
            tree_state: TreeState::new(),
        }
    }

    /// Enable tree mode when the capability allows it
    pub fn with_tree(mut self, capability: TreeCapability) -> Self {
        if capability.supports_tree_mode {
            self.tree = Some(capability);
        }
        self
    }

    // ---- accessors ----

    pub fn status(&self) -> &FetchStatus {
        &self.status
    }

    pub fn query(&self) -> &FetchQuery {
        &self.query
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn has_more_records(&self) -> bool {
        self.has_more_records
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn is_tree_mode(&self) -> bool {
        self.tree.is_some()
    }

    pub fn tree_state(&self) -> &TreeState {
        &self.tree_state
    }

    /// Rows to render: the record list, flattened through the tree in tree mode
    pub fn displayed_records(&self) -> Vec<Record> {
        if self.is_tree_mode() {
            self.tree_state.flatten(&self.records)
        } else {
            self.records.clone()
        }
    }

    pub fn navigation(&self, current_record_id: Option<&str>) -> RecordNavigation {
        RecordNavigation::compute(current_record_id, &self.records, self.has_more_records)
    }

    // ---- query ----

    fn entity(&self) -> &str {
        self.tree
            .as_ref()
            .and_then(|t| t.tree_entity.as_deref())
            .unwrap_or(&self.query.entity)
    }

    fn criteria(&self) -> Vec<Criteria> {
        combine(
            &self.query.base_criteria,
            &self.query.columns,
            &self.query.search_query,
            &self.query.filters,
        )
    }

    fn root_parent(&self) -> Option<&str> {
        self.tree.as_ref().map(|_| TREE_ROOT_PARENT)
    }

    /// Signature of the current query
    pub fn signature(&self) -> QuerySignature {
        let sort = sort_by(&self.query.sorting);
        query_signature(
            self.entity(),
            &self.criteria(),
            sort.as_deref(),
            self.page_size,
            self.root_parent(),
            self.query.is_implicit_filter_applied,
        )
    }

    /// Request for one page of the main list (pages start at 1)
    pub fn request_for_page(&self, page: usize) -> DatasourceRequest {
        let page = page.max(1);
        let criteria = self.criteria();
        DatasourceRequest {
            entity: self.entity().to_string(),
            start_row: (page - 1) * self.page_size,
            end_row: page * self.page_size - 1,
            page_size: self.page_size,
            direct_navigation: direct_navigation_target(&criteria),
            criteria,
            is_implicit_filter_applied: self.query.is_implicit_filter_applied,
            sort_by: sort_by(&self.query.sorting),
            window_id: self.query.window_id.clone(),
            tab_id: self.query.tab_id.clone(),
            parent_id: self.root_parent().map(|p| p.to_string()),
            referenced_table_id: self.tree.as_ref().and_then(|t| t.referenced_table_id.clone()),
        }
    }

    fn child_request(&self, node_id: &str) -> DatasourceRequest {
        let size = self.config.child_page_size;
        DatasourceRequest {
            entity: self.entity().to_string(),
            start_row: 0,
            end_row: size - 1,
            page_size: size,
            criteria: self.query.base_criteria.clone(),
            is_implicit_filter_applied: self.query.is_implicit_filter_applied,
            sort_by: None,
            window_id: self.query.window_id.clone(),
            tab_id: self.query.tab_id.clone(),
            parent_id: Some(node_id.to_string()),
            referenced_table_id: self.tree.as_ref().and_then(|t| t.referenced_table_id.clone()),
            direct_navigation: None,
        }
    }

    /// Forget loaded pages after a query change; in-flight results become stale
    /// and rows of the previous query are no longer displayed
    fn reset_pagination(&mut self) {
        self.generation += 1;
        self.records.clear();
        self.page = 1;
        self.has_more_records = false;
        self.loaded_signature = None;
        self.tree_state.reset();
        if !self.status.is_loading() {
            self.status = FetchStatus::Idle;
        }
    }

    fn update_query(&mut self, apply: impl FnOnce(&mut FetchQuery)) -> bool {
        let mut next = self.query.clone();
        apply(&mut next);
        if next == self.query {
            return false;
        }
        self.query = next;
        self.reset_pagination();
        true
    }

    /// Returns true when the query changed and a fetch is due
    pub fn set_search_query(&mut self, search_query: &str) -> bool {
        self.update_query(|q| q.search_query = search_query.to_string())
    }

    pub fn set_column_filters(&mut self, filters: Vec<ColumnFilter>) -> bool {
        self.update_query(|q| q.filters = filters)
    }

    pub fn set_base_criteria(&mut self, criteria: Vec<Criteria>) -> bool {
        self.update_query(|q| q.base_criteria = criteria)
    }

    pub fn set_sorting(&mut self, sorting: Vec<ColumnSort>) -> bool {
        self.update_query(|q| q.sorting = sorting)
    }

    pub fn set_implicit_filter_applied(&mut self, applied: bool) -> bool {
        self.update_query(|q| q.is_implicit_filter_applied = applied)
    }

    pub fn toggle_implicit_filter(&mut self) -> bool {
        let applied = !self.query.is_implicit_filter_applied;
        self.set_implicit_filter_applied(applied)
    }

    pub fn set_skip(&mut self, skip: bool) -> bool {
        self.update_query(|q| q.skip = skip)
    }

    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        let page_size = page_size.max(1);
        if page_size == self.page_size {
            return false;
        }
        self.page_size = page_size;
        self.reset_pagination();
        true
    }

    // ---- cache ----

    /// Serve a cached entry if it was stored for the current query.
    ///
    /// Returns true when no fetch is needed (cache hit or skipped tab).
    pub fn mount(&mut self, cached: Option<&CacheEntry>) -> bool {
        if self.query.skip {
            self.show_skipped();
            return true;
        }

        let signature = self.signature();
        match cached {
            Some(entry) if entry.signature == signature => {
                debug!("Serving {} cached records for {}", entry.records.len(), self.query.entity);
                self.records = entry.records.clone();
                self.has_more_records = entry.has_more_records;
                self.page = entry.page.max(1);
                self.loaded_signature = Some(signature);
                self.status = FetchStatus::Loaded;
                true
            }
            Some(_) => {
                debug!("Cache signature mismatch for {}, refetching", self.query.entity);
                false
            }
            None => false,
        }
    }

    /// Snapshot of the loaded records for the cache
    pub fn cache_entry(&self) -> Option<CacheEntry> {
        let signature = self.loaded_signature.clone()?;
        if self.status != FetchStatus::Loaded {
            return None;
        }
        Some(CacheEntry {
            signature,
            records: self.records.clone(),
            has_more_records: self.has_more_records,
            page: self.page,
        })
    }

    fn show_skipped(&mut self) {
        self.records.clear();
        self.has_more_records = false;
        self.page = 1;
        self.status = FetchStatus::Loaded;
    }

    // ---- sans-io core ----

    /// Start fetching `page`; `None` when skipped or another fetch is in flight
    pub fn begin_fetch(&mut self, page: usize) -> Option<PendingFetch> {
        if self.query.skip {
            self.show_skipped();
            return None;
        }

        let permit = self.guard.try_begin()?;
        let page = page.max(1);
        self.status = FetchStatus::Loading;

        Some(PendingFetch {
            request: self.request_for_page(page),
            signature: self.signature(),
            page,
            generation: self.generation,
            _permit: permit,
        })
    }

    /// Apply the result of a fetch started with [`Self::begin_fetch`]
    pub fn complete(&mut self, pending: PendingFetch, result: Result<DatasourceResponse>) -> FetchOutcome {
        if pending.generation != self.generation {
            debug!("Discarding stale page {} for {}", pending.page, self.query.entity);
            if self.status.is_loading() {
                self.status = FetchStatus::Idle;
            }
            return FetchOutcome::Discarded;
        }

        match result.and_then(DatasourceResponse::into_records) {
            Ok(records) => {
                let received = records.len();
                if pending.page == 1 {
                    self.records = records;
                } else {
                    self.records.extend(records);
                }
                self.has_more_records = received >= self.page_size;
                self.page = pending.page;
                self.loaded_signature = Some(pending.signature);
                self.status = FetchStatus::Loaded;
                FetchOutcome::Loaded {
                    received,
                    implicit_filter_dropped: false,
                }
            }
            Err(error) => {
                if self.query.is_implicit_filter_applied && self.config.retry_without_implicit_filter {
                    warn!(
                        "Fetch of {} failed with implicit filter, retrying without: {:#}",
                        self.query.entity, error
                    );
                    self.query.is_implicit_filter_applied = false;
                    self.generation += 1;
                    return FetchOutcome::RetryWithoutImplicitFilter;
                }

                let message = format!("{:#}", error);
                warn!("Fetch of {} failed: {}", self.query.entity, message);
                self.status = FetchStatus::Errored(message.clone());
                FetchOutcome::Failed(message)
            }
        }
    }

    // ---- async drivers ----

    async fn run(&mut self, page: usize) -> FetchOutcome {
        let mut implicit_filter_dropped = false;
        let mut page = page;

        loop {
            if self.query.skip {
                self.show_skipped();
                return FetchOutcome::Skipped;
            }
            let Some(pending) = self.begin_fetch(page) else {
                return FetchOutcome::Busy;
            };

            let datasource = Arc::clone(&self.datasource);
            let result = datasource.fetch(pending.request()).await;

            match self.complete(pending, result) {
                FetchOutcome::RetryWithoutImplicitFilter => {
                    implicit_filter_dropped = true;
                    page = 1;
                }
                FetchOutcome::Loaded { received, .. } => {
                    return FetchOutcome::Loaded {
                        received,
                        implicit_filter_dropped,
                    };
                }
                other => return other,
            }
        }
    }

    /// Fetch page 1, replacing the list
    pub async fn load(&mut self) -> FetchOutcome {
        self.run(1).await
    }

    /// Fetch the next page and append it
    pub async fn fetch_more(&mut self) -> FetchOutcome {
        if !self.has_more_records || self.loaded_signature.is_none() {
            return FetchOutcome::Skipped;
        }
        let next = self.page + 1;
        self.run(next).await
    }

    /// Reload from page 1; in tree mode expanded nodes reload their children
    pub async fn refetch(&mut self) -> FetchOutcome {
        self.page = 1;
        let outcome = self.run(1).await;
        if matches!(outcome, FetchOutcome::Loaded { .. }) && self.is_tree_mode() {
            self.reload_expanded().await;
        }
        outcome
    }

    /// Move to the record after `current`, loading the next page when needed
    pub async fn next_record(&mut self, current_record_id: &str) -> Option<String> {
        let navigation = self.navigation(Some(current_record_id));
        match navigation.next(&self.records) {
            NavigationStep::Go(id) => Some(id),
            NavigationStep::FetchMore => {
                self.fetch_more().await;
                let idx = navigation.current_index? + 1;
                self.records.get(idx).and_then(record_id)
            }
            NavigationStep::Stay => None,
        }
    }

    pub fn previous_record(&self, current_record_id: &str) -> Option<String> {
        match self.navigation(Some(current_record_id)).previous(&self.records) {
            NavigationStep::Go(id) => Some(id),
            _ => None,
        }
    }

    // ---- tree ----

    /// Expand a displayed node, fetching its children once.
    ///
    /// Returns true when children were fetched.
    pub async fn expand(&mut self, node_id: &str) -> Result<bool> {
        if !self.is_tree_mode() {
            return Ok(false);
        }

        let displayed = self.displayed_records();
        let Some(row) = displayed
            .iter()
            .find(|r| record_id(r).as_deref() == Some(node_id))
        else {
            debug!("Expand of unknown node {}", node_id);
            return Ok(false);
        };

        let ExpandAction::Fetch(node_id) = self.tree_state.expand(row) else {
            return Ok(false);
        };

        let request = self.child_request(&node_id);
        let datasource = Arc::clone(&self.datasource);
        let result = datasource
            .fetch(&request)
            .await
            .and_then(DatasourceResponse::into_records);

        match result {
            Ok(children) => {
                debug!("Loaded {} children for {}", children.len(), node_id);
                self.tree_state.set_children(&node_id, children);
                Ok(true)
            }
            Err(error) => {
                warn!("Failed to load children of {}: {:#}", node_id, error);
                self.tree_state.fail_children(&node_id);
                Err(error.context(format!("Failed to load children of {}", node_id)))
            }
        }
    }

    pub fn collapse(&mut self, node_id: &str) {
        self.tree_state.collapse(node_id);
    }

    /// Re-fetch the children of every expanded node concurrently
    pub async fn reload_expanded(&mut self) {
        let expanded = self.tree_state.expanded_ids();
        if expanded.is_empty() {
            return;
        }
        self.tree_state.invalidate_children();

        let requests: Vec<(String, DatasourceRequest)> = expanded
            .into_iter()
            .map(|id| {
                let request = self.child_request(&id);
                (id, request)
            })
            .collect();

        let datasource = Arc::clone(&self.datasource);
        let results = join_all(requests.iter().map(|(_, request)| datasource.fetch(request))).await;

        for ((node_id, _), result) in requests.iter().zip(results) {
            match result.and_then(DatasourceResponse::into_records) {
                Ok(children) => self.tree_state.set_children(node_id, children),
                Err(error) => {
                    warn!("Failed to reload children of {}: {:#}", node_id, error);
                    self.tree_state.fail_children(node_id);
                }
            }
        }
    }

    // ---- local mutations ----

    pub fn remove_record_locally(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records
            .retain(|record| record_id(record).as_deref() != Some(id));
        before != self.records.len()
    }

    /// Replace a record by id (last write wins)
    pub fn update_record_locally(&mut self, id: &str, record: Record) -> bool {
        match self
            .records
            .iter_mut()
            .find(|r| record_id(r).as_deref() == Some(id))
        {
            Some(existing) => {
                *existing = record;
                true
            }
            None => false,
        }
    }

    /// Prepend a record (freshly created rows show first)
    pub fn add_record_locally(&mut self, record: Record) {
        self.records.insert(0, record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryDatasource;
    use crate::fetch::tree::{IS_PARENT_FIELD, LEVEL_FIELD};
    use serde_json::json;

    fn record(id: &str) -> Record {
        serde_json::from_value(json!({ "id": id, "name": format!("Record {}", id) })).unwrap()
    }

    fn numbered(count: usize) -> Vec<Record> {
        (1..=count).map(|i| record(&format!("R{}", i))).collect()
    }

    fn ids(records: &[Record]) -> Vec<String> {
        records.iter().filter_map(record_id).collect()
    }

    fn fetcher(datasource: Arc<MemoryDatasource>, page_size: usize) -> RecordFetcher {
        let config = FetchConfig::builder().page_size(page_size).build();
        RecordFetcher::new(datasource, config, FetchQuery::new("Order").for_tab("143", "T1"))
    }

    #[tokio::test]
    async fn test_pagination_appends_pages() {
        let datasource = Arc::new(MemoryDatasource::new(numbered(5)));
        let mut fetcher = fetcher(datasource.clone(), 2);

        assert!(matches!(fetcher.load().await, FetchOutcome::Loaded { received: 2, .. }));
        assert!(fetcher.has_more_records());

        fetcher.fetch_more().await;
        fetcher.fetch_more().await;
        assert_eq!(ids(fetcher.records()), vec!["R1", "R2", "R3", "R4", "R5"]);
        assert!(!fetcher.has_more_records());
        assert_eq!(fetcher.page(), 3);
        assert_eq!(fetcher.fetch_more().await, FetchOutcome::Skipped);

        let requests = datasource.requests();
        assert_eq!((requests[1].start_row, requests[1].end_row), (2, 3));
        assert_eq!((requests[2].start_row, requests[2].end_row), (4, 5));
    }

    #[tokio::test]
    async fn test_exact_page_reports_more() {
        let datasource = Arc::new(MemoryDatasource::new(numbered(2)));
        let mut fetcher = fetcher(datasource, 2);
        fetcher.load().await;
        assert!(fetcher.has_more_records());

        assert!(matches!(fetcher.fetch_more().await, FetchOutcome::Loaded { received: 0, .. }));
        assert!(!fetcher.has_more_records());
        assert_eq!(fetcher.records().len(), 2);
    }

    #[tokio::test]
    async fn test_refetch_replaces_records() {
        let datasource = Arc::new(MemoryDatasource::new(numbered(3)));
        let mut fetcher = fetcher(datasource, 2);
        fetcher.load().await;
        fetcher.fetch_more().await;
        assert_eq!(fetcher.records().len(), 3);

        fetcher.refetch().await;
        assert_eq!(ids(fetcher.records()), vec!["R1", "R2"]);
        assert_eq!(fetcher.page(), 1);
    }

    #[test]
    fn test_second_fetch_while_in_flight_is_dropped() {
        let datasource = Arc::new(MemoryDatasource::new(numbered(3)));
        let mut fetcher = fetcher(datasource, 2);

        let pending = fetcher.begin_fetch(1).unwrap();
        assert!(fetcher.status().is_loading());
        assert!(fetcher.begin_fetch(2).is_none());

        let outcome = fetcher.complete(pending, Ok(DatasourceResponse::success(numbered(2))));
        assert!(matches!(outcome, FetchOutcome::Loaded { .. }));
        assert!(fetcher.begin_fetch(2).is_some());
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let datasource = Arc::new(MemoryDatasource::new(numbered(3)));
        let mut fetcher = fetcher(datasource, 2);

        let pending = fetcher.begin_fetch(1).unwrap();
        assert!(fetcher.set_search_query("acme"));
        let outcome = fetcher.complete(pending, Ok(DatasourceResponse::success(numbered(2))));

        assert_eq!(outcome, FetchOutcome::Discarded);
        assert!(fetcher.records().is_empty());
        assert_eq!(fetcher.status(), &FetchStatus::Idle);
    }

    #[test]
    fn test_setters_compare_by_value() {
        let datasource = Arc::new(MemoryDatasource::new(Vec::new()));
        let mut fetcher = fetcher(datasource, 10);

        assert!(fetcher.set_column_filters(vec![ColumnFilter::new("status", json!(["CO"]))]));
        assert!(!fetcher.set_column_filters(vec![ColumnFilter::new("status", json!(["CO"]))]));
        assert!(fetcher.set_sorting(vec![ColumnSort::desc("date")]));
        assert!(!fetcher.set_sorting(vec![ColumnSort::desc("date")]));
        assert!(!fetcher.set_search_query(""));
        assert!(fetcher.toggle_implicit_filter());
        assert!(fetcher.query().is_implicit_filter_applied);
        assert!(!fetcher.set_page_size(10));
        assert!(fetcher.set_page_size(20));
    }

    #[tokio::test]
    async fn test_query_change_drops_previous_rows() {
        let datasource = Arc::new(MemoryDatasource::new(numbered(3)));
        let mut fetcher = fetcher(datasource, 10);
        fetcher.load().await;
        assert_eq!(fetcher.records().len(), 3);

        assert!(fetcher.set_search_query("R2"));
        assert!(fetcher.records().is_empty());
        assert!(fetcher.displayed_records().is_empty());
        assert!(fetcher.cache_entry().is_none());

        fetcher.load().await;
        assert!(!fetcher.records().is_empty());
    }

    #[tokio::test]
    async fn test_implicit_filter_failure_retries_without_it() {
        let datasource = Arc::new(MemoryDatasource::new(numbered(3)));
        datasource.fail_with_implicit_filter(true);
        let mut fetcher = fetcher(datasource.clone(), 10);
        fetcher.set_implicit_filter_applied(true);

        let outcome = fetcher.load().await;
        assert_eq!(
            outcome,
            FetchOutcome::Loaded {
                received: 3,
                implicit_filter_dropped: true
            }
        );
        assert!(!fetcher.query().is_implicit_filter_applied);
        assert_eq!(datasource.request_count(), 2);
    }

    #[tokio::test]
    async fn test_error_without_implicit_filter_is_surfaced() {
        let datasource = Arc::new(MemoryDatasource::new(numbered(3)));
        datasource.fail_all(true);
        let mut fetcher = fetcher(datasource.clone(), 10);

        let outcome = fetcher.load().await;
        assert!(matches!(outcome, FetchOutcome::Failed(_)));
        assert!(fetcher.status().error().unwrap().contains("connection refused"));
        assert_eq!(datasource.request_count(), 1);

        datasource.fail_all(false);
        assert!(matches!(fetcher.refetch().await, FetchOutcome::Loaded { .. }));
        assert_eq!(fetcher.status(), &FetchStatus::Loaded);
    }

    #[tokio::test]
    async fn test_skipped_tab_does_not_fetch() {
        let datasource = Arc::new(MemoryDatasource::new(numbered(3)));
        let mut fetcher = fetcher(datasource.clone(), 10);
        fetcher.set_skip(true);

        assert_eq!(fetcher.load().await, FetchOutcome::Skipped);
        assert_eq!(fetcher.status(), &FetchStatus::Loaded);
        assert!(fetcher.records().is_empty());
        assert_eq!(datasource.request_count(), 0);
    }

    #[tokio::test]
    async fn test_mount_serves_matching_cache() {
        let datasource = Arc::new(MemoryDatasource::new(numbered(3)));
        let mut first = fetcher(datasource.clone(), 10);
        first.load().await;
        let entry = first.cache_entry().unwrap();

        let mut second = fetcher(datasource.clone(), 10);
        assert!(second.mount(Some(&entry)));
        assert_eq!(second.records().len(), 3);
        assert_eq!(datasource.request_count(), 1);

        let mut filtered = fetcher(datasource.clone(), 10);
        filtered.set_column_filters(vec![ColumnFilter::new("status", json!("CO"))]);
        assert!(!filtered.mount(Some(&entry)));
    }

    #[test]
    fn test_request_includes_direct_navigation() {
        let datasource = Arc::new(MemoryDatasource::new(Vec::new()));
        let mut fetcher = fetcher(datasource, 10);
        fetcher.set_base_criteria(vec![Criteria::equals("id", "R7")]);

        let request = fetcher.request_for_page(1);
        assert_eq!(request.direct_navigation.as_deref(), Some("R7"));
        assert_eq!((request.start_row, request.end_row), (0, 9));
        assert_eq!(request.tab_id.as_deref(), Some("T1"));
    }

    #[test]
    fn test_local_mutations() {
        let datasource = Arc::new(MemoryDatasource::new(Vec::new()));
        let mut fetcher = fetcher(datasource, 10);
        let pending = fetcher.begin_fetch(1).unwrap();
        fetcher.complete(pending, Ok(DatasourceResponse::success(numbered(3))));

        assert!(fetcher.remove_record_locally("R2"));
        assert!(!fetcher.remove_record_locally("R2"));

        let mut updated = record("R3");
        updated.insert("name".to_string(), json!("Renamed"));
        assert!(fetcher.update_record_locally("R3", updated));
        fetcher.add_record_locally(record("R9"));

        assert_eq!(ids(fetcher.records()), vec!["R9", "R1", "R3"]);
        assert_eq!(fetcher.records()[2]["name"], json!("Renamed"));
    }

    #[tokio::test]
    async fn test_tree_expand_collapse_refetches_children() {
        let mut a1: Record = record("A1");
        a1.insert("showDropIcon".to_string(), json!(false));
        let datasource = Arc::new(
            MemoryDatasource::new(vec![record("A"), record("B")])
                .with_children("A", vec![a1, record("A2")]),
        );
        let config = FetchConfig::builder().page_size(10).child_page_size(1000).build();
        let mut fetcher = RecordFetcher::new(datasource.clone(), config, FetchQuery::new("Menu"))
            .with_tree(TreeCapability::tree("T1", Some("ADTreeNode".to_string())));

        fetcher.load().await;
        assert!(fetcher.expand("A").await.unwrap());
        assert!(!fetcher.expand("A").await.unwrap());

        let rows = fetcher.displayed_records();
        assert_eq!(ids(&rows), vec!["A", "A1", "A2", "B"]);
        assert_eq!(rows[1][LEVEL_FIELD], json!(1));
        assert_eq!(rows[1][IS_PARENT_FIELD], json!(false));
        assert!(!fetcher.expand("A1").await.unwrap());

        let requests = datasource.requests();
        let child_request = &requests[1];
        assert_eq!(child_request.parent_id.as_deref(), Some("A"));
        assert_eq!(child_request.entity, "ADTreeNode");
        assert_eq!((child_request.start_row, child_request.end_row), (0, 999));
        assert_eq!(datasource.requests()[0].parent_id.as_deref(), Some(TREE_ROOT_PARENT));

        fetcher.collapse("A");
        assert_eq!(ids(&fetcher.displayed_records()), vec!["A", "B"]);
        assert!(fetcher.expand("A").await.unwrap());
        assert_eq!(datasource.request_count(), 3);
    }

    #[tokio::test]
    async fn test_refetch_reloads_expanded_nodes() {
        let datasource = Arc::new(
            MemoryDatasource::new(vec![record("A"), record("B")])
                .with_children("A", vec![record("A1")])
                .with_children("B", vec![record("B1")]),
        );
        let mut fetcher = fetcher(datasource.clone(), 10).with_tree(TreeCapability::tree("T1", None));

        fetcher.load().await;
        fetcher.expand("A").await.unwrap();
        fetcher.expand("B").await.unwrap();
        assert_eq!(datasource.request_count(), 3);

        fetcher.refetch().await;
        assert_eq!(datasource.request_count(), 6);
        assert_eq!(ids(&fetcher.displayed_records()), vec!["A", "A1", "B", "B1"]);
    }

    #[tokio::test]
    async fn test_next_record_fetches_more() {
        let datasource = Arc::new(MemoryDatasource::new(numbered(3)));
        let mut fetcher = fetcher(datasource, 2);
        fetcher.load().await;

        assert_eq!(fetcher.next_record("R1").await, Some("R2".to_string()));
        assert_eq!(fetcher.next_record("R2").await, Some("R3".to_string()));
        assert_eq!(fetcher.previous_record("R2"), Some("R1".to_string()));
        assert_eq!(fetcher.next_record("R3").await, None);
    }
}
