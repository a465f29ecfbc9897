//! Fetch engine configuration with builder pattern

/// Paging and retry settings for a record fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Rows per page for the main record list
    pub page_size: usize,
    /// Rows requested when loading the children of a tree node
    pub child_page_size: usize,
    /// Retry once without the implicit filter when a filtered fetch fails
    pub retry_without_implicit_filter: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            child_page_size: 1000,
            retry_without_implicit_filter: true,
        }
    }
}

impl FetchConfig {
    /// Create a new builder for FetchConfig
    pub fn builder() -> FetchConfigBuilder {
        FetchConfigBuilder::new()
    }
}

/// Builder for [`FetchConfig`]
#[derive(Debug, Clone, Default)]
pub struct FetchConfigBuilder {
    config: FetchConfig,
}

impl FetchConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.config.page_size = page_size;
        self
    }

    pub fn child_page_size(mut self, child_page_size: usize) -> Self {
        self.config.child_page_size = child_page_size;
        self
    }

    pub fn retry_without_implicit_filter(mut self, enabled: bool) -> Self {
        self.config.retry_without_implicit_filter = enabled;
        self
    }

    /// Page sizes of zero are raised to one
    pub fn build(self) -> FetchConfig {
        let mut config = self.config;
        config.page_size = config.page_size.max(1);
        config.child_page_size = config.child_page_size.max(1);
        config
    }
}
