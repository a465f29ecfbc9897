//! Record fetching for tabs: pagination, caching, in-flight guarding and tree mode

pub mod cache;
pub mod config;
pub mod fetcher;
pub mod in_flight;
pub mod navigation;
pub mod tree;
pub mod tree_metadata;

pub use cache::{query_signature, CacheEntry, QuerySignature, RecordCache};
pub use config::{FetchConfig, FetchConfigBuilder};
pub use fetcher::{FetchOutcome, FetchQuery, FetchStatus, PendingFetch, RecordFetcher};
pub use in_flight::{InFlightGuard, InFlightPermit};
pub use navigation::{NavigationStep, RecordNavigation};
pub use tree::{ExpandAction, TreeState};
pub use tree_metadata::{Clock, ManualClock, SystemClock, TreeCapability, TreeMetadataCache};
