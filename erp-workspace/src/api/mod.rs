//! Datasource contract, criteria building and datasource implementations

pub mod criteria;
pub mod datasource;
pub mod http;
pub mod memory;

pub use criteria::{Column, ColumnKind, Criteria, Operator};
pub use datasource::{
    record_id, Datasource, DatasourceRequest, DatasourceResponse, Record, TREE_ROOT_PARENT,
};
pub use http::HttpDatasource;
pub use memory::MemoryDatasource;
