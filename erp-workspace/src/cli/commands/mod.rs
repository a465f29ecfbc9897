pub mod fetch;
pub mod url;
