//! esquery-rs: condition trees compiled to Elasticsearch bool queries
//!
//! Callers describe what to fetch as a nested tree of conditions plus a
//! paging request. The compiler turns it into one bool query, and the search
//! executor runs it either as a bounded page or as a scroll stream consumed
//! by a pool of workers.

pub mod backend;
pub mod config;
pub mod error;
pub mod query;
pub mod search;

pub use backend::{Backend, EsClient};
pub use config::Settings;
pub use error::{Error, Result};
pub use query::{Condition, Logic, NodeType, Paging, Sort};
pub use search::{PageResult, Search, Transform};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
