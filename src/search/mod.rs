//! Search execution module
//!
//! Runs compiled queries through the paged or the streaming fetcher and
//! shapes every hit with a transform hook.

mod executor;
mod models;
pub mod stream;
pub mod transform;

pub use executor::Search;
pub use models::*;
pub use transform::{decode, SourceWithId, Transform, ID_KEY};
