//! Search backend module
//!
//! Defines the [`Backend`] capability set the fetchers run against and an
//! HTTP implementation for Elasticsearch.

mod client;
#[cfg(test)]
pub(crate) mod memory;
mod traits;

pub use client::EsClient;
pub use traits::*;
