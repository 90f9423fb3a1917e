//! Backend trait and request/response types

use crate::query::{Query, Sort};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// One matched document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Engine-assigned identifier
    #[serde(rename = "_id")]
    pub id: String,
    /// Raw source payload
    #[serde(rename = "_source", default)]
    pub source: Value,
}

impl Hit {
    pub fn new(id: impl Into<String>, source: Value) -> Self {
        Self {
            id: id.into(),
            source,
        }
    }
}

/// Result of a bounded search
#[derive(Debug, Clone, Default)]
pub struct SearchHits {
    /// Number of matching documents, not just the returned ones
    pub total: u64,
    pub hits: Vec<Hit>,
}

/// One page of a scroll cursor
#[derive(Debug, Clone, Default)]
pub struct ScrollPage {
    /// Handle for the next page, absent when the engine did not return one
    pub scroll_id: Option<String>,
    pub hits: Vec<Hit>,
}

impl ScrollPage {
    /// An empty page marks the end of the cursor
    pub fn is_exhausted(&self) -> bool {
        self.hits.is_empty()
    }
}

/// `_source` filtering
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFilter {
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
}

impl SourceFilter {
    pub fn new(includes: Vec<String>, excludes: Vec<String>) -> Self {
        Self { includes, excludes }
    }

    pub fn to_json(&self) -> Value {
        let mut filter = Map::new();
        if !self.includes.is_empty() {
            filter.insert("includes".to_string(), json!(self.includes));
        }
        if !self.excludes.is_empty() {
            filter.insert("excludes".to_string(), json!(self.excludes));
        }
        if filter.is_empty() {
            Value::Bool(true)
        } else {
            Value::Object(filter)
        }
    }
}

/// Bounded search request
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: Query,
    pub source: SourceFilter,
    pub sort: Vec<Sort>,
    pub from: usize,
    pub size: usize,
}

impl SearchRequest {
    pub fn new(query: impl Into<Query>) -> Self {
        Self {
            query: query.into(),
            source: SourceFilter::default(),
            sort: Vec::new(),
            from: 0,
            size: 10,
        }
    }

    pub fn source(mut self, source: SourceFilter) -> Self {
        self.source = source;
        self
    }

    pub fn sort(mut self, sort: Vec<Sort>) -> Self {
        self.sort = sort;
        self
    }

    pub fn window(mut self, from: usize, size: usize) -> Self {
        self.from = from;
        self.size = size;
        self
    }

    /// Request body for `_search`
    pub fn to_body(&self) -> Value {
        let mut body = json!({
            "query": self.query.source(),
            "_source": self.source.to_json(),
            "from": self.from,
            "size": self.size,
            "track_total_hits": true,
        });
        if !self.sort.is_empty() {
            body["sort"] = Value::Array(
                self.sort
                    .iter()
                    .map(|s| {
                        let order = if s.ascending { "asc" } else { "desc" };
                        json!({ s.field.as_str(): { "order": order } })
                    })
                    .collect(),
            );
        }
        body
    }
}

/// Opening request of a scroll cursor
#[derive(Debug, Clone)]
pub struct ScrollRequest {
    pub query: Query,
    pub source: SourceFilter,
    /// Hits per cursor page
    pub size: usize,
    /// How long the engine keeps the cursor between pages, e.g. `1m`
    pub keep_alive: String,
}

impl ScrollRequest {
    pub fn new(query: impl Into<Query>, size: usize) -> Self {
        Self {
            query: query.into(),
            source: SourceFilter::default(),
            size,
            keep_alive: "1m".to_string(),
        }
    }

    pub fn source(mut self, source: SourceFilter) -> Self {
        self.source = source;
        self
    }

    pub fn keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = keep_alive.into();
        self
    }

    pub fn to_body(&self) -> Value {
        json!({
            "query": self.query.source(),
            "_source": self.source.to_json(),
            "size": self.size,
        })
    }
}

/// Search backend capability set
///
/// Implementations only move requests and responses; retries, timeouts and
/// authentication belong to the implementation, not to the callers.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str {
        "elasticsearch"
    }

    /// Bounded search returning one window of hits plus the total count
    async fn search(&self, request: &SearchRequest) -> anyhow::Result<SearchHits>;

    /// Open a scroll cursor and return its first page
    async fn scroll_start(&self, request: &ScrollRequest) -> anyhow::Result<ScrollPage>;

    /// Advance a scroll cursor
    async fn scroll_next(&self, scroll_id: &str, keep_alive: &str) -> anyhow::Result<ScrollPage>;

    /// Number of documents matching `query`
    async fn count(&self, query: &Query) -> anyhow::Result<u64>;

    /// Look up one document by identifier
    async fn get(&self, id: &str) -> anyhow::Result<Option<Hit>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::BoolQuery;

    #[test]
    fn test_search_body() {
        let request = SearchRequest::new(BoolQuery::new())
            .source(SourceFilter::new(vec!["text".into()], vec![]))
            .sort(vec![Sort::desc("createAt"), Sort::asc("id")])
            .window(20, 10);
        assert_eq!(
            request.to_body(),
            json!({
                "query": { "bool": {} },
                "_source": { "includes": ["text"] },
                "from": 20,
                "size": 10,
                "track_total_hits": true,
                "sort": [
                    { "createAt": { "order": "desc" } },
                    { "id": { "order": "asc" } }
                ]
            })
        );
    }

    #[test]
    fn test_scroll_body_without_projection() {
        let request = ScrollRequest::new(BoolQuery::new(), 500);
        assert_eq!(
            request.to_body(),
            json!({ "query": { "bool": {} }, "_source": true, "size": 500 })
        );
        assert_eq!(request.keep_alive, "1m");
    }

    #[test]
    fn test_hit_decodes_engine_names() {
        let hit: Hit = serde_json::from_value(json!({
            "_index": "docs", "_id": "abc", "_score": 1.0, "_source": { "text": "hi" }
        }))
        .unwrap();
        assert_eq!(hit, Hit::new("abc", json!({ "text": "hi" })));
    }
}
