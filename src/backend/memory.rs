//! In-memory backend for fetcher tests

use super::traits::{Backend, Hit, ScrollPage, ScrollRequest, SearchHits, SearchRequest};
use crate::query::Query;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Serves a fixed document set, ignoring the query itself
pub struct MemoryBackend {
    docs: Vec<Hit>,
    /// Fail the scroll advance after this many pages were served
    fail_after_pages: Option<usize>,
    pages_served: AtomicUsize,
    /// Bodies of every search/scroll-open request, in order
    pub requests: Mutex<Vec<Value>>,
}

impl MemoryBackend {
    /// `n` documents with ids `doc-0..doc-n` and a numeric `seq` field
    pub fn with_docs(n: usize) -> Self {
        let docs = (0..n)
            .map(|i| Hit::new(format!("doc-{i}"), json!({ "seq": i })))
            .collect();
        Self {
            docs,
            fail_after_pages: None,
            pages_served: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_after(mut self, pages: usize) -> Self {
        self.fail_after_pages = Some(pages);
        self
    }

    /// Cursor pages handed out so far, failed ones included
    pub fn pages_served(&self) -> usize {
        self.pages_served.load(Ordering::SeqCst)
    }

    fn page_at(&self, offset: usize, size: usize) -> anyhow::Result<ScrollPage> {
        let served = self.pages_served.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_after_pages {
            if served >= limit {
                anyhow::bail!("scroll context lost");
            }
        }
        let end = (offset + size).min(self.docs.len());
        let hits = self.docs.get(offset..end).unwrap_or_default().to_vec();
        Ok(ScrollPage {
            scroll_id: Some(format!("{end}:{size}")),
            hits,
        })
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn search(&self, request: &SearchRequest) -> anyhow::Result<SearchHits> {
        self.requests.lock().unwrap().push(request.to_body());
        let end = (request.from + request.size).min(self.docs.len());
        let hits = self
            .docs
            .get(request.from.min(end)..end)
            .unwrap_or_default()
            .to_vec();
        Ok(SearchHits {
            total: self.docs.len() as u64,
            hits,
        })
    }

    async fn scroll_start(&self, request: &ScrollRequest) -> anyhow::Result<ScrollPage> {
        self.requests.lock().unwrap().push(request.to_body());
        self.page_at(0, request.size)
    }

    async fn scroll_next(&self, scroll_id: &str, _keep_alive: &str) -> anyhow::Result<ScrollPage> {
        let (offset, size) = scroll_id
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("bad scroll id {scroll_id}"))?;
        self.page_at(offset.parse()?, size.parse()?)
    }

    async fn count(&self, _query: &Query) -> anyhow::Result<u64> {
        Ok(self.docs.len() as u64)
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<Hit>> {
        Ok(self.docs.iter().find(|h| h.id == id).cloned())
    }
}
