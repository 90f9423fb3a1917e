//! Search execution over a backend

use super::models::PageResult;
use super::stream;
use super::transform::{SourceWithId, Transform};
use crate::backend::{Backend, Hit, ScrollRequest, SearchRequest, SourceFilter};
use crate::config::QuerySettings;
use crate::error::{Error, Result};
use crate::query::{BoolQuery, FunctionScoreQuery, Paging, QueryCompiler};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Page size of `random` when the request sets no positive limit
const DEFAULT_RANDOM_SIZE: usize = 10;

/// Executes paging requests against one backend
///
/// The backend is injected by the caller; the executor never builds one.
pub struct Search {
    backend: Arc<dyn Backend>,
    compiler: QueryCompiler,
    settings: QuerySettings,
}

impl Search {
    /// Executor with default query settings
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_settings(backend, &QuerySettings::default())
    }

    pub fn with_settings(backend: Arc<dyn Backend>, settings: &QuerySettings) -> Self {
        Self {
            backend,
            compiler: settings.compiler(),
            settings: settings.clone(),
        }
    }

    /// Set the number of streaming workers
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.settings.stream_workers = workers;
        self
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    /// Compile the paging conditions, using the configured zone when the
    /// request names none
    pub fn compile(&self, paging: &Paging) -> Result<BoolQuery> {
        paging.compile_or(&self.compiler, self.settings.default_time_zone.as_deref())
    }

    /// One page of source documents with `_id` injected
    ///
    /// Requests without a usable window take the streaming path and come
    /// back as a single page holding every match.
    pub async fn page(&self, paging: &Paging) -> Result<PageResult<Value>> {
        let transform: Arc<dyn Transform<Value>> = Arc::new(SourceWithId);
        if paging.is_unbounded(self.settings.max_page_window) {
            let docs = self.fetch_all(self.scroll_request(paging)?, transform).await?;
            return Ok(PageResult::streamed(docs));
        }

        let request = self.search_request(paging)?;
        let (total, docs) = self.fetch_page(&request, transform.as_ref()).await?;
        Ok(PageResult::new(
            request.from as u64,
            request.size as u64,
            total,
            docs,
        ))
    }

    /// Matching documents with `_id` injected
    pub async fn list(&self, paging: &Paging) -> Result<Vec<Value>> {
        self.list_with(paging, Arc::new(SourceWithId)).await
    }

    /// Matching documents mapped through `transform`
    pub async fn list_with<T>(
        &self,
        paging: &Paging,
        transform: Arc<dyn Transform<T>>,
    ) -> Result<Vec<T>>
    where
        T: Send + 'static,
    {
        if paging.is_unbounded(self.settings.max_page_window) {
            return self.fetch_all(self.scroll_request(paging)?, transform).await;
        }
        let request = self.search_request(paging)?;
        let (_, docs) = self.fetch_page(&request, transform.as_ref()).await?;
        Ok(docs)
    }

    /// Run one bounded search and transform its hits in order
    ///
    /// Returns the total match count alongside the transformed window.
    pub async fn fetch_page<T>(
        &self,
        request: &SearchRequest,
        transform: &dyn Transform<T>,
    ) -> Result<(u64, Vec<T>)> {
        let start = Instant::now();
        let hits = self
            .backend
            .search(request)
            .await
            .map_err(|e| Error::backend("search", e))?;

        let docs = hits
            .hits
            .iter()
            .map(|hit| transform.transform(hit).map_err(Error::Transform))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "{} returned {} of {} hits in {:?}",
            self.backend.name(),
            docs.len(),
            hits.total,
            start.elapsed()
        );
        Ok((hits.total, docs))
    }

    /// Walk a scroll cursor to the end on the configured worker pool
    pub async fn fetch_all<T>(
        &self,
        request: ScrollRequest,
        transform: Arc<dyn Transform<T>>,
    ) -> Result<Vec<T>>
    where
        T: Send + 'static,
    {
        stream::fetch_all(
            Arc::clone(&self.backend),
            request,
            transform,
            self.settings.stream_workers,
        )
        .await
    }

    /// Number of documents matching the paging conditions
    pub async fn count(&self, paging: &Paging) -> Result<u64> {
        let query = self.compile(paging)?;
        let total = self
            .backend
            .count(&query.into())
            .await
            .map_err(|e| Error::backend("count", e))?;
        debug!("Counted {} matching docs", total);
        Ok(total)
    }

    /// Randomly ordered raw sources of matching documents
    pub async fn random(&self, paging: &Paging) -> Result<Vec<Value>> {
        let query = FunctionScoreQuery::random(self.compile(paging)?);
        let size = usize::try_from(paging.limit)
            .ok()
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_RANDOM_SIZE);
        let request = SearchRequest::new(query)
            .source(source_filter(paging))
            .window(paging.offset(), size);

        let raw = |hit: &Hit| -> anyhow::Result<Value> { Ok(hit.source.clone()) };
        let (_, docs) = self.fetch_page::<Value>(&request, &raw).await?;
        Ok(docs)
    }

    /// Single document with `_id` injected, `None` when it does not exist
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Value>> {
        let hit = self
            .backend
            .get(id)
            .await
            .map_err(|e| Error::backend("get", e))?;
        hit.map(|hit| SourceWithId.transform(&hit).map_err(Error::Transform))
            .transpose()
    }

    fn search_request(&self, paging: &Paging) -> Result<SearchRequest> {
        let query = self.compile(paging)?;
        let size = usize::try_from(paging.limit).unwrap_or(0);
        info!(
            "Paged search skip={} limit={} on {}",
            paging.skip,
            paging.limit,
            self.backend.name()
        );
        Ok(SearchRequest::new(query)
            .source(source_filter(paging))
            .sort(paging.sort_by.clone())
            .window(paging.offset(), size))
    }

    fn scroll_request(&self, paging: &Paging) -> Result<ScrollRequest> {
        let query = self.compile(paging)?;
        let size = paging.effective_batch_size(self.settings.stream_batch_size);
        info!(
            "Streaming search batch={} workers={} on {}",
            size,
            self.settings.stream_workers,
            self.backend.name()
        );
        Ok(ScrollRequest::new(query, size)
            .source(source_filter(paging))
            .keep_alive(self.settings.keep_alive.clone()))
    }
}

fn source_filter(paging: &Paging) -> SourceFilter {
    SourceFilter::new(paging.includes.clone(), paging.excludes.clone())
}
