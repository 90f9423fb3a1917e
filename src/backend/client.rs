//! HTTP client speaking the Elasticsearch REST API

use super::traits::{Backend, Hit, ScrollPage, ScrollRequest, SearchHits, SearchRequest};
use crate::config::BackendSettings;
use crate::error::{Error, Result};
use crate::query::Query;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

/// Elasticsearch client bound to one index
#[derive(Clone)]
pub struct EsClient {
    client: Client,
    urls: Arc<Vec<Url>>,
    next_url: Arc<AtomicUsize>,
    index: String,
    username: Option<String>,
    password: Option<String>,
}

impl fmt::Debug for EsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EsClient")
            .field("urls", &self.urls)
            .field("index", &self.index)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl EsClient {
    /// Create a client from backend settings
    ///
    /// Fails with [`Error::Config`] when no URL is configured, a URL does not
    /// parse, the index name is empty or the timeout is not a positive number
    /// of seconds.
    pub fn with_settings(settings: &BackendSettings) -> Result<Self> {
        if settings.urls.is_empty() {
            return Err(Error::Config("at least one backend url is required".into()));
        }
        if settings.index.trim().is_empty() {
            return Err(Error::Config("backend index is required".into()));
        }

        let timeout = Duration::try_from_secs_f64(settings.request_timeout)
            .ok()
            .filter(|t| !t.is_zero())
            .ok_or_else(|| {
                Error::Config(format!(
                    "invalid backend request_timeout {}",
                    settings.request_timeout
                ))
            })?;

        let urls = settings
            .urls
            .iter()
            .map(|raw| parse_base_url(raw))
            .collect::<Result<Vec<_>>>()?;

        let client = Client::builder()
            .timeout(timeout)
            .gzip(settings.gzip)
            .build()
            .map_err(|e| Error::Config(format!("cannot build http client: {e}")))?;

        info!(
            "Elasticsearch client for index {} over {} node(s)",
            settings.index,
            urls.len()
        );

        Ok(Self {
            client,
            urls: Arc::new(urls),
            next_url: Arc::new(AtomicUsize::new(0)),
            index: settings.index.clone(),
            username: settings.username.clone().filter(|u| !u.is_empty()),
            password: settings.password.clone(),
        })
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Next node URL, round-robin
    fn base_url(&self) -> &Url {
        let i = self.next_url.fetch_add(1, Ordering::Relaxed);
        &self.urls[i % self.urls.len()]
    }

    fn endpoint(&self, path: &str) -> anyhow::Result<Url> {
        self.base_url()
            .join(path)
            .with_context(|| format!("invalid endpoint path {path}"))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.username {
            Some(ref user) => builder.basic_auth(user, self.password.as_ref()),
            None => builder,
        }
    }

    /// Send a JSON request and decode a successful JSON response
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> anyhow::Result<T> {
        let response = self.authorize(builder).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            anyhow::bail!("HTTP error {}: {}", status.as_u16(), text);
        }
        serde_json::from_str(&text).context("cannot decode backend response")
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url =
        Url::parse(raw).map_err(|e| Error::Config(format!("invalid backend url {raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "backend url {raw} must use http or https"
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "_scroll_id", default)]
    scroll_id: Option<String>,
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    total: Option<TotalHits>,
    #[serde(default)]
    hits: Vec<Hit>,
}

/// `hits.total` is a number before 7.0 and an object since
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Count(u64),
    Object { value: u64 },
}

impl TotalHits {
    fn value(&self) -> u64 {
        match *self {
            TotalHits::Count(n) | TotalHits::Object { value: n } => n,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source", default)]
    source: Value,
}

#[async_trait]
impl Backend for EsClient {
    async fn search(&self, request: &SearchRequest) -> anyhow::Result<SearchHits> {
        let start = Instant::now();
        let url = self.endpoint(&format!("{}/_search", self.index))?;
        let response: SearchResponse = self
            .send(self.client.post(url).json(&request.to_body()))
            .await?;
        let total = response.hits.total.as_ref().map(TotalHits::value).unwrap_or(0);
        debug!(
            "search on {} returned {} of {} hits in {:?}",
            self.index,
            response.hits.hits.len(),
            total,
            start.elapsed()
        );
        Ok(SearchHits {
            total,
            hits: response.hits.hits,
        })
    }

    async fn scroll_start(&self, request: &ScrollRequest) -> anyhow::Result<ScrollPage> {
        let mut url = self.endpoint(&format!("{}/_search", self.index))?;
        url.query_pairs_mut().append_pair("scroll", &request.keep_alive);
        let response: SearchResponse = self
            .send(self.client.post(url).json(&request.to_body()))
            .await?;
        debug!(
            "opened scroll on {} with {} hits",
            self.index,
            response.hits.hits.len()
        );
        Ok(ScrollPage {
            scroll_id: response.scroll_id,
            hits: response.hits.hits,
        })
    }

    async fn scroll_next(&self, scroll_id: &str, keep_alive: &str) -> anyhow::Result<ScrollPage> {
        let url = self.endpoint("_search/scroll")?;
        let body = json!({ "scroll": keep_alive, "scroll_id": scroll_id });
        let response: SearchResponse = self.send(self.client.post(url).json(&body)).await?;
        Ok(ScrollPage {
            scroll_id: response.scroll_id,
            hits: response.hits.hits,
        })
    }

    async fn count(&self, query: &Query) -> anyhow::Result<u64> {
        let url = self.endpoint(&format!("{}/_count", self.index))?;
        let body = json!({ "query": query.source() });
        let response: CountResponse = self.send(self.client.post(url).json(&body)).await?;
        Ok(response.count)
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<Hit>> {
        let mut url = self.endpoint(&format!("{}/_doc/", self.index))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("backend url cannot be a base"))?
            .pop_if_empty()
            .push(id);

        let response = self.authorize(self.client.get(url)).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let text = response.text().await?;
        if !status.is_success() {
            anyhow::bail!("HTTP error {}: {}", status.as_u16(), text);
        }
        let doc: GetResponse =
            serde_json::from_str(&text).context("cannot decode backend response")?;
        Ok(doc.found.then(|| Hit::new(doc.id, doc.source)))
    }
}
