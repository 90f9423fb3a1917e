//! Settings structures for esquery-rs configuration

use crate::error::{Error, Result};
use crate::query::{QueryCompiler, DEFAULT_DATE_FORMATS, DEFAULT_STREAM_BATCH_SIZE, MAX_PAGE_WINDOW};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of transform workers used by the streaming path by default
pub const DEFAULT_STREAM_WORKERS: usize = 10;

/// Main settings structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: BackendSettings,
    pub query: QuerySettings,
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::Config(format!("invalid settings: {e}")))
    }

    /// Merge with environment variables (ESQUERY_* prefix)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("ESQUERY_URLS") {
            self.backend.urls = val
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(val) = std::env::var("ESQUERY_USERNAME") {
            self.backend.username = Some(val);
        }
        if let Ok(val) = std::env::var("ESQUERY_PASSWORD") {
            self.backend.password = Some(val);
        }
        if let Ok(val) = std::env::var("ESQUERY_INDEX") {
            self.backend.index = val;
        }
        if let Ok(val) = std::env::var("ESQUERY_STREAM_WORKERS") {
            if let Ok(workers) = val.parse() {
                self.query.stream_workers = workers;
            }
        }
        if let Ok(val) = std::env::var("ESQUERY_TIME_ZONE") {
            self.query.default_time_zone = Some(val);
        }
    }

    /// Check the settings are usable before any client is built
    pub fn validate(&self) -> Result<()> {
        if self.backend.urls.is_empty() {
            return Err(Error::Config("backend.urls must not be empty".into()));
        }
        if self.backend.index.trim().is_empty() {
            return Err(Error::Config("backend.index must not be empty".into()));
        }
        let timeout = self.backend.request_timeout;
        if !timeout.is_finite() || timeout <= 0.0 {
            return Err(Error::Config("backend.request_timeout must be positive".into()));
        }
        if self.query.stream_workers == 0 {
            return Err(Error::Config("query.stream_workers must be at least 1".into()));
        }
        Ok(())
    }
}

/// Connection settings for the search backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Node URLs, used round-robin
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Index every request targets
    pub index: String,
    /// Request timeout in seconds
    pub request_timeout: f64,
    /// Accept gzip-compressed responses
    pub gzip: bool,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            username: None,
            password: None,
            index: String::new(),
            request_timeout: 30.0,
            gzip: true,
        }
    }
}

/// Query execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Largest `limit` served by bounded pagination
    pub max_page_window: i64,
    /// Cursor page size when the request sets none
    pub stream_batch_size: usize,
    /// Transform workers in the streaming path
    pub stream_workers: usize,
    /// Cursor keep-alive between pages
    pub keep_alive: String,
    /// Accepted formats of the date range bounds
    pub date_formats: Vec<String>,
    /// Zone used when the request names none; the local zone otherwise
    pub default_time_zone: Option<String>,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            max_page_window: MAX_PAGE_WINDOW,
            stream_batch_size: DEFAULT_STREAM_BATCH_SIZE,
            stream_workers: DEFAULT_STREAM_WORKERS,
            keep_alive: "1m".to_string(),
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
            default_time_zone: None,
        }
    }
}

impl QuerySettings {
    /// Compiler accepting the configured date formats
    pub fn compiler(&self) -> QueryCompiler {
        QueryCompiler::new().with_date_formats(self.date_formats.clone())
    }
}
