//! Paging request: conditions plus date window, result window, sort and projection

use super::compiler::QueryCompiler;
use super::condition::Condition;
use super::dsl::BoolQuery;
use super::zone;
use crate::error::Result;
use chrono::{DateTime, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

/// Largest window served by a single bounded search
pub const MAX_PAGE_WINDOW: i64 = 10_000;

/// Cursor page size used when none is given
pub const DEFAULT_STREAM_BATCH_SIZE: usize = 1000;

/// Sort key applied in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    #[serde(default)]
    pub ascending: bool,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: false,
        }
    }
}

/// Request describing what to fetch and how
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Paging {
    pub start_date: String,
    pub end_date: String,
    pub date_field: String,
    #[serde(alias = "queryConds")]
    pub conditions: Vec<Condition>,
    pub skip: i64,
    /// Negative or above [`MAX_PAGE_WINDOW`] streams every match
    pub limit: i64,
    #[serde(alias = "sortby")]
    pub sort_by: Vec<Sort>,
    #[serde(alias = "includeFields")]
    pub includes: Vec<String>,
    #[serde(alias = "excludeFields")]
    pub excludes: Vec<String>,
    #[serde(alias = "scrollSize")]
    pub stream_batch_size: i64,
    #[serde(alias = "zone")]
    pub time_zone: Option<String>,
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            start_date: String::new(),
            end_date: String::new(),
            date_field: String::new(),
            conditions: Vec::new(),
            skip: 0,
            limit: -1,
            sort_by: Vec::new(),
            includes: Vec::new(),
            excludes: Vec::new(),
            stream_batch_size: 0,
            time_zone: None,
        }
    }
}

impl Paging {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conditions(mut self, conditions: Vec<Condition>) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Half-open date window `[start, end)` on `field`
    pub fn with_date_range(
        mut self,
        field: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        self.date_field = field.into();
        self.start_date = start.into();
        self.end_date = end.into();
        self
    }

    /// Date window from calendar days
    pub fn with_days(self, field: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        self.with_date_range(
            field,
            start.format("%Y-%m-%d").to_string(),
            end.format("%Y-%m-%d").to_string(),
        )
    }

    /// Date window from instants, sent as epoch milliseconds
    pub fn with_instants<Tz: TimeZone>(
        self,
        field: impl Into<String>,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> Self {
        self.with_date_range(
            field,
            start.timestamp_millis().to_string(),
            end.timestamp_millis().to_string(),
        )
    }

    pub fn with_window(mut self, skip: i64, limit: i64) -> Self {
        self.skip = skip;
        self.limit = limit;
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort_by.push(sort);
        self
    }

    pub fn include(mut self, field: impl Into<String>) -> Self {
        self.includes.push(field.into());
        self
    }

    pub fn exclude(mut self, field: impl Into<String>) -> Self {
        self.excludes.push(field.into());
        self
    }

    pub fn with_stream_batch_size(mut self, size: i64) -> Self {
        self.stream_batch_size = size;
        self
    }

    pub fn with_time_zone(mut self, zone: impl Into<String>) -> Self {
        self.time_zone = Some(zone.into());
        self
    }

    /// Whether this request takes the streaming path
    pub fn is_unbounded(&self, max_window: i64) -> bool {
        self.limit < 0 || self.limit > max_window
    }

    /// Cursor page size, defaulting when unset or non-positive
    pub fn effective_batch_size(&self, default: usize) -> usize {
        usize::try_from(self.stream_batch_size)
            .ok()
            .filter(|size| *size > 0)
            .unwrap_or(default)
    }

    /// Skip clamped to zero
    pub fn offset(&self) -> usize {
        usize::try_from(self.skip).unwrap_or(0)
    }

    /// Compile with `compiler`, validating the time zone first
    pub fn compile_with(&self, compiler: &QueryCompiler) -> Result<BoolQuery> {
        self.compile_or(compiler, None)
    }

    /// Like [`compile_with`](Self::compile_with), using `default_zone` when
    /// the request names no zone
    pub fn compile_or(
        &self,
        compiler: &QueryCompiler,
        default_zone: Option<&str>,
    ) -> Result<BoolQuery> {
        let requested = self.time_zone.as_deref().filter(|z| !z.trim().is_empty());
        let zone = zone::resolve(requested.or(default_zone))?;
        Ok(compiler.compile(
            &self.conditions,
            &self.date_field,
            &self.start_date,
            &self.end_date,
            Some(&zone),
        ))
    }

    pub fn compile(&self) -> Result<BoolQuery> {
        self.compile_with(&QueryCompiler::default())
    }

    /// Indented JSON of the compiled query, for debugging
    pub fn explain(&self) -> Result<String> {
        let query = self.compile()?;
        Ok(serde_json::to_string_pretty(&query.source()).unwrap_or_default())
    }
}
