//! Error types for query compilation and execution

use thiserror::Error;

/// Errors surfaced by the compiler, the fetchers and the backend client
#[derive(Debug, Error)]
pub enum Error {
    /// Settings or connection parameters are unusable
    #[error("configuration error: {0}")]
    Config(String),

    /// The requested time zone is not a known IANA zone name
    #[error("invalid time zone: {0}")]
    InvalidTimeZone(String),

    /// A condition node was built with values of the wrong shape
    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    /// The backend rejected or failed a request
    #[error("call {stage}() error: {source}")]
    Backend {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A result transform hook failed
    #[error("call transform() error: {0}")]
    Transform(#[source] anyhow::Error),

    /// A streaming task died without reporting an error
    #[error("stream task failed: {0}")]
    Worker(String),
}

impl Error {
    /// Wrap a backend failure with the stage that produced it
    pub fn backend(stage: &'static str, source: anyhow::Error) -> Self {
        Self::Backend { stage, source }
    }

    /// Shorthand for a condition shape error
    pub(crate) fn condition(msg: impl Into<String>) -> Self {
        Self::InvalidCondition(msg.into())
    }
}

/// Crate result alias
pub type Result<T> = std::result::Result<T, Error>;
