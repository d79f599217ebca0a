//! Error types shared by the build pipeline.

use thiserror::Error;

use crate::parser::ParseError;

/// Failure while retrieving a document, including cache I/O.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP error: {0}")]
    Status(u16),

    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("cache error: {0}")]
    Cache(#[from] std::io::Error),
}

impl FetchError {
    /// Network failures, 5xx and 429 are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::Status(code) => *code >= 500 || *code == 429,
            FetchError::TooLarge { .. } | FetchError::Cache(_) => false,
        }
    }
}

/// Anything that aborts a build.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("failed to load '{url}': {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("failed to parse '{url}': {source}")]
    Decode {
        url: String,
        #[source]
        source: ParseError,
    },

    #[error("failed to load template: {0}")]
    Template(String),

    #[error("invalid {field} pattern '{pattern}': {source}")]
    Pattern {
        field: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to serialize document: {0}")]
    Serialize(#[from] serde_yaml::Error),
}
