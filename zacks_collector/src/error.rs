//! Error taxonomy for the collector core
//! Every remote failure carries the HTTP status it came back with

use thiserror::Error;

use crate::session::SessionState;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("login failed with status {0}")]
    AuthenticationFailed(u16),

    #[error("stock screener page returned status {0}")]
    ContextPageFailed(u16),

    #[error("no context key found in stock screener page")]
    ContextKeyNotFound,

    #[error("screener API session init failed with status {0}")]
    SessionInitFailed(u16),

    #[error("reset of screener query state failed with status {0}")]
    ResetFailed(u16),

    #[error("malformed filter spec: {0}")]
    MalformedSpec(String),

    #[error("operator {operator:?} is not supported for filter {id}")]
    UnsupportedOperator { id: String, operator: String },

    #[error("invalid value {value:?} for {id}: {reason}")]
    InvalidValue {
        id: String,
        value: String,
        reason: String,
    },

    #[error("value {value} for {id} is outside {min}..={max}")]
    OutOfRange {
        id: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("screener query submit failed with status {0}")]
    QuerySubmitFailed(u16),

    #[error("download failed with status {0}")]
    DownloadFailed(u16),

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("session is {actual:?}, expected {expected:?}")]
    InvalidState {
        expected: SessionState,
        actual: SessionState,
    },

    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed CSV payload: {0}")]
    Csv(#[from] csv::Error),

    #[error("parquet export failed: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow batch failed: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// Errors the flow may log and continue past.
    pub fn is_warning(&self) -> bool {
        matches!(self, ScrapeError::ResetFailed(_))
    }

    /// HTTP status attached to a remote failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ScrapeError::AuthenticationFailed(s)
            | ScrapeError::ContextPageFailed(s)
            | ScrapeError::SessionInitFailed(s)
            | ScrapeError::ResetFailed(s)
            | ScrapeError::QuerySubmitFailed(s)
            | ScrapeError::DownloadFailed(s) => Some(*s),
            ScrapeError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
