use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by the watcher. Transport and protocol failures both
/// collapse to `RedemptionOutcome::Failed` at the redeemer boundary; the
/// distinction only matters for logging.
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("http request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("http request failed after retries: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    #[error("portal returned {status} for {url}")]
    BadStatus { status: StatusCode, url: String },

    #[error("no csrf-token meta tag on the rewards page")]
    MissingToken,

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type WatcherResult<T> = Result<T, WatcherError>;

impl WatcherError {
    /// Non-2xx responses get folded into a single variant so callers can
    /// carry the offending URL into the log line.
    pub fn bad_status(status: StatusCode, url: impl Into<String>) -> Self {
        WatcherError::BadStatus {
            status,
            url: url.into(),
        }
    }
}
