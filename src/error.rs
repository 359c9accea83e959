use thiserror::Error;

/// Error type shared by the collector and the reporting layer.
///
/// Propagation policy:
/// - `UnsupportedExchange` is a caller error and fails the single call.
/// - `Upstream` is returned by the REST client; the runner converts it
///   into a logged skip for that market.
/// - Store failures use `StoreError` and never leave a gateway as
///   `Err`; gateways report them through `WriteOutcome` / `ReadOutcome`.
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("{name} is not supported. Supported exchanges: {}", .supported.join(", "))]
    UnsupportedExchange {
        name: String,
        supported: Vec<&'static str>,
    },

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for CollectorError {
    fn from(e: reqwest::Error) -> Self {
        Self::Upstream(e.to_string())
    }
}

/// Failures against the backing store.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Http(String),

    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Http(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, CollectorError>;
