use serde_json::Value;
use std::{error::Error, sync::Arc};

/// Every way an operation can fail before, during or after it reaches the server.
///
/// Errors are cheap to clone so the dedup exchange can hand the same failure to every
/// coalesced caller.
#[derive(Clone, Debug, thiserror::Error)]
pub enum QueryError {
    /// The request never produced a response (connection refused, DNS, TLS, ...).
    #[error("network error: {0}")]
    Network(Arc<dyn Error + Send + Sync>),

    /// The server answered with a non-success status code.
    #[error("server returned status {status}{}", .message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
    Status {
        status: u16,
        /// The message extracted from the error body, if the body had one.
        message: Option<String>
    },

    /// The response body didn't match the expected envelope.
    #[error("unexpected response shape: {0}")]
    Decode(Arc<serde_json::Error>),

    /// The arguments couldn't be turned into a request.
    #[error("failed to encode request: {0}")]
    Encode(String),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A `CacheOnly` query found nothing usable in the cache.
    #[error("no cached result for {0}")]
    CacheMiss(&'static str),

    /// The in-flight request this caller was waiting on was dropped.
    #[error("the request was dropped before it completed")]
    Cancelled,

    #[error("unexpected end of exchange chain")]
    UnexpectedEndOfChain
}

impl QueryError {
    /// The human readable message the server attached to the failure, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            QueryError::Status {
                message: Some(message),
                ..
            } => Some(message.as_str()),
            _ => None
        }
    }

    /// The message to show a user: the server's own message when it sent one,
    /// `fallback` otherwise.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message()
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| fallback.to_owned())
    }

    /// `true` if the server reported that the resource doesn't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, QueryError::Status { status: 404, .. })
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(e: serde_json::Error) -> Self {
        QueryError::Decode(Arc::new(e))
    }
}

impl From<bincode::Error> for QueryError {
    fn from(e: bincode::Error) -> Self {
        QueryError::Encode(e.to_string())
    }
}

#[cfg(feature = "default-exchanges")]
impl From<reqwest::Error> for QueryError {
    fn from(e: reqwest::Error) -> Self {
        QueryError::Network(Arc::new(e))
    }
}

/// Pull the message out of an error body.
///
/// Servers disagree on where they put it, so this accepts `{error: {message}}`,
/// `{message}`, and either of those wrapped in `{data: ...}`. Anything else yields `None`.
pub fn extract_error_message(body: &Value) -> Option<String> {
    const POINTERS: [&str; 4] = [
        "/error/message",
        "/message",
        "/data/error/message",
        "/data/message"
    ];

    POINTERS
        .iter()
        .filter_map(|pointer| body.pointer(pointer))
        .filter_map(Value::as_str)
        .find(|message| !message.is_empty())
        .map(ToOwned::to_owned)
}
