//! Fetch error types.

/// Errors from the fetch boundary.
///
/// `Cancelled` is absorbed by the session and never surfaced to callers;
/// everything else is converted into the session's visible `error` string.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// The request's cancellation signal fired.
    #[error("request cancelled")]
    Cancelled,

    /// The server answered with a non-success status.
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// The response body could not be decoded as JSON.
    #[error("decode error: {0}")]
    Decode(String),

    /// Connection-level failure (DNS, timeout, refused, ...).
    #[error("network error: {0}")]
    Network(String),
}

impl FetchError {
    /// Whether this error must be silently absorbed rather than surfaced.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}
