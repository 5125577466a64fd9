use thiserror::Error;

/// Errors returned by the notification adapters.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success payload.
    #[error("provider error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The event was rejected before sending (bad value, missing field).
    #[error("invalid event: {0}")]
    InvalidEvent(String),
}
