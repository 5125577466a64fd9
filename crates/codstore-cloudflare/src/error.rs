use thiserror::Error;

/// Errors returned by the Cloudflare Analytics client.
#[derive(Debug, Error)]
pub enum CloudflareError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The GraphQL response carried an `errors` array.
    #[error("Cloudflare API error: {0}")]
    ApiError(String),

    /// The response body could not be deserialized into the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
