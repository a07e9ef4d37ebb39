use thiserror::Error;

/// Lookup failures from the geocoding client.
///
/// A well-formed response with no candidates is not an error; the client
/// returns `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Network, TLS or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The body parsed but a field the lookup depends on is missing.
    #[error("malformed geocoding response for {context}: {reason}")]
    Malformed { context: String, reason: String },

    #[error("invalid base URL '{base_url}': {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}
