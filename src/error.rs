//! Errors raised by the AI service clients.
//!
//! Everything else in the crate travels as [`anyhow::Error`]; these variants
//! exist so the engine can tell a transient failure from a permanent one by
//! downcasting.

/// A failed call to the text or image service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No key stored and no environment variable set.
    #[error("no {provider} credentials found. Run `epub-illustrator login {provider}` or set {env_var}.")]
    MissingCredentials {
        provider: &'static str,
        env_var: &'static str,
    },

    /// The service answered with a non-success status.
    #[error("{service} API error ({status}): {message}")]
    Status {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// The request never got an answer.
    #[error("{service} request failed: {source}")]
    Network {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The image service refused the prompt.
    #[error("filtered content: {0}")]
    ContentFiltered(String),

    /// The response did not have the expected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl ApiError {
    /// Whether waiting and asking again has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status {
                status, message, ..
            } => {
                matches!(status, 429 | 500 | 502 | 503 | 504)
                    || message.to_lowercase().contains("overloaded")
            }
            Self::Network { source, .. } => source.is_timeout() || source.is_connect(),
            _ => false,
        }
    }
}

/// Whether an error chain bottoms out in a retryable [`ApiError`].
pub fn is_retryable(err: &anyhow::Error) -> bool {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ApiError>())
        .is_some_and(ApiError::is_retryable)
}

/// Trim a response body to something fit for a log line.
pub fn truncate_body(text: &str) -> String {
    const LIMIT: usize = 500;
    let text = text.trim();
    match text.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
