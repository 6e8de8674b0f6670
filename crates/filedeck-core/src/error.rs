use thiserror::Error;

/// Failure of a single store operation.
///
/// Every variant collapses into a `false`/`None` return plus a
/// human-readable `last_error` at the store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request never completed (DNS, connect, reset, body read).
    #[error("network failure: {0}")]
    Network(String),
    /// The server answered with a non-2xx status.
    #[error("server returned HTTP {status}{}", suffix(.message))]
    Server { status: u16, message: Option<String> },
    /// The server answered 2xx but the body is unusable.
    #[error("invalid response (HTTP {status}): {reason}")]
    InvalidResponse { status: u16, reason: String },
    #[error("{0}")]
    Validation(String),
    /// The downloaded bytes could not be handed to the sink.
    #[error("failed to save {name}: {reason}")]
    Save { name: String, reason: String },
    /// The listing source returned something unusable.
    #[error("invalid file listing: {0}")]
    Listing(String),
}

fn suffix(message: &Option<String>) -> String {
    match message {
        Some(m) if !m.is_empty() => format!(": {}", m),
        _ => String::new(),
    }
}

impl StoreError {
    /// Message shown to the user: the server-supplied message or the
    /// validation text, otherwise `default`.
    pub fn user_message(&self, default: &str) -> String {
        match self {
            StoreError::Server {
                message: Some(message),
                ..
            } if !message.is_empty() => message.clone(),
            StoreError::Validation(message) => message.clone(),
            _ => default.to_string(),
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Network(e.to_string())
    }
}
