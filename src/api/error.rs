use thiserror::Error;

/// Failure talking to the monitoring backend.
///
/// Every variant is recoverable: callers turn it into an inline error state
/// and wait for the next refresh.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("invalid JSON from {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Short message suitable for an error card.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(_) => "The monitoring server has no such resource".to_string(),
            Self::Status { status, .. } => format!("Server responded with HTTP {status}"),
            Self::Transport { .. } => {
                "Could not reach the monitoring server. Make sure it is running.".to_string()
            }
            Self::Decode { .. } => "The monitoring server sent an unreadable response".to_string(),
        }
    }
}
