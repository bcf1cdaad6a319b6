use std::time::Duration;

use thiserror::Error;

/// Failure of one `get_valid_access_token` call.
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("invalid resource URL '{url}': {reason}")]
    InvalidResource { url: String, reason: String },

    #[error("OAuth discovery failed: {0}")]
    Discovery(String),

    #[error("client registration failed: {0}")]
    Registration(String),

    #[error("authorization failed{}: {message}", refresh_note(.after_refresh))]
    Authorization { message: String, after_refresh: bool },

    #[error("no authorization callback received within {0:?}")]
    CallbackTimeout(Duration),

    #[error("authorization was cancelled")]
    Cancelled,

    #[error("loopback listener error: {0}")]
    Listener(#[from] std::io::Error),
}

fn refresh_note(after_refresh: &bool) -> &'static str {
    if *after_refresh {
        " (token refresh was attempted first and failed)"
    } else {
        ""
    }
}

impl OAuthError {
    pub(crate) fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
            after_refresh: false,
        }
    }

    /// Record that a refresh attempt preceded this failure.
    pub(crate) fn after_refresh(self, attempted: bool) -> Self {
        match self {
            Self::Authorization { message, .. } => Self::Authorization {
                message,
                after_refresh: attempted,
            },
            other => other,
        }
    }
}
