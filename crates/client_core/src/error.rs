use shared::error::ApiError;
use thiserror::Error;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// A required argument was missing; raised before any request is sent.
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("authentication failed: {status} {message}")]
    Auth { status: u16, message: String },
    #[error("not signed in")]
    Unauthenticated,
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("session storage error: {0}")]
    Storage(#[source] anyhow::Error),
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(err) => Some(err.status),
            Self::Auth { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            Self::Validation(_) | Self::Unauthenticated | Self::Storage(_) => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::Auth { .. }) || self.status() == Some(401)
    }
}

pub(crate) fn require_text(value: &str, field: &str) -> ClientResult<()> {
    if value.is_empty() {
        return Err(ClientError::validation(format!("{field} is required")));
    }
    Ok(())
}
