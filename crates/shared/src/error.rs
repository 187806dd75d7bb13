use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    RateLimited,
    Internal,
    Other,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            400 | 409 | 422 => Self::Validation,
            429 => Self::RateLimited,
            500..=599 => Self::Internal,
            _ => Self::Other,
        }
    }
}

/// A non-2xx answer from the TaskFlow API.
///
/// `message` is built from the status line and whatever body text could be
/// read, e.g. `"404 Not Found: {\"detail\":\"Tarea no encontrada\"}"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("Error {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

#[derive(Deserialize)]
struct DetailBody {
    detail: serde_json::Value,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn from_response_parts(status: u16, reason: Option<&str>, body: &str) -> Self {
        let status_line = match reason {
            Some(reason) if !reason.is_empty() => format!("{status} {reason}"),
            _ => status.to_string(),
        };
        Self::new(status, format!("{status_line}: {body}").trim().to_string())
    }

    pub fn code(&self) -> ErrorCode {
        ErrorCode::from_status(self.status)
    }

    /// Server-provided `detail` text when the body was a FastAPI error
    /// document, otherwise the full message.
    pub fn detail(&self) -> String {
        let body = self
            .message
            .split_once(": ")
            .map(|(_, body)| body)
            .unwrap_or_default();
        match serde_json::from_str::<DetailBody>(body) {
            Ok(DetailBody {
                detail: serde_json::Value::String(text),
            }) => text,
            Ok(DetailBody { detail }) => detail.to_string(),
            Err(_) => self.message.clone(),
        }
    }
}
