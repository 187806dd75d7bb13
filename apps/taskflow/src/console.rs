//! Console notifications and user-facing error descriptions.

use client_core::{ClientError, NoticeKind, Notifier};
use shared::error::ErrorCode;

use crate::render::Surface;

/// Prints info and success notices to stderr. Error notices are skipped: the
/// caller receives the same error and reports it through [`describe`].
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        if kind != NoticeKind::Error {
            eprintln!("[{kind}] {message}");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Auth,
    Validation,
    NotFound,
    Server,
    Transport,
    Storage,
    Unknown,
}

impl ErrorCategory {
    pub fn of(err: &ClientError) -> Self {
        if err.requires_reauth() {
            return Self::Auth;
        }
        match err {
            ClientError::Validation(_) => Self::Validation,
            ClientError::Api(api) => match api.code() {
                ErrorCode::Unauthorized | ErrorCode::Forbidden => Self::Auth,
                ErrorCode::NotFound => Self::NotFound,
                ErrorCode::Validation => Self::Validation,
                ErrorCode::RateLimited | ErrorCode::Internal => Self::Server,
                ErrorCode::Other => Self::Unknown,
            },
            ClientError::Transport(_) => Self::Transport,
            ClientError::Storage(_) => Self::Storage,
            ClientError::Auth { .. } | ClientError::Unauthenticated => Self::Auth,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Auth => "Authentication",
            Self::Validation => "Validation",
            Self::NotFound => "Not found",
            Self::Server => "Server",
            Self::Transport => "Transport",
            Self::Storage => "Session storage",
            Self::Unknown => "Unexpected",
        }
    }
}

/// One-line description for the terminal, with a sign-in hint where useful.
pub fn describe(err: &anyhow::Error, surface: Surface) -> String {
    let Some(client_err) = err.downcast_ref::<ClientError>() else {
        return format!("error: {err:#}");
    };
    let category = ErrorCategory::of(client_err);
    let message = match client_err {
        ClientError::Api(api) => api.detail(),
        other => other.to_string(),
    };
    let mut line = format!("{} error: {message}", category.label());
    if category == ErrorCategory::Auth {
        line.push_str(&format!(" (sign in with {})", surface.sign_in_hint()));
    }
    line
}

#[cfg(test)]
#[path = "tests/console_tests.rs"]
mod tests;
