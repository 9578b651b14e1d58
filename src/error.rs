// src/error.rs

use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;

/// Global client error enum.
/// Centralizes the mapping from HTTP responses and local failures to one taxonomy.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    // Rejected before any network call (missing field, password mismatch, ...)
    Validation(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden (e.g., unverified email, non-admin)
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate username)
    Conflict(String),

    // Any other non-success status
    Server { status: u16, message: String },

    // Transport failure: connection refused, timeout, DNS
    Network(String),

    // Response body did not match the expected shape
    Decode(String),

    // Session persistence failure
    Storage(String),

    Config(String),
}

impl AppError {
    /// Maps a non-success status and its body to an error.
    /// The API reports failures as `{"error": "..."}` or `{"message": "..."}`.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ErrorBody {
            error: Option<String>,
            message: Option<String>,
        }

        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error.or(b.message))
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });

        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                AppError::Validation(message)
            }
            StatusCode::UNAUTHORIZED => AppError::AuthError(message),
            StatusCode::FORBIDDEN => AppError::Forbidden(message),
            StatusCode::NOT_FOUND => AppError::NotFound(message),
            StatusCode::CONFLICT => AppError::Conflict(message),
            other => AppError::Server {
                status: other.as_u16(),
                message,
            },
        }
    }

    /// Text suitable for a user-facing notification.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::Server { status, .. } if *status >= 500 => {
                "Something went wrong on the server. Please try again.".to_string()
            }
            AppError::Server { message, .. } => message.clone(),
            AppError::Network(_) => "Network error. Check your connection.".to_string(),
            AppError::Decode(_) => "Unexpected response from the server.".to_string(),
            AppError::Storage(msg) | AppError::Config(msg) => msg.clone(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "validation failed: {msg}"),
            AppError::AuthError(msg) => write!(f, "unauthorized: {msg}"),
            AppError::Forbidden(msg) => write!(f, "forbidden: {msg}"),
            AppError::NotFound(msg) => write!(f, "not found: {msg}"),
            AppError::Conflict(msg) => write!(f, "conflict: {msg}"),
            AppError::Server { status, message } => write!(f, "server error {status}: {message}"),
            AppError::Network(msg) => write!(f, "network error: {msg}"),
            AppError::Decode(msg) => write!(f, "decode error: {msg}"),
            AppError::Storage(msg) => write!(f, "storage error: {msg}"),
            AppError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

/// Converts transport errors. Body decoding failures become `Decode`.
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            AppError::from_status(status, "")
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_reads_error_field() {
        let err = AppError::from_status(
            StatusCode::FORBIDDEN,
            r#"{"error":"Please verify your email first"}"#,
        );
        assert_eq!(
            err,
            AppError::Forbidden("Please verify your email first".to_string())
        );
    }

    #[test]
    fn status_mapping_falls_back_to_message_then_reason() {
        let err = AppError::from_status(StatusCode::NOT_FOUND, r#"{"message":"Quiz not found"}"#);
        assert_eq!(err, AppError::NotFound("Quiz not found".to_string()));

        let err = AppError::from_status(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert_eq!(
            err,
            AppError::Server {
                status: 502,
                message: "Bad Gateway".to_string()
            }
        );
    }

    #[test]
    fn server_errors_hide_details_from_users() {
        let err = AppError::Server {
            status: 500,
            message: "stack trace".to_string(),
        };
        assert!(!err.user_message().contains("stack trace"));
    }
}
