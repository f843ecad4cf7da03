//! Client-side error type

use casebook_common::errors::ErrorResponse;
use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    /// The server answered with a non-success status
    #[error("{status}: {message}")]
    Api {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Session storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Build from a failed response body. Bodies that are not the API's
    /// error shape keep their raw text as the message.
    pub(crate) fn from_body(status: StatusCode, body: &str) -> Self {
        match serde_json::from_str::<ErrorResponse>(body) {
            Ok(parsed) => ClientError::Api {
                status,
                code: serde_json::to_value(parsed.error.code)
                    .ok()
                    .and_then(|code| code.as_str().map(str::to_string)),
                message: parsed.error.message,
            },
            Err(_) => ClientError::Api {
                status,
                code: None,
                message: body.to_string(),
            },
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_api_error_body() {
        let body = r#"{"error":{"code":"DUPLICATE_EMAIL","message":"Email already exists."}}"#;
        let err = ClientError::from_body(StatusCode::CONFLICT, body);

        match &err {
            ClientError::Api { code, message, .. } => {
                assert_eq!(code.as_deref(), Some("DUPLICATE_EMAIL"));
                assert_eq!(message, "Email already exists.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.to_string(), "409 Conflict: Email already exists.");
    }

    #[test]
    fn test_keeps_raw_body() {
        let err = ClientError::from_body(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(err, ClientError::Api { code: None, ref message, .. } if message == "upstream down"));
        assert!(!err.is_not_found());
    }
}
