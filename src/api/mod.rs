pub mod auth;
pub mod model;
pub mod users;

use serde::{Deserialize, Serialize};

pub(crate) const USERS_API: &str = "/api/v1/users";

/// Uniform response shape for operations that acknowledge rather than
/// return an entity (delete, reset-password). The backend uses the same
/// shape for error bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub http_status_code: u16,
    pub http_status: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    /// The backend reported a structured application error
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("JSON parsing error: {0}")]
    Json(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
}

impl ApiError {
    /// Human-readable message suitable for a notification. Structured
    /// backend messages are surfaced verbatim; everything else keeps its
    /// error description.
    pub fn notification_message(&self) -> String {
        match self {
            ApiError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub(crate) fn build_client() -> Result<reqwest::Client, ApiError> {
    reqwest::Client::builder()
        .user_agent(format!("uadm/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ApiError::Network(e.to_string()))
}

/// Convert a non-success response into the matching error variant,
/// preserving the backend's envelope message when one is present.
pub(crate) async fn error_from_response(response: reqwest::Response) -> ApiError {
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    match serde_json::from_str::<ResponseEnvelope>(&text) {
        Ok(envelope) => ApiError::Api {
            status,
            message: envelope.message,
        },
        Err(_) => ApiError::Http { status, body: text },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_parses_backend_error_body() {
        let body = r#"{
            "httpStatusCode": 400,
            "httpStatus": "BAD_REQUEST",
            "reason": "Bad Request",
            "message": "Username already exists"
        }"#;
        let envelope: ResponseEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.http_status_code, 400);
        assert_eq!(envelope.message, "Username already exists");
        assert!(envelope.path.is_none());
    }

    #[test]
    fn api_error_notification_uses_backend_message() {
        let err = ApiError::Api {
            status: 423,
            message: "Account locked".to_string(),
        };
        assert_eq!(err.notification_message(), "Account locked");

        let err = ApiError::Network("connection refused".to_string());
        assert_eq!(
            err.notification_message(),
            "Network error: connection refused"
        );
    }
}
