// src/errors.rs
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkinsightError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upstream rejected request: {0}")]
    BadRequest(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("AI service unavailable")]
    UpstreamUnavailable,

    #[error("AI service error: {0}")]
    Upstream(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Invalid analysis result: {0}")]
    InvalidResult(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SkinsightError {
    /// Stable machine-readable tag for the HTTP body.
    pub fn kind(&self) -> &'static str {
        match self {
            SkinsightError::Config(_) => "config",
            SkinsightError::Validation(_) => "validation",
            SkinsightError::BadRequest(_) => "bad_request",
            SkinsightError::Network(_) => "network",
            SkinsightError::Timeout => "timeout",
            SkinsightError::RateLimited => "rate_limited",
            SkinsightError::UpstreamUnavailable => "upstream_unavailable",
            SkinsightError::Upstream(_) => "upstream_error",
            SkinsightError::MalformedResponse(_) => "malformed_response",
            SkinsightError::InvalidResult(_) => "invalid_result",
            SkinsightError::Storage(_) => "storage",
            SkinsightError::Serialization(_) => "serialization",
        }
    }

    /// Whether a repeat of the same call may succeed without operator
    /// intervention. Config errors need a key fix; validation errors need
    /// new input from the user.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            SkinsightError::Config(_) | SkinsightError::Validation(_)
        )
    }

    /// Message safe to show directly in the app.
    pub fn user_message(&self) -> String {
        match self {
            SkinsightError::Config(_) => {
                "The analysis service is not configured correctly. Please contact support."
                    .to_string()
            }
            SkinsightError::Validation(msg) => msg.clone(),
            SkinsightError::BadRequest(msg) => format!("Request failed: {}", msg),
            SkinsightError::Network(_) => {
                "Network connection failed. Please check your internet connection and try again."
                    .to_string()
            }
            SkinsightError::Timeout => {
                "Request timed out. Please check your connection and try again.".to_string()
            }
            SkinsightError::RateLimited => {
                "Rate limit exceeded. Please wait a moment and try again.".to_string()
            }
            SkinsightError::UpstreamUnavailable => {
                "The AI service is temporarily unavailable. Please try again in a moment."
                    .to_string()
            }
            SkinsightError::Upstream(_) => {
                "The analysis service returned an error. Please try again.".to_string()
            }
            SkinsightError::MalformedResponse(_) => {
                "The analysis came back incomplete. Please try again.".to_string()
            }
            SkinsightError::InvalidResult(msg) => msg.clone(),
            SkinsightError::Storage(_) | SkinsightError::Serialization(_) => {
                "Something went wrong on our side. Please try again.".to_string()
            }
        }
    }
}

impl ResponseError for SkinsightError {
    fn status_code(&self) -> StatusCode {
        match self {
            SkinsightError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SkinsightError::Validation(_) => StatusCode::BAD_REQUEST,
            SkinsightError::BadRequest(_) => StatusCode::BAD_REQUEST,
            SkinsightError::Network(_) => StatusCode::BAD_GATEWAY,
            SkinsightError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            SkinsightError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            SkinsightError::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            SkinsightError::Upstream(_) => StatusCode::BAD_GATEWAY,
            SkinsightError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
            SkinsightError::InvalidResult(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SkinsightError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SkinsightError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.kind(),
            "message": self.user_message(),
            "retryable": self.is_retryable(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_tells_the_user_to_wait() {
        assert!(SkinsightError::RateLimited.user_message().contains("wait a moment"));
        assert_eq!(
            SkinsightError::RateLimited.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn config_and_validation_are_not_retryable() {
        assert!(!SkinsightError::Config("missing key".into()).is_retryable());
        assert!(!SkinsightError::Validation("no image".into()).is_retryable());
        assert!(SkinsightError::Timeout.is_retryable());
        assert!(SkinsightError::MalformedResponse("truncated".into()).is_retryable());
        assert!(SkinsightError::UpstreamUnavailable.is_retryable());
    }
}
