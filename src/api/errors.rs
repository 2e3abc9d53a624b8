//! API Error Handling
//!
//! Every failure leaves the server in the same `{success, error, message}`
//! envelope used for successful responses, with the matching HTTP status.

use super::models::ApiResponse;
use crate::errors::ValidationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;

/// Message returned in place of internal details outside development
pub const GENERIC_INTERNAL_MESSAGE: &str = "An unexpected error occurred";

/// API error with the request id it belongs to
#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub request_id: String,
}

#[derive(Debug)]
pub enum ApiErrorKind {
    MissingWallet,
    InvalidWallet,
    Validation(String),
    NotFound(String),
    /// Rejected by a rate limiter; `error` is the short reason shown to clients
    RateLimited { error: &'static str, message: &'static str },
    /// `details` is only rendered when `expose_details` is set
    Internal { details: String, expose_details: bool },
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn missing_wallet(request_id: String) -> Self {
        Self {
            kind: ApiErrorKind::MissingWallet,
            request_id,
        }
    }

    pub fn invalid_wallet(request_id: String) -> Self {
        Self {
            kind: ApiErrorKind::InvalidWallet,
            request_id,
        }
    }

    pub fn validation(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::Validation(message),
            request_id,
        }
    }

    pub fn not_found(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::NotFound(message),
            request_id,
        }
    }

    /// General per-client request budget exhausted
    pub fn too_many_requests(request_id: String) -> Self {
        Self {
            kind: ApiErrorKind::RateLimited {
                error: "Too many requests",
                message: "Please wait before making another request",
            },
            request_id,
        }
    }

    /// Spin cooldown for one wallet still running
    pub fn too_fast(request_id: String) -> Self {
        Self {
            kind: ApiErrorKind::RateLimited {
                error: "Too fast",
                message: "Please wait a few seconds between spins",
            },
            request_id,
        }
    }

    pub fn internal_error(request_id: String, details: String, expose_details: bool) -> Self {
        Self {
            kind: ApiErrorKind::Internal {
                details,
                expose_details,
            },
            request_id,
        }
    }

    pub fn service_unavailable(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::ServiceUnavailable(message),
            request_id,
        }
    }

    pub fn status(&self) -> StatusCode {
        match &self.kind {
            ApiErrorKind::MissingWallet | ApiErrorKind::InvalidWallet | ApiErrorKind::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiErrorKind::NotFound(_) => StatusCode::NOT_FOUND,
            ApiErrorKind::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiErrorKind::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiErrorKind::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// `(error, message)` pair for the envelope
    fn parts(&self) -> (String, String) {
        match &self.kind {
            ApiErrorKind::MissingWallet => (
                "Missing wallet address".to_string(),
                ValidationError::MissingWallet.to_string(),
            ),
            ApiErrorKind::InvalidWallet => (
                "Invalid wallet address".to_string(),
                ValidationError::InvalidWallet.to_string(),
            ),
            ApiErrorKind::Validation(msg) => ("Validation error".to_string(), msg.clone()),
            ApiErrorKind::NotFound(msg) => ("Not found".to_string(), msg.clone()),
            ApiErrorKind::RateLimited { error, message } => (error.to_string(), message.to_string()),
            ApiErrorKind::Internal {
                details,
                expose_details,
            } => {
                let message = if *expose_details {
                    details.clone()
                } else {
                    GENERIC_INTERNAL_MESSAGE.to_string()
                };
                ("Internal server error".to_string(), message)
            }
            ApiErrorKind::ServiceUnavailable(msg) => ("Service unavailable".to_string(), msg.clone()),
        }
    }
}

impl From<(String, ValidationError)> for ApiError {
    fn from((request_id, error): (String, ValidationError)) -> Self {
        match error {
            ValidationError::MissingWallet => ApiError::missing_wallet(request_id),
            ValidationError::InvalidWallet => ApiError::invalid_wallet(request_id),
            other => ApiError::validation(request_id, other.to_string()),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (error, _) = self.parts();
        match &self.kind {
            ApiErrorKind::Internal { details, .. } => write!(f, "[{}] {}: {}", self.request_id, error, details),
            _ => write!(f, "[{}] {}: {}", self.request_id, error, self.parts().1),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(request_id = %self.request_id, "{}", self);
        } else {
            tracing::debug!(request_id = %self.request_id, "{}", self);
        }

        let (error, message) = self.parts();
        (status, Json(ApiResponse::<()>::failure(error, message))).into_response()
    }
}
