//! Unified error handling for the charge core.
//!
//! Every gateway, session or persistence fault is converted into one of
//! these kinds before it reaches the HTTP boundary; callers always see a
//! structured `{error: {code, message, details}}` body, never a raw
//! transport or database error.

use crate::charges::session::SessionError;
use crate::gateway::error::GatewayError;
use crate::ledger::store::LedgerError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// Malformed caller input. Rejected before any gateway call, no side
    /// effects.
    #[error("validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Transport failure after the retry budget was exhausted.
    #[error("gateway unavailable: {message}")]
    GatewayUnavailable { message: String },

    /// Well-formed decline or failure from the gateway.
    #[error("gateway rejected the charge: {message}")]
    GatewayRejected { message: String },

    /// Response missing the fields expected for the current phase.
    #[error("unexpected gateway response: {message}")]
    UnexpectedResponse { message: String },

    /// Ledger/balance write failure. The settlement transaction rolled back.
    #[error("persistence failure: {message}")]
    Persistence { message: String },

    /// No pending charge matches the reference, the caller, or the phase.
    #[error("no pending charge for reference {reference}")]
    ChallengeNotFound { reference: String },
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::GatewayUnavailable { .. } => "GATEWAY_UNAVAILABLE",
            AppError::GatewayRejected { .. } => "PAYMENT_REJECTED",
            AppError::UnexpectedResponse { .. } => "UNEXPECTED_GATEWAY_RESPONSE",
            AppError::Persistence { .. } => "PERSISTENCE_ERROR",
            AppError::ChallengeNotFound { .. } => "CHALLENGE_NOT_FOUND",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::GatewayUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::GatewayRejected { .. } => StatusCode::PAYMENT_REQUIRED,
            AppError::UnexpectedResponse { .. } => StatusCode::BAD_GATEWAY,
            AppError::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ChallengeNotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    /// User-safe message. Gateway-provided decline reasons pass through;
    /// internal faults degrade to a generic phrase.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation { message, .. } => message.clone(),
            AppError::GatewayUnavailable { .. } => "Failed after multiple retries".to_string(),
            AppError::GatewayRejected { message } => {
                if message.trim().is_empty() {
                    "Transaction failed".to_string()
                } else {
                    message.clone()
                }
            }
            AppError::UnexpectedResponse { .. } => "Transaction failed".to_string(),
            AppError::Persistence { .. } => {
                "An error occurred during payment processing".to_string()
            }
            AppError::ChallengeNotFound { .. } => {
                "No pending charge matches this reference".to_string()
            }
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Network { message } => AppError::GatewayUnavailable { message },
            GatewayError::Unavailable { attempts } => AppError::GatewayUnavailable {
                message: format!("gave up after {} attempts", attempts),
            },
            GatewayError::Rejected { message } => AppError::GatewayRejected { message },
            GatewayError::UnexpectedShape { message } => AppError::UnexpectedResponse { message },
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::ActorNotFound { actor_id } => AppError::Validation {
                message: format!("unknown actor {}", actor_id),
                field: Some("actor".to_string()),
            },
            LedgerError::Storage { message } => AppError::Persistence { message },
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound { reference } | SessionError::Mismatch { reference } => {
                AppError::ChallengeNotFound { reference }
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.user_message(),
                details: match &self {
                    AppError::Validation { field, .. } => field.clone(),
                    _ => None,
                },
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_the_taxonomy() {
        assert_eq!(
            AppError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::GatewayUnavailable {
                message: "down".to_string()
            }
            .status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::GatewayRejected {
                message: "declined".to_string()
            }
            .status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            AppError::Persistence {
                message: "tx aborted".to_string()
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn exhausted_retries_surface_the_generic_retry_message() {
        let err: AppError = GatewayError::Unavailable { attempts: 3 }.into();
        assert_eq!(err.user_message(), "Failed after multiple retries");
    }

    #[test]
    fn gateway_decline_messages_pass_through() {
        let err: AppError = GatewayError::Rejected {
            message: "Insufficient funds".to_string(),
        }
        .into();
        assert_eq!(err.user_message(), "Insufficient funds");

        let err = AppError::GatewayRejected {
            message: "   ".to_string(),
        };
        assert_eq!(err.user_message(), "Transaction failed");
    }

    #[test]
    fn unexpected_shapes_degrade_to_a_generic_message() {
        let err: AppError = GatewayError::UnexpectedShape {
            message: "missing reference".to_string(),
        }
        .into();
        assert_eq!(err.user_message(), "Transaction failed");
    }
}
