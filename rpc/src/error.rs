//! RPC error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use idgate_access::{AccessError, DenyReason};
use idgate_verification::VerificationError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error("server error: {0}")]
    Server(String),
}

impl From<AccessError> for RpcError {
    fn from(e: AccessError) -> Self {
        Self::Verification(e.into())
    }
}

/// Body returned when a preset denies access.
#[derive(Debug, Serialize)]
pub struct DenialBody {
    pub allowed: bool,
    pub requires_verification: bool,
    pub verification_step: idgate_types::StepId,
    pub reason: &'static str,
    pub title: &'static str,
    pub message: String,
}

impl From<DenyReason> for DenialBody {
    fn from(reason: DenyReason) -> Self {
        Self {
            allowed: false,
            requires_verification: true,
            verification_step: reason.remediation(),
            reason: reason.code(),
            title: reason.title(),
            message: reason.message(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl RpcError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Verification(e) => match e {
                VerificationError::InvalidScore(_)
                | VerificationError::InvalidConfidence(_)
                | VerificationError::EmptyDocumentReference
                | VerificationError::Access(_) => StatusCode::BAD_REQUEST,
                VerificationError::UnknownUser(_) | VerificationError::SessionNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                VerificationError::SessionExpired(_) => StatusCode::GONE,
                VerificationError::SessionOwnership { .. } | VerificationError::PolicyDenied(_) => {
                    StatusCode::FORBIDDEN
                }
                VerificationError::LivenessRetriesExhausted { .. }
                | VerificationError::TerminalFailure(_)
                | VerificationError::AlreadyVerified(_) => StatusCode::CONFLICT,
                VerificationError::Store(s) if s.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
                VerificationError::Store(_) | VerificationError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Server(_) => "server_error",
            Self::Verification(e) => match e {
                VerificationError::InvalidScore(_) => "invalid_score",
                VerificationError::InvalidConfidence(_) => "invalid_confidence",
                VerificationError::EmptyDocumentReference => "empty_document_reference",
                VerificationError::Access(_) => "unknown_preset",
                VerificationError::UnknownUser(_) => "unknown_user",
                VerificationError::SessionNotFound(_) => "session_not_found",
                VerificationError::SessionExpired(_) => "session_expired",
                VerificationError::SessionOwnership { .. } => "session_ownership",
                VerificationError::PolicyDenied(_) => "policy_denied",
                VerificationError::LivenessRetriesExhausted { .. } => "liveness_retries_exhausted",
                VerificationError::TerminalFailure(_) => "verification_failed",
                VerificationError::AlreadyVerified(_) => "already_verified",
                VerificationError::Store(_) => "storage_error",
                VerificationError::Internal(_) => "internal_error",
            },
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let Self::Verification(VerificationError::PolicyDenied(reason)) = &self {
            return (status, Json(DenialBody::from(*reason))).into_response();
        }
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        // Storage and internal details stay in the log.
        let message = if status.is_server_error() {
            status
                .canonical_reason()
                .unwrap_or("server error")
                .to_string()
        } else {
            self.to_string()
        };
        let body = ErrorBody {
            error: self.code(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idgate_store::StoreError;
    use idgate_types::UserId;
    use idgate_verification::SessionId;

    fn status(e: VerificationError) -> StatusCode {
        RpcError::from(e).status_code()
    }

    #[test]
    fn verification_errors_map_to_status_codes() {
        assert_eq!(status(VerificationError::InvalidScore(2.0)), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(VerificationError::UnknownUser(UserId::new("x").unwrap())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(VerificationError::SessionNotFound(SessionId::new(1))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(VerificationError::SessionExpired(SessionId::new(1))),
            StatusCode::GONE
        );
        assert_eq!(
            status(VerificationError::PolicyDenied(DenyReason::EmailRequired)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(VerificationError::TerminalFailure("fraud".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(VerificationError::Store(StoreError::Unavailable("down".into()))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(VerificationError::Store(StoreError::Serialization("bad".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unknown_preset_is_bad_request() {
        let e = RpcError::from(AccessError::UnknownPreset("vip".into()));
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
    }
}
