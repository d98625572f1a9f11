//! Parse errors for the wire representations of the shared enums.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("invalid user id: {0}")]
    InvalidUserId(String),

    #[error("unknown liveness action: {0}")]
    UnknownLivenessAction(String),

    #[error("unknown verification step: {0}")]
    UnknownStep(String),

    #[error("unknown document kind: {0}")]
    UnknownDocumentKind(String),
}
