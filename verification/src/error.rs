use crate::liveness::SessionId;
use idgate_access::{AccessError, DenyReason};
use idgate_store::StoreError;
use idgate_types::{LivenessAction, UserId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("similarity score {0} is outside [0, 1]")]
    InvalidScore(f64),

    #[error("liveness confidence {0} is outside [0, 1]")]
    InvalidConfidence(f64),

    #[error("document reference must not be empty")]
    EmptyDocumentReference,

    #[error("no verification record for user {0}")]
    UnknownUser(UserId),

    #[error("liveness session {0} not found")]
    SessionNotFound(SessionId),

    #[error("liveness session {0} has expired")]
    SessionExpired(SessionId),

    #[error("liveness session {session} does not belong to user {user}")]
    SessionOwnership { session: SessionId, user: UserId },

    #[error("liveness action {action} failed {attempts} times, session aborted")]
    LivenessRetriesExhausted { action: LivenessAction, attempts: u32 },

    #[error("verification failed: {0}")]
    TerminalFailure(String),

    #[error("user {0} is fully verified")]
    AlreadyVerified(UserId),

    #[error("access denied: {0}")]
    PolicyDenied(#[from] DenyReason),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl VerificationError {
    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}
