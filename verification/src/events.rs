//! Domain events emitted as verification progresses.

use crate::liveness::SessionId;
use idgate_types::{CheckResult, LivenessAction, RetryStep, UserId};
use serde::Serialize;
use tracing::info;

/// Events emitted by the evaluator, the liveness controller and the service.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VerificationEvent {
    EmailLinkSent {
        user_id: UserId,
    },
    EmailVerified {
        user_id: UserId,
    },
    DocumentsUploaded {
        user_id: UserId,
    },
    /// Outcome of a single face comparison, pass or fail.
    FaceVerificationResult {
        user_id: UserId,
        passed: bool,
        similarity_score: f64,
    },
    LivenessCheckRecorded {
        user_id: UserId,
        session: SessionId,
        action: LivenessAction,
        result: CheckResult,
        confidence: f64,
    },
    /// Every action in the session has passed.
    LivenessSessionCompleted {
        user_id: UserId,
        session: SessionId,
    },
    /// The per-action failure cap was reached.
    LivenessSessionAborted {
        user_id: UserId,
        session: SessionId,
        action: LivenessAction,
    },
    StepReset {
        user_id: UserId,
        step: RetryStep,
    },
    /// The record transitioned into `Verified`.
    VerificationCompleted {
        user_id: UserId,
    },
    VerificationFailed {
        user_id: UserId,
        reason: String,
    },
}

impl VerificationEvent {
    pub fn user_id(&self) -> &UserId {
        match self {
            Self::EmailLinkSent { user_id }
            | Self::EmailVerified { user_id }
            | Self::DocumentsUploaded { user_id }
            | Self::FaceVerificationResult { user_id, .. }
            | Self::LivenessCheckRecorded { user_id, .. }
            | Self::LivenessSessionCompleted { user_id, .. }
            | Self::LivenessSessionAborted { user_id, .. }
            | Self::StepReset { user_id, .. }
            | Self::VerificationCompleted { user_id }
            | Self::VerificationFailed { user_id, .. } => user_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmailLinkSent { .. } => "email_link_sent",
            Self::EmailVerified { .. } => "email_verified",
            Self::DocumentsUploaded { .. } => "documents_uploaded",
            Self::FaceVerificationResult { .. } => "face_verification_result",
            Self::LivenessCheckRecorded { .. } => "liveness_check_recorded",
            Self::LivenessSessionCompleted { .. } => "liveness_session_completed",
            Self::LivenessSessionAborted { .. } => "liveness_session_aborted",
            Self::StepReset { .. } => "step_reset",
            Self::VerificationCompleted { .. } => "verification_completed",
            Self::VerificationFailed { .. } => "verification_failed",
        }
    }
}

/// Receiver for [`VerificationEvent`]s.
///
/// Implementations must not block for long: events are emitted after the
/// store commit, on the caller's thread.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: VerificationEvent);
}

/// Writes every event to the `tracing` log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: VerificationEvent) {
        info!(event = event.kind(), user = %event.user_id(), "verification event");
    }
}
