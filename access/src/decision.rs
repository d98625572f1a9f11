//! Authorization outcomes.

use idgate_types::StepId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why access was refused. Each reason maps to the step that fixes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum DenyReason {
    #[error("email verification required")]
    EmailRequired,

    #[error("identity documents required")]
    DocumentsRequired,

    #[error("face verification required")]
    FaceVerificationRequired,

    #[error("at least {min_checks} passing liveness check(s) required")]
    LivenessRequired { min_checks: u32 },

    #[error("a recent liveness check is required")]
    FreshLivenessRequired,
}

impl DenyReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmailRequired => "email_required",
            Self::DocumentsRequired => "documents_required",
            Self::FaceVerificationRequired => "face_verification_required",
            Self::LivenessRequired { .. } => "liveness_required",
            Self::FreshLivenessRequired => "fresh_liveness_required",
        }
    }

    /// The verification step the user has to complete next.
    pub fn remediation(&self) -> StepId {
        match self {
            Self::EmailRequired => StepId::EmailVerification,
            Self::DocumentsRequired => StepId::DocumentUpload,
            Self::FaceVerificationRequired => StepId::FaceComparison,
            Self::LivenessRequired { .. } | Self::FreshLivenessRequired => StepId::LivenessCheck,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::EmailRequired => "Email Verification Required",
            Self::DocumentsRequired => "Document Upload Required",
            Self::FaceVerificationRequired => "Face Verification Required",
            Self::LivenessRequired { .. } => "Liveness Check Required",
            Self::FreshLivenessRequired => "Fresh Liveness Check Required",
        }
    }

    /// User-facing explanation.
    pub fn message(&self) -> String {
        match self {
            Self::EmailRequired => "Please verify your email address to continue.".into(),
            Self::DocumentsRequired => {
                "Please upload your identity documents to continue.".into()
            }
            Self::FaceVerificationRequired => {
                "Please complete face verification to continue.".into()
            }
            Self::LivenessRequired { min_checks } => format!(
                "This action requires at least {min_checks} liveness verification{} for security.",
                if *min_checks == 1 { "" } else { "s" }
            ),
            Self::FreshLivenessRequired => "A recent liveness check is required for this action. \
                 Please complete a new verification."
                .into(),
        }
    }
}

/// Result of evaluating a requirement set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Self::Allow => None,
            Self::Deny(reason) => Some(*reason),
        }
    }

    /// For callers that treat a deny as an early return.
    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(reason) => Err(reason),
        }
    }
}
