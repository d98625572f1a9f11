//! Verification status summary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cached summary of a user's verification progress.
///
/// Always derived from the record's step flags; never set directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Nothing has happened yet.
    Unverified,
    /// A confirmation link was sent but not yet redeemed.
    EmailPending,
    EmailVerified,
    DocumentsUploaded,
    /// Face match passed while an earlier step is still (or again) open.
    FaceVerified,
    /// Email, documents and face match all complete.
    Verified,
    /// Terminal failure; only a retry of the failed step leaves this state.
    Failed,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unverified => "unverified",
            Self::EmailPending => "email_pending",
            Self::EmailVerified => "email_verified",
            Self::DocumentsUploaded => "documents_uploaded",
            Self::FaceVerified => "face_verified",
            Self::Verified => "verified",
            Self::Failed => "failed",
        }
    }

    /// Short label for status widgets.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unverified => "Not Started",
            Self::EmailPending => "Email Verification Pending",
            Self::EmailVerified => "Email Verified",
            Self::DocumentsUploaded => "Documents Processing",
            Self::FaceVerified => "Face Verification Complete",
            Self::Verified => "Fully Verified",
            Self::Failed => "Verification Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified | Self::Failed)
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
