//! Requirement sets.

use serde::{Deserialize, Serialize};

/// What a protected operation demands of the caller's verification record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequirement {
    pub email_verified: bool,
    pub documents_uploaded: bool,
    pub face_verified: bool,
    pub liveness_required: bool,
    /// Passing liveness checks needed; `None` means one.
    pub min_liveness_checks: Option<u32>,
    /// The latest passing liveness check must fall inside the freshness window.
    pub require_fresh_liveness: bool,
}

impl AccessRequirement {
    /// No verification required.
    pub const NONE: Self = Self {
        email_verified: false,
        documents_uploaded: false,
        face_verified: false,
        liveness_required: false,
        min_liveness_checks: None,
        require_fresh_liveness: false,
    };

    pub const EMAIL_ONLY: Self = Self {
        email_verified: true,
        ..Self::NONE
    };

    pub const BASIC: Self = Self {
        documents_uploaded: true,
        ..Self::EMAIL_ONLY
    };

    pub const FULL: Self = Self {
        face_verified: true,
        ..Self::BASIC
    };

    pub const BOOKING: Self = Self {
        liveness_required: true,
        min_liveness_checks: Some(1),
        require_fresh_liveness: true,
        ..Self::FULL
    };

    pub const PAYMENT: Self = Self {
        liveness_required: true,
        min_liveness_checks: Some(1),
        require_fresh_liveness: false,
        ..Self::FULL
    };

    /// Whether this requirement set demands nothing.
    pub fn is_empty(&self) -> bool {
        !self.email_verified
            && !self.documents_uploaded
            && !self.face_verified
            && !self.liveness_required
    }

    pub fn min_liveness(&self) -> u32 {
        self.min_liveness_checks.unwrap_or(1)
    }
}
