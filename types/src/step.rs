//! Verification pipeline steps.

use crate::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The single next action a user has to take.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    EmailVerification,
    DocumentUpload,
    FaceComparison,
    LivenessCheck,
    Complete,
}

impl StepId {
    /// All steps in pipeline order.
    pub const ALL: [StepId; 5] = [
        Self::EmailVerification,
        Self::DocumentUpload,
        Self::FaceComparison,
        Self::LivenessCheck,
        Self::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmailVerification => "email_verification",
            Self::DocumentUpload => "document_upload",
            Self::FaceComparison => "face_comparison",
            Self::LivenessCheck => "liveness_check",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A step that can be reset through the retry operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStep {
    Email,
    Documents,
    Face,
}

impl RetryStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Documents => "documents",
            Self::Face => "face",
        }
    }
}

impl fmt::Display for RetryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetryStep {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "documents" => Ok(Self::Documents),
            "face" => Ok(Self::Face),
            _ => Err(TypesError::UnknownStep(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_wire_names() {
        let json = serde_json::to_string(&StepId::FaceComparison).unwrap();
        assert_eq!(json, "\"face_comparison\"");
        for step in StepId::ALL {
            let quoted = format!("\"{}\"", step.as_str());
            assert_eq!(serde_json::from_str::<StepId>(&quoted).unwrap(), step);
        }
    }

    #[test]
    fn retry_step_parses_case_insensitively() {
        assert_eq!("Face".parse::<RetryStep>().unwrap(), RetryStep::Face);
        assert!("liveness".parse::<RetryStep>().is_err());
    }
}
