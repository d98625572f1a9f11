//! Verification parameters.
//!
//! Defaults reproduce the platform's observed behaviour: a 0.70 similarity
//! threshold, a 24 hour liveness freshness window, and no cap on retries.
//! The caps are opt-in for operators who want bounded attempts.

use serde::{Deserialize, Serialize};

/// Minimum similarity score for a passing face match.
pub const FACE_MATCH_THRESHOLD: f64 = 0.70;

/// Maximum age of the latest passing liveness check for fresh-liveness presets.
pub const LIVENESS_FRESHNESS_SECS: u64 = 24 * 60 * 60;

/// Idle time after which an unfinished liveness session expires.
pub const LIVENESS_SESSION_TTL_SECS: u64 = 10 * 60;

/// Tunable values consumed by the evaluator, the liveness controller and the
/// access policy engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationParams {
    /// Similarity score at or above which a face comparison passes.
    #[serde(default = "default_face_match_threshold")]
    pub face_match_threshold: f64,

    /// Freshness window for presets that require a recent liveness pass.
    #[serde(default = "default_liveness_freshness_secs")]
    pub liveness_freshness_secs: u64,

    /// Idle lifetime of a liveness session.
    #[serde(default = "default_liveness_session_ttl_secs")]
    pub liveness_session_ttl_secs: u64,

    /// Consecutive failed face comparisons that mark the record as failed.
    /// `None` allows unlimited attempts.
    #[serde(default)]
    pub max_face_attempts: Option<u32>,

    /// Failed attempts per liveness action after which the session is aborted.
    /// `None` allows unlimited attempts.
    #[serde(default)]
    pub max_liveness_failures_per_action: Option<u32>,
}

fn default_face_match_threshold() -> f64 {
    FACE_MATCH_THRESHOLD
}

fn default_liveness_freshness_secs() -> u64 {
    LIVENESS_FRESHNESS_SECS
}

fn default_liveness_session_ttl_secs() -> u64 {
    LIVENESS_SESSION_TTL_SECS
}

impl VerificationParams {
    /// Parameters with bounded retries, for deployments that want them.
    pub fn strict() -> Self {
        Self {
            max_face_attempts: Some(5),
            max_liveness_failures_per_action: Some(3),
            ..Self::default()
        }
    }
}

impl Default for VerificationParams {
    fn default() -> Self {
        Self {
            face_match_threshold: default_face_match_threshold(),
            liveness_freshness_secs: default_liveness_freshness_secs(),
            liveness_session_ttl_secs: default_liveness_session_ttl_secs(),
            max_face_attempts: None,
            max_liveness_failures_per_action: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_observed_behaviour() {
        let p = VerificationParams::default();
        assert_eq!(p.face_match_threshold, 0.70);
        assert_eq!(p.liveness_freshness_secs, 86_400);
        assert!(p.max_face_attempts.is_none());
        assert!(p.max_liveness_failures_per_action.is_none());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let p: VerificationParams = serde_json::from_str(r#"{"max_face_attempts": 3}"#).unwrap();
        assert_eq!(p.max_face_attempts, Some(3));
        assert_eq!(p.liveness_session_ttl_secs, LIVENESS_SESSION_TTL_SECS);
    }
}
