//! Requirement evaluation.

use crate::{AccessRequirement, Decision, DenyReason};
use idgate_store::VerificationRecord;
use idgate_types::params::LIVENESS_FRESHNESS_SECS;
use idgate_types::Timestamp;
use tracing::debug;

/// Evaluates requirement sets against verification records.
///
/// Checks run in a fixed order and the first unmet one is reported, so the
/// caller can point the user at a single remediation step.
#[derive(Clone, Copy, Debug)]
pub struct AccessPolicyEngine {
    freshness_secs: u64,
}

impl Default for AccessPolicyEngine {
    fn default() -> Self {
        Self::new(LIVENESS_FRESHNESS_SECS)
    }
}

impl AccessPolicyEngine {
    pub fn new(freshness_secs: u64) -> Self {
        Self { freshness_secs }
    }

    pub fn freshness_secs(&self) -> u64 {
        self.freshness_secs
    }

    pub fn evaluate(
        &self,
        record: &VerificationRecord,
        requirement: &AccessRequirement,
        now: Timestamp,
    ) -> Decision {
        let decision = self.first_unmet(record, requirement, now);
        if let Decision::Deny(reason) = decision {
            debug!(user = %record.user_id(), reason = reason.code(), "access denied");
        }
        decision
    }

    fn first_unmet(
        &self,
        record: &VerificationRecord,
        requirement: &AccessRequirement,
        now: Timestamp,
    ) -> Decision {
        if requirement.email_verified && !record.email_verified() {
            return Decision::Deny(DenyReason::EmailRequired);
        }
        if requirement.documents_uploaded && !record.documents_uploaded() {
            return Decision::Deny(DenyReason::DocumentsRequired);
        }
        if requirement.face_verified && !record.face_verified() {
            return Decision::Deny(DenyReason::FaceVerificationRequired);
        }
        if requirement.liveness_required {
            let min_checks = requirement.min_liveness();
            if (record.passed_liveness_count() as u64) < u64::from(min_checks) {
                return Decision::Deny(DenyReason::LivenessRequired { min_checks });
            }
            if requirement.require_fresh_liveness {
                let fresh = record
                    .last_liveness_pass()
                    .is_some_and(|last| last.elapsed_since(now) <= self.freshness_secs);
                if !fresh {
                    return Decision::Deny(DenyReason::FreshLivenessRequired);
                }
            }
        }
        Decision::Allow
    }
}

/// Evaluate with the default 24 hour freshness window.
pub fn authorize(
    record: &VerificationRecord,
    requirement: &AccessRequirement,
    now: Timestamp,
) -> Decision {
    AccessPolicyEngine::default().evaluate(record, requirement, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Preset;
    use idgate_store::LivenessCheck;
    use idgate_types::{CheckResult, LivenessAction, UserId};

    const HOUR: u64 = 3_600;
    const NOW: u64 = 10 * 24 * HOUR;

    fn record() -> VerificationRecord {
        VerificationRecord::new(UserId::new("policy-user").unwrap(), Timestamp::new(0))
    }

    fn fully_verified() -> VerificationRecord {
        let mut r = record();
        let t = Timestamp::new(1);
        r.mark_email_verified(t);
        r.mark_documents_uploaded(t);
        r.mark_face_verified(t);
        r
    }

    fn with_liveness(mut r: VerificationRecord, at: u64, result: CheckResult) -> VerificationRecord {
        r.append_liveness_check(
            LivenessCheck {
                action: LivenessAction::Smile,
                result,
                confidence: 0.93,
                timestamp: Timestamp::new(at),
            },
            Timestamp::new(at),
        );
        r
    }

    fn check(r: &VerificationRecord, preset: Preset) -> Decision {
        authorize(r, preset.requirement(), Timestamp::new(NOW))
    }

    #[test]
    fn public_always_allows() {
        assert_eq!(check(&record(), Preset::Public), Decision::Allow);
    }

    #[test]
    fn first_failing_check_wins() {
        assert_eq!(
            check(&record(), Preset::Full),
            Decision::Deny(DenyReason::EmailRequired)
        );

        let mut r = record();
        r.mark_email_verified(Timestamp::new(1));
        assert_eq!(
            check(&r, Preset::Full),
            Decision::Deny(DenyReason::DocumentsRequired)
        );
        r.mark_documents_uploaded(Timestamp::new(1));
        assert_eq!(
            check(&r, Preset::Full),
            Decision::Deny(DenyReason::FaceVerificationRequired)
        );
        r.mark_face_verified(Timestamp::new(1));
        assert_eq!(check(&r, Preset::Full), Decision::Allow);
    }

    #[test]
    fn booking_without_liveness_is_denied() {
        assert_eq!(
            check(&fully_verified(), Preset::Booking),
            Decision::Deny(DenyReason::LivenessRequired { min_checks: 1 })
        );
    }

    #[test]
    fn failed_liveness_does_not_count() {
        let r = with_liveness(fully_verified(), NOW - HOUR, CheckResult::Fail);
        assert_eq!(
            check(&r, Preset::Payment),
            Decision::Deny(DenyReason::LivenessRequired { min_checks: 1 })
        );
    }

    #[test]
    fn booking_with_stale_liveness_is_denied() {
        let r = with_liveness(fully_verified(), NOW - 25 * HOUR, CheckResult::Pass);
        assert_eq!(
            check(&r, Preset::Booking),
            Decision::Deny(DenyReason::FreshLivenessRequired)
        );
    }

    #[test]
    fn booking_with_recent_liveness_is_allowed() {
        let r = with_liveness(fully_verified(), NOW - HOUR, CheckResult::Pass);
        assert_eq!(check(&r, Preset::Booking), Decision::Allow);
    }

    #[test]
    fn freshness_boundary_is_inclusive() {
        let r = with_liveness(fully_verified(), NOW - 24 * HOUR, CheckResult::Pass);
        assert_eq!(check(&r, Preset::Booking), Decision::Allow);
        let r = with_liveness(fully_verified(), NOW - 24 * HOUR - 1, CheckResult::Pass);
        assert_eq!(
            check(&r, Preset::Booking),
            Decision::Deny(DenyReason::FreshLivenessRequired)
        );
    }

    #[test]
    fn payment_accepts_stale_liveness() {
        let r = with_liveness(fully_verified(), NOW - 72 * HOUR, CheckResult::Pass);
        assert_eq!(check(&r, Preset::Payment), Decision::Allow);
    }

    #[test]
    fn freshness_uses_latest_pass() {
        let r = with_liveness(fully_verified(), NOW - 48 * HOUR, CheckResult::Pass);
        let r = with_liveness(r, NOW - 2 * HOUR, CheckResult::Pass);
        let r = with_liveness(r, NOW - HOUR, CheckResult::Fail);
        assert_eq!(check(&r, Preset::Booking), Decision::Allow);
    }

    #[test]
    fn custom_minimum_counts_passes() {
        let req = AccessRequirement {
            liveness_required: true,
            min_liveness_checks: Some(2),
            ..AccessRequirement::NONE
        };
        let r = with_liveness(record(), NOW - HOUR, CheckResult::Pass);
        assert_eq!(
            authorize(&r, &req, Timestamp::new(NOW)),
            Decision::Deny(DenyReason::LivenessRequired { min_checks: 2 })
        );
        let r = with_liveness(r, NOW - HOUR, CheckResult::Pass);
        assert_eq!(authorize(&r, &req, Timestamp::new(NOW)), Decision::Allow);
    }

    #[test]
    fn evaluation_does_not_mutate() {
        let r = with_liveness(fully_verified(), NOW - HOUR, CheckResult::Pass);
        let before = r.clone();
        for preset in Preset::ALL {
            let first = check(&r, preset);
            assert_eq!(check(&r, preset), first);
        }
        assert_eq!(r, before);
    }

    #[test]
    fn custom_window() {
        let engine = AccessPolicyEngine::new(HOUR);
        let r = with_liveness(fully_verified(), NOW - 2 * HOUR, CheckResult::Pass);
        assert_eq!(
            engine.evaluate(&r, Preset::Booking.requirement(), Timestamp::new(NOW)),
            Decision::Deny(DenyReason::FreshLivenessRequired)
        );
    }
}
