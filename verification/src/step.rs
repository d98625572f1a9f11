//! Next-step resolution.

use idgate_store::VerificationRecord;
use idgate_types::StepId;

/// The first incomplete step for `record`, in the fixed order email,
/// documents, face comparison, liveness.
///
/// Liveness counts as done once any passing check exists. A terminal
/// failure does not change the answer: the user retries the step that
/// failed.
pub fn next_step(record: &VerificationRecord) -> StepId {
    if !record.email_verified() {
        StepId::EmailVerification
    } else if !record.documents_uploaded() {
        StepId::DocumentUpload
    } else if !record.face_verified() {
        StepId::FaceComparison
    } else if !record.has_passed_liveness() {
        StepId::LivenessCheck
    } else {
        StepId::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idgate_store::LivenessCheck;
    use idgate_types::{CheckResult, LivenessAction, Timestamp, UserId};

    fn record() -> VerificationRecord {
        VerificationRecord::new(UserId::new("stepper").unwrap(), Timestamp::new(0))
    }

    fn liveness(result: CheckResult) -> LivenessCheck {
        LivenessCheck {
            action: LivenessAction::Blink,
            result,
            confidence: 0.9,
            timestamp: Timestamp::new(5),
        }
    }

    #[test]
    fn walks_steps_in_order() {
        let t = Timestamp::new(1);
        let mut r = record();
        assert_eq!(next_step(&r), StepId::EmailVerification);
        r.mark_email_verified(t);
        assert_eq!(next_step(&r), StepId::DocumentUpload);
        r.mark_documents_uploaded(t);
        assert_eq!(next_step(&r), StepId::FaceComparison);
        r.mark_face_verified(t);
        assert_eq!(next_step(&r), StepId::LivenessCheck);
        r.append_liveness_check(liveness(CheckResult::Pass), t);
        assert_eq!(next_step(&r), StepId::Complete);
    }

    #[test]
    fn earliest_gap_wins() {
        let mut r = record();
        r.mark_face_verified(Timestamp::new(1));
        assert_eq!(next_step(&r), StepId::EmailVerification);
    }

    #[test]
    fn failed_liveness_keeps_liveness_pending() {
        let t = Timestamp::new(1);
        let mut r = record();
        r.mark_email_verified(t);
        r.mark_documents_uploaded(t);
        r.mark_face_verified(t);
        r.append_liveness_check(liveness(CheckResult::Fail), t);
        assert_eq!(next_step(&r), StepId::LivenessCheck);
    }

    #[test]
    fn liveness_without_earlier_steps_is_not_complete() {
        let mut r = record();
        r.append_liveness_check(liveness(CheckResult::Pass), Timestamp::new(1));
        assert_eq!(next_step(&r), StepId::EmailVerification);
    }
}
