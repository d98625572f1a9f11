//! Face-match evaluation.
//!
//! The similarity score comes from an external biometric provider; this
//! module only applies the threshold and records the outcome.

use crate::error::VerificationError;
use crate::events::{EventSink, VerificationEvent};
use idgate_store::{transact, VerificationRecord, VerificationStore};
use idgate_types::{Timestamp, UserId, VerificationParams, VerificationStatus};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reason recorded when the face-attempt cap is reached.
pub const FACE_ATTEMPTS_EXHAUSTED: &str = "face comparison attempts exhausted";

/// Result of applying one similarity score to a record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FaceMatchVerdict {
    pub verified: bool,
    pub similarity_score: f64,
    pub threshold: f64,
    /// Consecutive failed comparisons after this one.
    pub failed_attempts: u32,
    /// This comparison moved the record into the terminal failed state.
    pub terminal: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FaceMatchOutcome {
    pub verdict: FaceMatchVerdict,
    pub record: VerificationRecord,
}

/// Applies the similarity threshold and persists the result.
pub struct FaceMatchEvaluator {
    threshold: f64,
    max_attempts: Option<u32>,
    store: Arc<dyn VerificationStore>,
    events: Arc<dyn EventSink>,
}

impl FaceMatchEvaluator {
    pub fn new(
        params: &VerificationParams,
        store: Arc<dyn VerificationStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            threshold: params.face_match_threshold,
            max_attempts: params.max_face_attempts,
            store,
            events,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether `score` clears the threshold. The boundary passes.
    pub fn passes(&self, score: f64) -> bool {
        score >= self.threshold
    }

    /// Apply `score` to `record` in place.
    ///
    /// A passing score sets `face_verified` and clears the failure counter.
    /// A failing score leaves the flag alone and counts the attempt; when a
    /// cap is configured and reached, the record is marked failed. Failing
    /// scores against an already verified face are reported but not counted.
    pub fn apply(
        &self,
        record: &mut VerificationRecord,
        score: f64,
        now: Timestamp,
    ) -> Result<FaceMatchVerdict, VerificationError> {
        validate_score(score)?;
        if let Some(reason) = record.terminal_failure() {
            return Err(VerificationError::TerminalFailure(reason.to_string()));
        }

        let verified = self.passes(score);
        let mut terminal = false;
        if verified {
            record.mark_face_verified(now);
        } else if !record.face_verified() {
            let attempts = record.record_face_failure(now);
            if self.max_attempts.is_some_and(|cap| attempts >= cap) {
                terminal = record.mark_failed(FACE_ATTEMPTS_EXHAUSTED, now);
            }
        }

        Ok(FaceMatchVerdict {
            verified,
            similarity_score: score,
            threshold: self.threshold,
            failed_attempts: record.failed_face_attempts(),
            terminal,
        })
    }

    /// Evaluate `score` for `user` as one store transaction, then emit events.
    pub fn evaluate(
        &self,
        user: &UserId,
        score: f64,
        now: Timestamp,
    ) -> Result<FaceMatchOutcome, VerificationError> {
        validate_score(score)?;
        let mut before = VerificationStatus::Unverified;
        let (verdict, record) = transact(self.store.as_ref(), user, now, |record| {
            before = record.status();
            self.apply(record, score, now)
        })?;

        debug!(
            user = %user,
            score,
            threshold = self.threshold,
            verified = verdict.verified,
            "face comparison evaluated"
        );
        self.events.emit(VerificationEvent::FaceVerificationResult {
            user_id: user.clone(),
            passed: verdict.verified,
            similarity_score: score,
        });
        if verdict.terminal {
            warn!(user = %user, attempts = verdict.failed_attempts, "face comparison attempts exhausted");
            self.events.emit(VerificationEvent::VerificationFailed {
                user_id: user.clone(),
                reason: FACE_ATTEMPTS_EXHAUSTED.to_string(),
            });
        }
        if before != VerificationStatus::Verified && record.status() == VerificationStatus::Verified {
            info!(user = %user, "user fully verified");
            self.events.emit(VerificationEvent::VerificationCompleted {
                user_id: user.clone(),
            });
        }

        Ok(FaceMatchOutcome { verdict, record })
    }
}

fn validate_score(score: f64) -> Result<(), VerificationError> {
    if (0.0..=1.0).contains(&score) {
        Ok(())
    } else {
        Err(VerificationError::InvalidScore(score))
    }
}
