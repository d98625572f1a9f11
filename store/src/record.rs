//! The per-user verification record.
//!
//! Fields are private: every mutation goes through a method that recomputes
//! the cached [`VerificationStatus`], so `status == Verified` holds exactly
//! when email, documents and face match are all complete.

use idgate_types::{
    CheckResult, DocumentKind, LivenessAction, RetryStep, Timestamp, UserId, VerificationStatus,
};
use serde::{Deserialize, Serialize};

/// One liveness attempt. Appended to the record, never edited.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LivenessCheck {
    pub action: LivenessAction,
    pub result: CheckResult,
    /// Detector confidence reported by the biometric collaborator.
    pub confidence: f64,
    pub timestamp: Timestamp,
}

/// Storage references of the two images required for the face comparison.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRefs {
    pub identity: Option<String>,
    pub selfie: Option<String>,
}

impl DocumentRefs {
    pub fn get(&self, kind: DocumentKind) -> Option<&str> {
        match kind {
            DocumentKind::Identity => self.identity.as_deref(),
            DocumentKind::Selfie => self.selfie.as_deref(),
        }
    }

    fn set(&mut self, kind: DocumentKind, reference: String) {
        match kind {
            DocumentKind::Identity => self.identity = Some(reference),
            DocumentKind::Selfie => self.selfie = Some(reference),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.identity.is_some() && self.selfie.is_some()
    }
}

/// Aggregate view of the liveness history.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessSummary {
    pub total_checks: usize,
    pub passed_checks: usize,
    pub last_check: Option<Timestamp>,
    pub last_pass: Option<Timestamp>,
}

/// Verification progress of a single user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredRecord")]
pub struct VerificationRecord {
    user_id: UserId,
    email_verified: bool,
    documents_uploaded: bool,
    face_verified: bool,
    status: VerificationStatus,
    email_link_sent_at: Option<Timestamp>,
    documents: DocumentRefs,
    failed_face_attempts: u32,
    terminal_failure: Option<String>,
    liveness_checks: Vec<LivenessCheck>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

/// Wire form. The status is recomputed on load rather than trusted.
#[derive(Deserialize)]
struct StoredRecord {
    user_id: UserId,
    email_verified: bool,
    documents_uploaded: bool,
    face_verified: bool,
    #[serde(default)]
    email_link_sent_at: Option<Timestamp>,
    #[serde(default)]
    documents: DocumentRefs,
    #[serde(default)]
    failed_face_attempts: u32,
    #[serde(default)]
    terminal_failure: Option<String>,
    #[serde(default)]
    liveness_checks: Vec<LivenessCheck>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl From<StoredRecord> for VerificationRecord {
    fn from(raw: StoredRecord) -> Self {
        let mut record = Self {
            user_id: raw.user_id,
            email_verified: raw.email_verified,
            documents_uploaded: raw.documents_uploaded,
            face_verified: raw.face_verified,
            status: VerificationStatus::Unverified,
            email_link_sent_at: raw.email_link_sent_at,
            documents: raw.documents,
            failed_face_attempts: raw.failed_face_attempts,
            terminal_failure: raw.terminal_failure,
            liveness_checks: raw.liveness_checks,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        };
        record.normalize();
        record
    }
}

impl VerificationRecord {
    /// A fresh record: nothing verified, empty history.
    pub fn new(user_id: UserId, now: Timestamp) -> Self {
        Self {
            user_id,
            email_verified: false,
            documents_uploaded: false,
            face_verified: false,
            status: VerificationStatus::Unverified,
            email_link_sent_at: None,
            documents: DocumentRefs::default(),
            failed_face_attempts: 0,
            terminal_failure: None,
            liveness_checks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn email_verified(&self) -> bool {
        self.email_verified
    }

    pub fn documents_uploaded(&self) -> bool {
        self.documents_uploaded
    }

    pub fn face_verified(&self) -> bool {
        self.face_verified
    }

    pub fn status(&self) -> VerificationStatus {
        self.status
    }

    pub fn email_link_sent_at(&self) -> Option<Timestamp> {
        self.email_link_sent_at
    }

    pub fn documents(&self) -> &DocumentRefs {
        &self.documents
    }

    pub fn failed_face_attempts(&self) -> u32 {
        self.failed_face_attempts
    }

    pub fn terminal_failure(&self) -> Option<&str> {
        self.terminal_failure.as_deref()
    }

    pub fn liveness_checks(&self) -> &[LivenessCheck] {
        &self.liveness_checks
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn is_fully_verified(&self) -> bool {
        self.email_verified && self.documents_uploaded && self.face_verified
    }

    // ── Liveness queries ────────────────────────────────────────────────

    pub fn passed_liveness_count(&self) -> usize {
        self.liveness_checks
            .iter()
            .filter(|c| c.result.is_pass())
            .count()
    }

    pub fn has_passed_liveness(&self) -> bool {
        self.liveness_checks.iter().any(|c| c.result.is_pass())
    }

    /// Timestamp of the most recent passing check.
    pub fn last_liveness_pass(&self) -> Option<Timestamp> {
        self.liveness_checks
            .iter()
            .filter(|c| c.result.is_pass())
            .map(|c| c.timestamp)
            .max()
    }

    pub fn liveness_summary(&self) -> LivenessSummary {
        LivenessSummary {
            total_checks: self.liveness_checks.len(),
            passed_checks: self.passed_liveness_count(),
            last_check: self.liveness_checks.iter().map(|c| c.timestamp).max(),
            last_pass: self.last_liveness_pass(),
        }
    }

    /// Completion percentage of the three core steps.
    pub fn progress_percent(&self) -> u8 {
        let mut progress: u8 = 0;
        if self.email_verified {
            progress += 33;
        }
        if self.documents_uploaded {
            progress += 33;
        }
        if self.face_verified {
            progress += 34;
        }
        progress.min(100)
    }

    /// The status implied by the current fields.
    pub fn derive_status(&self) -> VerificationStatus {
        if self.is_fully_verified() {
            VerificationStatus::Verified
        } else if self.terminal_failure.is_some() {
            VerificationStatus::Failed
        } else if self.face_verified {
            VerificationStatus::FaceVerified
        } else if self.documents_uploaded {
            VerificationStatus::DocumentsUploaded
        } else if self.email_verified {
            VerificationStatus::EmailVerified
        } else if self.email_link_sent_at.is_some() {
            VerificationStatus::EmailPending
        } else {
            VerificationStatus::Unverified
        }
    }

    // ── Mutations ───────────────────────────────────────────────────────

    pub fn mark_email_link_sent(&mut self, now: Timestamp) {
        self.email_link_sent_at = Some(now);
        self.touch(now);
    }

    /// Returns `true` if the flag changed.
    pub fn mark_email_verified(&mut self, now: Timestamp) -> bool {
        let changed = !self.email_verified;
        self.email_verified = true;
        self.touch(now);
        changed
    }

    /// Record one of the two required images. Returns `true` once this call
    /// completes the pair and flips `documents_uploaded`.
    pub fn attach_document(&mut self, kind: DocumentKind, reference: String, now: Timestamp) -> bool {
        self.documents.set(kind, reference);
        let completes = self.documents.is_complete() && !self.documents_uploaded;
        if completes {
            self.documents_uploaded = true;
        }
        self.touch(now);
        completes
    }

    /// Returns `true` if the flag changed.
    pub fn mark_documents_uploaded(&mut self, now: Timestamp) -> bool {
        let changed = !self.documents_uploaded;
        self.documents_uploaded = true;
        self.touch(now);
        changed
    }

    /// A passing face comparison. Clears the failed-attempt counter.
    pub fn mark_face_verified(&mut self, now: Timestamp) -> bool {
        let changed = !self.face_verified;
        self.face_verified = true;
        self.failed_face_attempts = 0;
        self.touch(now);
        changed
    }

    /// A failing face comparison. Returns the consecutive failure count.
    pub fn record_face_failure(&mut self, now: Timestamp) -> u32 {
        self.failed_face_attempts = self.failed_face_attempts.saturating_add(1);
        self.touch(now);
        self.failed_face_attempts
    }

    /// Put the record into the terminal `Failed` state.
    ///
    /// Refused (returns `false`) for a fully verified record, which can only
    /// lose that status through a retry.
    pub fn mark_failed(&mut self, reason: impl Into<String>, now: Timestamp) -> bool {
        if self.is_fully_verified() {
            return false;
        }
        self.terminal_failure = Some(reason.into());
        self.touch(now);
        true
    }

    pub fn append_liveness_check(&mut self, check: LivenessCheck, now: Timestamp) {
        self.liveness_checks.push(check);
        self.touch(now);
    }

    /// Reset exactly one step and any terminal failure. Later steps keep
    /// their state; the liveness history is never touched.
    pub fn reset_step(&mut self, step: RetryStep, now: Timestamp) {
        match step {
            RetryStep::Email => {
                self.email_verified = false;
                self.email_link_sent_at = None;
            }
            RetryStep::Documents => {
                self.documents_uploaded = false;
                self.documents = DocumentRefs::default();
            }
            RetryStep::Face => {
                self.face_verified = false;
                self.failed_face_attempts = 0;
            }
        }
        self.terminal_failure = None;
        self.touch(now);
    }

    fn touch(&mut self, now: Timestamp) {
        self.updated_at = self.updated_at.max(now);
        self.normalize();
    }

    fn normalize(&mut self) {
        if self.is_fully_verified() {
            self.terminal_failure = None;
        }
        self.status = self.derive_status();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn verified_record() -> VerificationRecord {
        let now = Timestamp::new(1_000);
        let mut r = VerificationRecord::new(user(), now);
        r.mark_email_verified(now);
        r.mark_documents_uploaded(now);
        r.mark_face_verified(now);
        r
    }

    #[test]
    fn new_record_is_unverified() {
        let r = VerificationRecord::new(user(), Timestamp::new(5));
        assert_eq!(r.status(), VerificationStatus::Unverified);
        assert!(!r.email_verified() && !r.documents_uploaded() && !r.face_verified());
        assert!(r.liveness_checks().is_empty());
        assert_eq!(r.progress_percent(), 0);
    }

    #[test]
    fn status_follows_progress() {
        let now = Timestamp::new(10);
        let mut r = VerificationRecord::new(user(), now);
        r.mark_email_link_sent(now);
        assert_eq!(r.status(), VerificationStatus::EmailPending);
        r.mark_email_verified(now);
        assert_eq!(r.status(), VerificationStatus::EmailVerified);
        r.mark_documents_uploaded(now);
        assert_eq!(r.status(), VerificationStatus::DocumentsUploaded);
        r.mark_face_verified(now);
        assert_eq!(r.status(), VerificationStatus::Verified);
        assert_eq!(r.progress_percent(), 100);
    }

    #[test]
    fn documents_need_both_images() {
        let now = Timestamp::new(10);
        let mut r = VerificationRecord::new(user(), now);
        assert!(!r.attach_document(DocumentKind::Identity, "id.png".into(), now));
        assert!(!r.documents_uploaded());
        assert!(r.attach_document(DocumentKind::Selfie, "selfie.png".into(), now));
        assert!(r.documents_uploaded());
        assert!(!r.attach_document(DocumentKind::Selfie, "selfie2.png".into(), now));
        assert_eq!(r.documents().get(DocumentKind::Selfie), Some("selfie2.png"));
    }

    #[test]
    fn retry_email_on_verified_record_is_local() {
        let mut r = verified_record();
        r.reset_step(RetryStep::Email, Timestamp::new(2_000));
        assert!(!r.email_verified());
        assert!(r.documents_uploaded());
        assert!(r.face_verified());
        assert_ne!(r.status(), VerificationStatus::Verified);
        assert_eq!(r.status(), VerificationStatus::FaceVerified);
    }

    #[test]
    fn terminal_failure_and_retry() {
        let now = Timestamp::new(10);
        let mut r = VerificationRecord::new(user(), now);
        r.mark_email_verified(now);
        r.mark_documents_uploaded(now);
        assert!(r.mark_failed("admin", now));
        assert_eq!(r.status(), VerificationStatus::Failed);
        r.reset_step(RetryStep::Face, now);
        assert_eq!(r.status(), VerificationStatus::DocumentsUploaded);
        assert!(r.terminal_failure().is_none());
    }

    #[test]
    fn verified_record_refuses_terminal_failure() {
        let mut r = verified_record();
        assert!(!r.mark_failed("late", Timestamp::new(2_000)));
        assert_eq!(r.status(), VerificationStatus::Verified);
    }

    #[test]
    fn liveness_summary_tracks_passes() {
        let mut r = VerificationRecord::new(user(), Timestamp::new(0));
        for (t, result) in [(10, CheckResult::Fail), (20, CheckResult::Pass), (30, CheckResult::Fail)] {
            r.append_liveness_check(
                LivenessCheck {
                    action: LivenessAction::Blink,
                    result,
                    confidence: 0.9,
                    timestamp: Timestamp::new(t),
                },
                Timestamp::new(t),
            );
        }
        let s = r.liveness_summary();
        assert_eq!(s.total_checks, 3);
        assert_eq!(s.passed_checks, 1);
        assert_eq!(s.last_check, Some(Timestamp::new(30)));
        assert_eq!(s.last_pass, Some(Timestamp::new(20)));
    }

    #[test]
    fn deserialization_recomputes_status() {
        let r = verified_record();
        let mut value = serde_json::to_value(&r).unwrap();
        value["status"] = serde_json::json!("unverified");
        let loaded: VerificationRecord = serde_json::from_value(value).unwrap();
        assert_eq!(loaded.status(), VerificationStatus::Verified);
        assert_eq!(loaded, r);
    }
}
