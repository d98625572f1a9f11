//! Verification service: the single entry point for every operation.

use crate::clock::Clock;
use crate::error::VerificationError;
use crate::events::{EventSink, VerificationEvent};
use crate::face::{FaceMatchEvaluator, FaceMatchOutcome};
use crate::liveness::{LivenessController, LivenessOutcome, SessionId, SessionView, SubmitOutcome};
use crate::status::StatusReport;
use crate::step::next_step;
use idgate_access::{AccessPolicyEngine, Decision, Preset};
use idgate_store::{transact, VerificationRecord, VerificationStore};
use idgate_types::{
    DocumentKind, LivenessAction, RetryStep, StepId, Timestamp, UserId, VerificationParams,
    VerificationStatus,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Composes the store, the face-match evaluator, the liveness controller and
/// the access policy engine.
///
/// Records are created on the first mutating call for a user. Reads for an
/// unknown user behave as if a fresh record existed, except
/// [`status`](Self::status), which reports [`VerificationError::UnknownUser`].
pub struct VerificationService {
    store: Arc<dyn VerificationStore>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    params: VerificationParams,
    face: FaceMatchEvaluator,
    liveness: LivenessController,
    policy: AccessPolicyEngine,
}

impl VerificationService {
    pub fn new(
        params: VerificationParams,
        store: Arc<dyn VerificationStore>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let face = FaceMatchEvaluator::new(&params, store.clone(), events.clone());
        let liveness = LivenessController::new(&params, store.clone(), events.clone());
        let policy = AccessPolicyEngine::new(params.liveness_freshness_secs);
        Self {
            store,
            events,
            clock,
            params,
            face,
            liveness,
            policy,
        }
    }

    pub fn params(&self) -> &VerificationParams {
        &self.params
    }

    pub fn record_count(&self) -> Result<u64, VerificationError> {
        Ok(self.store.record_count()?)
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn record(&self, user: &UserId) -> Result<VerificationRecord, VerificationError> {
        self.store
            .get(user)?
            .ok_or_else(|| VerificationError::UnknownUser(user.clone()))
    }

    pub fn status(&self, user: &UserId) -> Result<StatusReport, VerificationError> {
        self.record(user).map(StatusReport::from)
    }

    pub fn next_step(&self, user: &UserId) -> Result<StepId, VerificationError> {
        Ok(self
            .store
            .get(user)?
            .map_or(StepId::EmailVerification, |record| next_step(&record)))
    }

    /// Evaluate `preset` for `user`. Read-only.
    pub fn authorize(&self, user: &UserId, preset: Preset) -> Result<Decision, VerificationError> {
        let now = self.clock.now();
        let record = self
            .store
            .get(user)?
            .unwrap_or_else(|| VerificationRecord::new(user.clone(), now));
        Ok(self.policy.evaluate(&record, preset.requirement(), now))
    }

    /// Like [`authorize`](Self::authorize) but with the preset given by name.
    pub fn authorize_named(&self, user: &UserId, preset: &str) -> Result<Decision, VerificationError> {
        let preset: Preset = preset.parse()?;
        self.authorize(user, preset)
    }

    /// `Ok(())` when `preset` is satisfied, [`VerificationError::PolicyDenied`] otherwise.
    pub fn require(&self, user: &UserId, preset: Preset) -> Result<(), VerificationError> {
        Ok(self.authorize(user, preset)?.into_result()?)
    }

    // ── Email ───────────────────────────────────────────────────────────

    pub fn mark_email_link_sent(&self, user: &UserId) -> Result<StatusReport, VerificationError> {
        let ((), record) = self.update(user, |record, now| {
            record.mark_email_link_sent(now);
            Ok(())
        })?;
        self.events.emit(VerificationEvent::EmailLinkSent {
            user_id: user.clone(),
        });
        Ok(record.into())
    }

    /// Idempotent: a second call changes nothing and emits nothing.
    pub fn mark_email_verified(&self, user: &UserId) -> Result<StatusReport, VerificationError> {
        let (changed, record) =
            self.update(user, |record, now| Ok(record.mark_email_verified(now)))?;
        if changed {
            debug!(user = %user, "email verified");
            self.events.emit(VerificationEvent::EmailVerified {
                user_id: user.clone(),
            });
        }
        Ok(record.into())
    }

    // ── Documents ───────────────────────────────────────────────────────

    /// Store a reference to one uploaded image. The step completes once both
    /// the identity document and the selfie are present.
    pub fn record_document(
        &self,
        user: &UserId,
        kind: DocumentKind,
        reference: &str,
    ) -> Result<StatusReport, VerificationError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(VerificationError::EmptyDocumentReference);
        }
        let (completed, record) = self.update(user, |record, now| {
            Ok(record.attach_document(kind, reference.to_string(), now))
        })?;
        debug!(user = %user, %kind, "document stored");
        if completed {
            self.emit_documents_uploaded(user);
        }
        Ok(record.into())
    }

    pub fn mark_documents_uploaded(&self, user: &UserId) -> Result<StatusReport, VerificationError> {
        let (changed, record) =
            self.update(user, |record, now| Ok(record.mark_documents_uploaded(now)))?;
        if changed {
            self.emit_documents_uploaded(user);
        }
        Ok(record.into())
    }

    // ── Face match ──────────────────────────────────────────────────────

    pub fn evaluate_face_match(
        &self,
        user: &UserId,
        similarity_score: f64,
    ) -> Result<FaceMatchOutcome, VerificationError> {
        self.face.evaluate(user, similarity_score, self.clock.now())
    }

    // ── Liveness ────────────────────────────────────────────────────────

    pub fn start_liveness(&self, user: &UserId) -> Result<SessionView, VerificationError> {
        self.liveness.start(user, self.clock.now())
    }

    pub fn liveness_session(
        &self,
        user: &UserId,
        session: SessionId,
    ) -> Result<SessionView, VerificationError> {
        self.liveness.session(session, user, self.clock.now())
    }

    pub fn next_liveness_action(
        &self,
        user: &UserId,
        session: SessionId,
    ) -> Result<Option<LivenessAction>, VerificationError> {
        self.liveness.next_action(session, user, self.clock.now())
    }

    pub fn submit_liveness_result(
        &self,
        user: &UserId,
        session: SessionId,
        action: LivenessAction,
        outcome: LivenessOutcome,
    ) -> Result<SubmitOutcome, VerificationError> {
        self.liveness
            .submit(session, user, action, outcome, self.clock.now())
    }

    pub fn abandon_liveness(&self, user: &UserId, session: SessionId) -> Result<(), VerificationError> {
        self.liveness.abandon(session, user)
    }

    pub fn purge_expired_sessions(&self) -> Result<usize, VerificationError> {
        self.liveness.purge_expired(self.clock.now())
    }

    // ── Recovery ────────────────────────────────────────────────────────

    /// Reset one step so the user can redo it. Other steps and the liveness
    /// history are left alone; a terminal failure is cleared.
    pub fn retry(&self, user: &UserId, step: RetryStep) -> Result<StatusReport, VerificationError> {
        self.ensure_exists(user)?;
        let ((), record) = self.update(user, |record, now| {
            record.reset_step(step, now);
            Ok(())
        })?;
        info!(user = %user, %step, "verification step reset");
        self.events.emit(VerificationEvent::StepReset {
            user_id: user.clone(),
            step,
        });
        Ok(record.into())
    }

    /// Put the record into the terminal failed state. Refused for a fully
    /// verified record.
    pub fn mark_failed(&self, user: &UserId, reason: &str) -> Result<StatusReport, VerificationError> {
        self.ensure_exists(user)?;
        let ((), record) = self.update(user, |record, now| {
            if record.mark_failed(reason, now) {
                Ok(())
            } else {
                Err(VerificationError::AlreadyVerified(user.clone()))
            }
        })?;
        warn!(user = %user, reason, "verification marked failed");
        self.events.emit(VerificationEvent::VerificationFailed {
            user_id: user.clone(),
            reason: reason.to_string(),
        });
        Ok(record.into())
    }

    // ── Internals ───────────────────────────────────────────────────────

    /// Run `f` as one store transaction and report a transition into
    /// `Verified`.
    fn update<T>(
        &self,
        user: &UserId,
        mut f: impl FnMut(&mut VerificationRecord, Timestamp) -> Result<T, VerificationError>,
    ) -> Result<(T, VerificationRecord), VerificationError> {
        let now = self.clock.now();
        let mut before = VerificationStatus::Unverified;
        let (value, record) = transact(self.store.as_ref(), user, now, |record| {
            before = record.status();
            f(record, now)
        })?;
        if before != VerificationStatus::Verified && record.status() == VerificationStatus::Verified {
            info!(user = %user, "user fully verified");
            self.events.emit(VerificationEvent::VerificationCompleted {
                user_id: user.clone(),
            });
        }
        Ok((value, record))
    }

    fn ensure_exists(&self, user: &UserId) -> Result<(), VerificationError> {
        if self.store.exists(user)? {
            Ok(())
        } else {
            Err(VerificationError::UnknownUser(user.clone()))
        }
    }

    fn emit_documents_uploaded(&self, user: &UserId) {
        debug!(user = %user, "documents uploaded");
        self.events.emit(VerificationEvent::DocumentsUploaded {
            user_id: user.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idgate_access::DenyReason;
    use idgate_store::InMemoryVerificationStore;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<VerificationEvent>>);

    impl EventSink for Collect {
        fn emit(&self, event: VerificationEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    impl Collect {
        fn kinds(&self) -> Vec<&'static str> {
            self.0.lock().unwrap().iter().map(|e| e.kind()).collect()
        }
    }

    struct FixedClock(AtomicU64);

    impl Clock for FixedClock {
        fn now(&self) -> Timestamp {
            Timestamp::new(self.0.load(Ordering::SeqCst))
        }
    }

    fn user() -> UserId {
        UserId::new("svc-user").unwrap()
    }

    fn service() -> (VerificationService, Arc<Collect>) {
        let sink = Arc::new(Collect::default());
        let svc = VerificationService::new(
            VerificationParams::default(),
            Arc::new(InMemoryVerificationStore::new()),
            sink.clone(),
            Arc::new(FixedClock(AtomicU64::new(50_000))),
        );
        (svc, sink)
    }

    fn verify_core_steps(svc: &VerificationService) {
        svc.mark_email_verified(&user()).unwrap();
        svc.record_document(&user(), DocumentKind::Identity, "docs/id.png").unwrap();
        svc.record_document(&user(), DocumentKind::Selfie, "docs/selfie.png").unwrap();
        svc.evaluate_face_match(&user(), 0.88).unwrap();
    }

    #[test]
    fn unknown_user_reads() {
        let (svc, _) = service();
        assert!(matches!(svc.status(&user()), Err(VerificationError::UnknownUser(_))));
        assert_eq!(svc.next_step(&user()).unwrap(), StepId::EmailVerification);
        assert_eq!(
            svc.authorize(&user(), Preset::EmailOnly).unwrap(),
            Decision::Deny(DenyReason::EmailRequired)
        );
        assert_eq!(svc.authorize(&user(), Preset::Public).unwrap(), Decision::Allow);
        assert_eq!(svc.record_count().unwrap(), 0);
    }

    #[test]
    fn email_link_then_verified() {
        let (svc, sink) = service();
        let report = svc.mark_email_link_sent(&user()).unwrap();
        assert_eq!(report.status, VerificationStatus::EmailPending);
        let report = svc.mark_email_verified(&user()).unwrap();
        assert_eq!(report.status, VerificationStatus::EmailVerified);
        assert_eq!(report.next_step, StepId::DocumentUpload);
        svc.mark_email_verified(&user()).unwrap();
        assert_eq!(sink.kinds(), vec!["email_link_sent", "email_verified"]);
    }

    #[test]
    fn documents_complete_only_with_both_images() {
        let (svc, sink) = service();
        let report = svc
            .record_document(&user(), DocumentKind::Identity, "id.png")
            .unwrap();
        assert!(!report.record.documents_uploaded());
        let report = svc
            .record_document(&user(), DocumentKind::Selfie, "selfie.png")
            .unwrap();
        assert!(report.record.documents_uploaded());
        assert_eq!(sink.kinds(), vec!["documents_uploaded"]);
    }

    #[test]
    fn blank_document_reference_rejected() {
        let (svc, _) = service();
        assert!(matches!(
            svc.record_document(&user(), DocumentKind::Selfie, "   "),
            Err(VerificationError::EmptyDocumentReference)
        ));
        assert_eq!(svc.record_count().unwrap(), 0);
    }

    #[test]
    fn full_flow_reaches_verified() {
        let (svc, sink) = service();
        verify_core_steps(&svc);
        let report = svc.status(&user()).unwrap();
        assert_eq!(report.status, VerificationStatus::Verified);
        assert_eq!(report.next_step, StepId::LivenessCheck);
        assert_eq!(report.progress_percent, 100);
        assert!(sink.kinds().contains(&"verification_completed"));
        assert!(svc.require(&user(), Preset::Full).is_ok());
        assert!(matches!(
            svc.require(&user(), Preset::Booking),
            Err(VerificationError::PolicyDenied(DenyReason::LivenessRequired { .. }))
        ));
    }

    #[test]
    fn named_preset_lookup() {
        let (svc, _) = service();
        assert_eq!(svc.authorize_named(&user(), "public").unwrap(), Decision::Allow);
        assert!(matches!(
            svc.authorize_named(&user(), "vip"),
            Err(VerificationError::Access(_))
        ));
    }

    #[test]
    fn retry_requires_existing_record() {
        let (svc, _) = service();
        assert!(matches!(
            svc.retry(&user(), RetryStep::Face),
            Err(VerificationError::UnknownUser(_))
        ));
    }

    #[test]
    fn retry_resets_one_step() {
        let (svc, sink) = service();
        verify_core_steps(&svc);
        let report = svc.retry(&user(), RetryStep::Face).unwrap();
        assert!(report.record.email_verified());
        assert!(report.record.documents_uploaded());
        assert!(!report.record.face_verified());
        assert_eq!(report.next_step, StepId::FaceComparison);
        assert_eq!(sink.kinds().last(), Some(&"step_reset"));
    }

    #[test]
    fn mark_failed_refused_when_verified() {
        let (svc, _) = service();
        svc.mark_email_verified(&user()).unwrap();
        let report = svc.mark_failed(&user(), "document forgery").unwrap();
        assert_eq!(report.status, VerificationStatus::Failed);
        assert!(matches!(
            svc.evaluate_face_match(&user(), 0.9),
            Err(VerificationError::TerminalFailure(_))
        ));

        let (svc, _) = service();
        verify_core_steps(&svc);
        assert!(matches!(
            svc.mark_failed(&user(), "late"),
            Err(VerificationError::AlreadyVerified(_))
        ));
        assert_eq!(svc.status(&user()).unwrap().status, VerificationStatus::Verified);
    }
}
