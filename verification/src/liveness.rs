//! Liveness challenge sessions.
//!
//! A session presents the four liveness actions in random order. Each
//! submitted result is appended to the user's liveness history before the
//! session advances, so the history is the source of truth and a session
//! is only presentation state.
//!
//! State machine per session:
//!
//! ```text
//! Idle -> ActionPending(a) -> ActionEvaluating(a) -> ActionPending(b) -> ... -> Complete
//!                                    |
//!                                    +-- fail --> ActionPending(a)
//! ```

use crate::error::VerificationError;
use crate::events::{EventSink, VerificationEvent};
use idgate_store::{LivenessCheck, VerificationRecord, VerificationStore};
use idgate_types::{CheckResult, LivenessAction, Timestamp, UserId, VerificationParams};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Opaque liveness session handle, rendered as 16 hex digits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str_radix(s, 16).map(Self)
    }
}

impl Serialize for SessionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "action", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    ActionPending(LivenessAction),
    ActionEvaluating(LivenessAction),
    Complete,
}

/// Result of one on-camera attempt, as reported by the client.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LivenessOutcome {
    pub success: bool,
    pub confidence: f64,
}

/// How a session changed after one evaluated attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Transition {
    /// The attempt completed an action for the first time.
    pub newly_passed: bool,
    /// The attempt moved the session into `Complete`.
    pub completed: bool,
    /// Failures recorded for the attempted action so far.
    pub failures: u32,
    /// The per-action failure cap was reached.
    pub exhausted: bool,
}

#[derive(Clone, Debug)]
pub struct LivenessSession {
    id: SessionId,
    user_id: UserId,
    state: SessionState,
    remaining: Vec<LivenessAction>,
    completed: BTreeSet<LivenessAction>,
    failures: BTreeMap<LivenessAction, u32>,
    started_at: Timestamp,
    last_activity: Timestamp,
}

impl LivenessSession {
    /// A new session with the action set shuffled.
    pub fn new<R: Rng + ?Sized>(
        id: SessionId,
        user_id: UserId,
        now: Timestamp,
        rng: &mut R,
    ) -> Self {
        let mut remaining = LivenessAction::ALL.to_vec();
        remaining.shuffle(rng);
        Self {
            id,
            user_id,
            state: SessionState::Idle,
            remaining,
            completed: BTreeSet::new(),
            failures: BTreeMap::new(),
            started_at: now,
            last_activity: now,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Complete
    }

    pub fn pending_action(&self) -> Option<LivenessAction> {
        match self.state {
            SessionState::ActionPending(a) | SessionState::ActionEvaluating(a) => Some(a),
            SessionState::Idle | SessionState::Complete => None,
        }
    }

    pub fn remaining_actions(&self) -> &[LivenessAction] {
        &self.remaining
    }

    pub fn completed_actions(&self) -> Vec<LivenessAction> {
        self.completed.iter().copied().collect()
    }

    pub fn failures(&self, action: LivenessAction) -> u32 {
        self.failures.get(&action).copied().unwrap_or(0)
    }

    pub fn is_expired(&self, ttl_secs: u64, now: Timestamp) -> bool {
        self.last_activity.has_expired(ttl_secs, now)
    }

    /// The action the user should perform now, or `None` once complete.
    ///
    /// Repeated calls return the same pending action.
    pub fn next_action<R: Rng + ?Sized>(
        &mut self,
        now: Timestamp,
        rng: &mut R,
    ) -> Option<LivenessAction> {
        self.last_activity = self.last_activity.max(now);
        match self.state {
            SessionState::Complete => None,
            SessionState::ActionPending(a) | SessionState::ActionEvaluating(a) => Some(a),
            SessionState::Idle => {
                let first = self.remaining.first().copied();
                self.state = first.map_or(SessionState::Complete, SessionState::ActionPending);
                first
            }
        }
    }

    /// Enter `ActionEvaluating` for `action`. Returns the prior state, which
    /// must be handed to [`finish_evaluation`](Self::finish_evaluation) or
    /// [`restore`](Self::restore).
    pub fn begin_evaluation(&mut self, action: LivenessAction) -> SessionState {
        let previous = self.state;
        if previous != SessionState::Complete {
            self.state = SessionState::ActionEvaluating(action);
        }
        previous
    }

    /// Undo [`begin_evaluation`](Self::begin_evaluation) after a failed write.
    pub fn restore(&mut self, previous: SessionState) {
        self.state = previous;
    }

    /// Advance after an attempt has been recorded.
    ///
    /// A pass completes `action` once; later passes for it are not counted
    /// again. A fail re-offers the pending action. Attempts for an action
    /// other than the pending one leave the pending action in place.
    pub fn finish_evaluation<R: Rng + ?Sized>(
        &mut self,
        previous: SessionState,
        action: LivenessAction,
        result: CheckResult,
        now: Timestamp,
        max_failures: Option<u32>,
        rng: &mut R,
    ) -> Transition {
        self.last_activity = self.last_activity.max(now);
        if previous == SessionState::Complete {
            self.state = SessionState::Complete;
            return Transition {
                failures: self.failures(action),
                ..Transition::default()
            };
        }

        let mut transition = Transition::default();
        match result {
            CheckResult::Pass => {
                transition.newly_passed = self.completed.insert(action);
                self.remaining.retain(|a| *a != action);
                self.state = match previous {
                    _ if self.remaining.is_empty() => {
                        transition.completed = true;
                        SessionState::Complete
                    }
                    SessionState::ActionPending(pending) if pending != action => {
                        SessionState::ActionPending(pending)
                    }
                    _ => self
                        .remaining
                        .choose(rng)
                        .copied()
                        .map_or(SessionState::Complete, SessionState::ActionPending),
                };
            }
            CheckResult::Fail => {
                if !self.completed.contains(&action) {
                    let count = self.failures.entry(action).or_insert(0);
                    *count = count.saturating_add(1);
                    transition.exhausted = max_failures.is_some_and(|cap| *count >= cap);
                }
                self.state = previous;
            }
        }
        transition.failures = self.failures(action);
        transition
    }

    pub fn view(&self) -> SessionView {
        let pending_action = self.pending_action();
        SessionView {
            id: self.id,
            user_id: self.user_id.clone(),
            state: self.state,
            pending_action,
            instruction: pending_action.map(|a| a.instruction()),
            completed_actions: self.completed_actions(),
            remaining_actions: self.remaining.clone(),
            started_at: self.started_at,
            last_activity: self.last_activity,
        }
    }
}

/// Serializable snapshot of a session.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionView {
    pub id: SessionId,
    pub user_id: UserId,
    pub state: SessionState,
    pub pending_action: Option<LivenessAction>,
    pub instruction: Option<&'static str>,
    pub completed_actions: Vec<LivenessAction>,
    pub remaining_actions: Vec<LivenessAction>,
    pub started_at: Timestamp,
    pub last_activity: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubmitOutcome {
    pub session: SessionView,
    pub check: LivenessCheck,
    pub newly_passed: bool,
    pub session_complete: bool,
}

type SessionHandle = Arc<Mutex<LivenessSession>>;

/// Owns the live sessions and records every attempt in the store.
///
/// Each session sits behind its own lock, so attempts within a session are
/// serialized while different sessions proceed in parallel.
pub struct LivenessController {
    store: Arc<dyn VerificationStore>,
    events: Arc<dyn EventSink>,
    session_ttl_secs: u64,
    max_failures_per_action: Option<u32>,
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
}

impl LivenessController {
    pub fn new(
        params: &VerificationParams,
        store: Arc<dyn VerificationStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            events,
            session_ttl_secs: params.liveness_session_ttl_secs,
            max_failures_per_action: params.max_liveness_failures_per_action,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn start(&self, user: &UserId, now: Timestamp) -> Result<SessionView, VerificationError> {
        let mut rng = rand::thread_rng();
        let mut sessions = self.lock_sessions()?;
        let id = loop {
            let candidate = SessionId::new(rng.gen());
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };
        let session = LivenessSession::new(id, user.clone(), now, &mut rng);
        let view = session.view();
        sessions.insert(id, Arc::new(Mutex::new(session)));
        debug!(user = %user, session = %id, "liveness session started");
        Ok(view)
    }

    pub fn session(
        &self,
        id: SessionId,
        user: &UserId,
        now: Timestamp,
    ) -> Result<SessionView, VerificationError> {
        self.with_session(id, user, now, |session| Ok(session.view()))
    }

    pub fn next_action(
        &self,
        id: SessionId,
        user: &UserId,
        now: Timestamp,
    ) -> Result<Option<LivenessAction>, VerificationError> {
        self.with_session(id, user, now, |session| {
            Ok(session.next_action(now, &mut rand::thread_rng()))
        })
    }

    /// Record one attempt and advance the session.
    ///
    /// The attempt is appended to the user's history before the session
    /// moves on; if the write fails the session is left as it was.
    pub fn submit(
        &self,
        id: SessionId,
        user: &UserId,
        action: LivenessAction,
        outcome: LivenessOutcome,
        now: Timestamp,
    ) -> Result<SubmitOutcome, VerificationError> {
        if !(0.0..=1.0).contains(&outcome.confidence) {
            return Err(VerificationError::InvalidConfidence(outcome.confidence));
        }
        let result = CheckResult::from_success(outcome.success);
        let check = LivenessCheck {
            action,
            result,
            confidence: outcome.confidence,
            timestamp: now,
        };

        let (submitted, transition) = self.with_session(id, user, now, |session| {
            let previous = session.begin_evaluation(action);
            let mut append = |record: &mut VerificationRecord| {
                record.append_liveness_check(check.clone(), now);
                true
            };
            if let Err(e) = self.store.modify(user, now, &mut append) {
                session.restore(previous);
                return Err(e.into());
            }
            let transition = session.finish_evaluation(
                previous,
                action,
                result,
                now,
                self.max_failures_per_action,
                &mut rand::thread_rng(),
            );
            let submitted = SubmitOutcome {
                session: session.view(),
                check: check.clone(),
                newly_passed: transition.newly_passed,
                session_complete: session.is_complete(),
            };
            Ok((submitted, transition))
        })?;

        debug!(user = %user, session = %id, %action, passed = result.is_pass(), "liveness attempt recorded");
        self.events.emit(VerificationEvent::LivenessCheckRecorded {
            user_id: user.clone(),
            session: id,
            action,
            result,
            confidence: outcome.confidence,
        });

        if transition.completed {
            info!(user = %user, session = %id, "liveness session complete");
            self.events.emit(VerificationEvent::LivenessSessionCompleted {
                user_id: user.clone(),
                session: id,
            });
        }

        if transition.exhausted {
            self.remove(id)?;
            warn!(user = %user, session = %id, %action, attempts = transition.failures, "liveness retries exhausted");
            self.events.emit(VerificationEvent::LivenessSessionAborted {
                user_id: user.clone(),
                session: id,
                action,
            });
            return Err(VerificationError::LivenessRetriesExhausted {
                action,
                attempts: transition.failures,
            });
        }

        Ok(submitted)
    }

    /// Discard a session. Recorded attempts stay in the user's history.
    pub fn abandon(&self, id: SessionId, user: &UserId) -> Result<(), VerificationError> {
        let handle = self.handle(id)?;
        if lock_session(&handle)?.user_id() != user {
            return Err(VerificationError::SessionOwnership {
                session: id,
                user: user.clone(),
            });
        }
        self.remove(id)?;
        debug!(user = %user, session = %id, "liveness session abandoned");
        Ok(())
    }

    /// Drop every session idle for longer than the TTL. Returns the count.
    pub fn purge_expired(&self, now: Timestamp) -> Result<usize, VerificationError> {
        let mut sessions = self.lock_sessions()?;
        let before = sessions.len();
        let ttl = self.session_ttl_secs;
        sessions.retain(|_, handle| match handle.lock() {
            Ok(session) => !session.is_expired(ttl, now),
            Err(_) => false,
        });
        let purged = before - sessions.len();
        if purged > 0 {
            debug!(purged, "expired liveness sessions purged");
        }
        Ok(purged)
    }

    pub fn active_sessions(&self) -> Result<usize, VerificationError> {
        Ok(self.lock_sessions()?.len())
    }

    fn with_session<T>(
        &self,
        id: SessionId,
        user: &UserId,
        now: Timestamp,
        f: impl FnOnce(&mut LivenessSession) -> Result<T, VerificationError>,
    ) -> Result<T, VerificationError> {
        let handle = self.handle(id)?;
        let mut session = lock_session(&handle)?;
        if session.user_id() != user {
            return Err(VerificationError::SessionOwnership {
                session: id,
                user: user.clone(),
            });
        }
        if session.is_expired(self.session_ttl_secs, now) {
            drop(session);
            self.remove(id)?;
            debug!(session = %id, "liveness session expired");
            return Err(VerificationError::SessionExpired(id));
        }
        f(&mut session)
    }

    fn handle(&self, id: SessionId) -> Result<SessionHandle, VerificationError> {
        self.lock_sessions()?
            .get(&id)
            .cloned()
            .ok_or(VerificationError::SessionNotFound(id))
    }

    fn remove(&self, id: SessionId) -> Result<(), VerificationError> {
        self.lock_sessions()?.remove(&id);
        Ok(())
    }

    fn lock_sessions(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<SessionId, SessionHandle>>, VerificationError> {
        self.sessions
            .lock()
            .map_err(|_| VerificationError::Internal("liveness session table poisoned".into()))
    }
}

fn lock_session(
    handle: &Mutex<LivenessSession>,
) -> Result<MutexGuard<'_, LivenessSession>, VerificationError> {
    handle
        .lock()
        .map_err(|_| VerificationError::Internal("liveness session poisoned".into()))
}
