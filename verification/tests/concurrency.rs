//! Concurrent access to one user's record and one liveness session.

use idgate_nullables::{NullClock, RecordingEventSink};
use idgate_store::InMemoryVerificationStore;
use idgate_types::{UserId, VerificationParams};
use idgate_verification::{LivenessOutcome, VerificationService};
use std::sync::{Arc, Barrier};
use std::thread;

fn service() -> Arc<VerificationService> {
    Arc::new(VerificationService::new(
        VerificationParams::default(),
        Arc::new(InMemoryVerificationStore::new()),
        Arc::new(RecordingEventSink::new()),
        Arc::new(NullClock::new(1_000)),
    ))
}

#[test]
fn concurrent_pass_and_fail_for_same_action() {
    for _ in 0..50 {
        let svc = service();
        let user = UserId::new("racer").unwrap();
        let session = svc.start_liveness(&user).unwrap().id;
        let action = svc.next_liveness_action(&user, session).unwrap().unwrap();
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [true, false]
            .into_iter()
            .map(|success| {
                let svc = svc.clone();
                let user = user.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    svc.submit_liveness_result(
                        &user,
                        session,
                        action,
                        LivenessOutcome {
                            success,
                            confidence: 0.5,
                        },
                    )
                    .unwrap()
                })
            })
            .collect();
        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(outcomes.iter().filter(|o| o.newly_passed).count(), 1);
        let record = svc.record(&user).unwrap();
        assert_eq!(record.liveness_checks().len(), 2);
        assert_eq!(record.passed_liveness_count(), 1);
        let view = svc.liveness_session(&user, session).unwrap();
        assert_eq!(view.completed_actions, vec![action]);
    }
}

#[test]
fn concurrent_steps_for_one_user_are_not_lost() {
    let svc = service();
    let user = UserId::new("parallel").unwrap();
    let barrier = Arc::new(Barrier::new(3));

    let handles: Vec<_> = (0..3)
        .map(|step| {
            let svc = svc.clone();
            let user = user.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                match step {
                    0 => svc.mark_email_verified(&user).map(|_| ()),
                    1 => svc.mark_documents_uploaded(&user).map(|_| ()),
                    _ => svc.evaluate_face_match(&user, 0.9).map(|_| ()),
                }
                .unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let record = svc.record(&user).unwrap();
    assert!(record.is_fully_verified());
    assert_eq!(record.status(), record.derive_status());
}
