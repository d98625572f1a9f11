//! In-memory verification store.

use crate::{StoreError, VerificationRecord, VerificationStore};
use idgate_types::{Timestamp, UserId};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::trace;

/// A thread-safe in-memory store.
///
/// One lock guards the whole map, so every `modify` is serialized with every
/// other mutation and the read-modify-write is atomic.
#[derive(Default)]
pub struct InMemoryVerificationStore {
    records: Mutex<HashMap<UserId, VerificationRecord>>,
}

impl InMemoryVerificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<UserId, VerificationRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Backend("verification store lock poisoned".into()))
    }
}

impl VerificationStore for InMemoryVerificationStore {
    fn get(&self, user: &UserId) -> Result<Option<VerificationRecord>, StoreError> {
        Ok(self.lock()?.get(user).cloned())
    }

    fn modify(
        &self,
        user: &UserId,
        now: Timestamp,
        mutate: &mut dyn FnMut(&mut VerificationRecord) -> bool,
    ) -> Result<VerificationRecord, StoreError> {
        let mut records = self.lock()?;
        let mut working = records
            .get(user)
            .cloned()
            .unwrap_or_else(|| VerificationRecord::new(user.clone(), now));
        if mutate(&mut working) {
            trace!(user = %user, status = %working.status(), "verification record committed");
            records.insert(user.clone(), working.clone());
            Ok(working)
        } else {
            Ok(records.get(user).cloned().unwrap_or(working))
        }
    }

    fn record_count(&self) -> Result<u64, StoreError> {
        Ok(self.lock()?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transact;
    use std::sync::Arc;
    use std::thread;

    fn user(name: &str) -> UserId {
        UserId::new(name).unwrap()
    }

    #[test]
    fn modify_creates_on_first_touch() {
        let store = InMemoryVerificationStore::new();
        let alice = user("alice");
        assert!(store.get(&alice).unwrap().is_none());

        let rec = store
            .modify(&alice, Timestamp::new(7), &mut |r| r.mark_email_verified(Timestamp::new(7)))
            .unwrap();
        assert!(rec.email_verified());
        assert_eq!(rec.created_at(), Timestamp::new(7));
        assert_eq!(store.record_count().unwrap(), 1);
    }

    #[test]
    fn rejected_mutation_is_not_persisted() {
        let store = InMemoryVerificationStore::new();
        let bob = user("bob");
        let result: Result<((), VerificationRecord), StoreError> =
            transact(&store, &bob, Timestamp::new(1), |r| {
                r.mark_email_verified(Timestamp::new(1));
                Err(StoreError::Backend("boom".into()))
            });
        assert!(result.is_err());
        assert!(store.get(&bob).unwrap().is_none());
    }

    #[test]
    fn concurrent_modifications_are_not_lost() {
        let store = Arc::new(InMemoryVerificationStore::new());
        let carol = user("carol");
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let carol = carol.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        store
                            .modify(&carol, Timestamp::new(i), &mut |r| {
                                r.record_face_failure(Timestamp::new(i));
                                true
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let rec = store.get(&carol).unwrap().unwrap();
        assert_eq!(rec.failed_face_attempts(), 400);
    }
}
