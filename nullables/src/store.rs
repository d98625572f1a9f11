//! Nullable store: in-memory storage with switchable failures.

use idgate_store::{InMemoryVerificationStore, StoreError, VerificationRecord, VerificationStore};
use idgate_types::{Timestamp, UserId};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Wraps an in-memory store and fails reads or writes on demand.
///
/// Failures surface as [`StoreError::Unavailable`], the error a real
/// backend reports when it cannot be reached.
#[derive(Default)]
pub struct FaultyStore {
    inner: InMemoryVerificationStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `modify` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self, flag: &AtomicBool, op: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(format!("{op} disabled")))
        } else {
            Ok(())
        }
    }
}

impl VerificationStore for FaultyStore {
    fn get(&self, user: &UserId) -> Result<Option<VerificationRecord>, StoreError> {
        self.check(&self.fail_reads, "reads")?;
        self.inner.get(user)
    }

    fn modify(
        &self,
        user: &UserId,
        now: Timestamp,
        mutate: &mut dyn FnMut(&mut VerificationRecord) -> bool,
    ) -> Result<VerificationRecord, StoreError> {
        self.check(&self.fail_writes, "writes")?;
        let record = self.inner.modify(user, now, mutate)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }

    fn record_count(&self) -> Result<u64, StoreError> {
        self.check(&self.fail_reads, "reads")?;
        self.inner.record_count()
    }
}
