//! Verification record storage trait.

use crate::{StoreError, VerificationRecord};
use idgate_types::{Timestamp, UserId};

/// Storage for verification records, keyed by user.
///
/// Every mutation goes through [`VerificationStore::modify`], which must run
/// as an atomic read-modify-write per user: concurrent callers for the same
/// user observe each other's committed changes and never lose an update.
pub trait VerificationStore: Send + Sync {
    /// Fetch a user's record, if one exists.
    fn get(&self, user: &UserId) -> Result<Option<VerificationRecord>, StoreError>;

    /// Atomically apply `mutate` to the user's record.
    ///
    /// A fresh record (created at `now`) is passed when none exists yet. The
    /// change is persisted only when `mutate` returns `true`. Returns the
    /// record as it stands after the call.
    fn modify(
        &self,
        user: &UserId,
        now: Timestamp,
        mutate: &mut dyn FnMut(&mut VerificationRecord) -> bool,
    ) -> Result<VerificationRecord, StoreError>;

    /// Number of stored records.
    fn record_count(&self) -> Result<u64, StoreError>;

    fn exists(&self, user: &UserId) -> Result<bool, StoreError> {
        self.get(user).map(|r| r.is_some())
    }
}

/// Run a fallible mutation as a single store transaction.
///
/// The record is committed only if `f` returns `Ok`; an `Err` from `f` leaves
/// the stored record untouched and is returned to the caller.
pub fn transact<S, T, E, F>(
    store: &S,
    user: &UserId,
    now: Timestamp,
    mut f: F,
) -> Result<(T, VerificationRecord), E>
where
    S: VerificationStore + ?Sized,
    E: From<StoreError>,
    F: FnMut(&mut VerificationRecord) -> Result<T, E>,
{
    let mut outcome: Option<Result<T, E>> = None;
    let record = store.modify(user, now, &mut |record| {
        let result = f(record);
        let commit = result.is_ok();
        outcome = Some(result);
        commit
    })?;
    match outcome {
        Some(Ok(value)) => Ok((value, record)),
        Some(Err(e)) => Err(e),
        None => Err(E::from(StoreError::Backend(
            "store did not apply the mutation".into(),
        ))),
    }
}
