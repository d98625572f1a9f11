//! Verification record model and abstract storage traits.
//!
//! Every storage backend implements [`VerificationStore`]. The rest of the
//! workspace depends only on the trait; [`InMemoryVerificationStore`] backs
//! the daemon and the tests.

pub mod error;
pub mod memory;
pub mod record;
pub mod verification;

pub use error::StoreError;
pub use memory::InMemoryVerificationStore;
pub use record::{DocumentRefs, LivenessCheck, LivenessSummary, VerificationRecord};
pub use verification::{transact, VerificationStore};
