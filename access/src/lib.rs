//! Access policy engine.
//!
//! Protected operations declare a [`Preset`]; the engine evaluates the
//! preset's [`AccessRequirement`] against a user's verification record and
//! returns [`Decision::Allow`] or [`Decision::Deny`] with the first unmet
//! requirement. Evaluation is read-only and safe to run on every request.

pub mod decision;
pub mod engine;
pub mod error;
pub mod preset;
pub mod requirement;

pub use decision::{Decision, DenyReason};
pub use engine::{authorize, AccessPolicyEngine};
pub use error::AccessError;
pub use preset::Preset;
pub use requirement::AccessRequirement;
