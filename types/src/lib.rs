//! Fundamental types for the idgate verification engine.
//!
//! This crate defines the value types shared across every other crate in the
//! workspace: user identifiers, timestamps, verification status and step
//! enums, liveness actions, and the tunable verification parameters.

pub mod document;
pub mod error;
pub mod liveness;
pub mod params;
pub mod status;
pub mod step;
pub mod time;
pub mod user;

pub use document::DocumentKind;
pub use error::TypesError;
pub use liveness::{CheckResult, LivenessAction};
pub use params::VerificationParams;
pub use status::VerificationStatus;
pub use step::{RetryStep, StepId};
pub use time::Timestamp;
pub use user::UserId;
