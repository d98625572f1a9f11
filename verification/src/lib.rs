//! Progressive identity verification.
//!
//! A user moves through four steps:
//! 1. **Email**: a single-use confirmation link is redeemed.
//! 2. **Documents**: an identity document and a selfie are stored.
//! 3. **Face match**: an externally computed similarity score clears the threshold.
//! 4. **Liveness**: the user performs randomized on-camera actions.
//!
//! The [`step`] resolver derives the next action from a record, the
//! [`face`] evaluator and the [`liveness`] controller mutate records through
//! the store, and [`VerificationService`] ties them to the access policy
//! engine behind one facade. Domain events go to an injected [`EventSink`].

pub mod clock;
pub mod error;
pub mod events;
pub mod face;
pub mod liveness;
pub mod service;
pub mod status;
pub mod step;

pub use clock::{Clock, SystemClock};
pub use error::VerificationError;
pub use events::{EventSink, TracingEventSink, VerificationEvent};
pub use face::{FaceMatchEvaluator, FaceMatchOutcome, FaceMatchVerdict};
pub use liveness::{
    LivenessController, LivenessOutcome, LivenessSession, SessionId, SessionState, SessionView,
    SubmitOutcome,
};
pub use service::VerificationService;
pub use status::StatusReport;
pub use step::next_step;
