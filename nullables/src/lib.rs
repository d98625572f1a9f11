//! Nullable infrastructure for deterministic testing.
//!
//! The verification service takes its clock, event sink and store as
//! injected trait objects. This crate provides test-friendly implementations
//! that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Record what happened for later assertions
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod events;
pub mod store;

pub use clock::NullClock;
pub use events::RecordingEventSink;
pub use store::FaultyStore;
