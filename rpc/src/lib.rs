//! HTTP/JSON API for the verification service.
//!
//! Provides endpoints for:
//! - Verification status and the next required step
//! - Access checks against a named preset
//! - Email, document and face-match progress
//! - Liveness challenge sessions
//! - Step retry and administrative failure

pub mod error;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use server::{router, AppState, RpcServer};
