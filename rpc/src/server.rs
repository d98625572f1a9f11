//! Axum-based RPC server.

use crate::error::RpcError;
use crate::handlers;
use axum::routing::{get, post};
use axum::Router;
use idgate_verification::VerificationService;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<VerificationService>,
}

/// All routes, bound to `service`.
pub fn router(service: Arc<VerificationService>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/verification/:user/status", get(handlers::get_status))
        .route("/verification/:user/next-step", get(handlers::get_next_step))
        .route(
            "/verification/:user/authorize/:preset",
            get(handlers::authorize),
        )
        .route("/verification/:user/email/sent", post(handlers::email_sent))
        .route(
            "/verification/:user/email/verified",
            post(handlers::email_verified),
        )
        .route("/verification/:user/documents", post(handlers::record_document))
        .route(
            "/verification/:user/documents/complete",
            post(handlers::documents_complete),
        )
        .route("/verification/:user/face", post(handlers::face_match))
        .route("/verification/:user/retry", post(handlers::retry))
        .route("/verification/:user/fail", post(handlers::mark_failed))
        .route("/verification/:user/liveness", post(handlers::start_liveness))
        .route(
            "/verification/:user/liveness/:session",
            get(handlers::get_liveness_session).delete(handlers::abandon_liveness),
        )
        .route(
            "/verification/:user/liveness/:session/next",
            get(handlers::next_liveness_action),
        )
        .route(
            "/verification/:user/liveness/:session/result",
            post(handlers::submit_liveness_result),
        )
        .with_state(AppState { service })
}

pub struct RpcServer {
    addr: SocketAddr,
    service: Arc<VerificationService>,
}

impl RpcServer {
    pub fn new(addr: SocketAddr, service: Arc<VerificationService>) -> Self {
        Self { addr, service }
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), RpcError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| RpcError::Server(format!("bind {}: {e}", self.addr)))?;
        info!(addr = %self.addr, "rpc server listening");
        axum::serve(listener, router(self.service))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))
    }
}
