//! Request handlers and their wire types.

use crate::error::RpcError;
use crate::server::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use idgate_access::Preset;
use idgate_types::{DocumentKind, LivenessAction, RetryStep, StepId, UserId};
use idgate_verification::{
    FaceMatchVerdict, LivenessOutcome, SessionId, SessionView, StatusReport, SubmitOutcome,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

fn parse<T>(raw: &str, what: &str) -> Result<T, RpcError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse()
        .map_err(|e| RpcError::InvalidRequest(format!("{what}: {e}")))
}

// ── Requests ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DocumentRequest {
    /// `identity` or `selfie`.
    pub kind: String,
    /// Storage key of the uploaded image.
    pub reference: String,
}

#[derive(Debug, Deserialize)]
pub struct FaceMatchRequest {
    pub similarity_score: f64,
}

#[derive(Debug, Deserialize)]
pub struct RetryRequest {
    /// `email`, `documents` or `face`.
    pub step: String,
}

#[derive(Debug, Deserialize)]
pub struct FailRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct LivenessResultRequest {
    pub action: String,
    pub success: bool,
    pub confidence: f64,
}

// ── Responses ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub records: u64,
}

#[derive(Debug, Serialize)]
pub struct NextStepResponse {
    pub user_id: UserId,
    pub next_step: StepId,
}

#[derive(Debug, Serialize)]
pub struct AuthorizedResponse {
    pub allowed: bool,
    pub preset: Preset,
}

#[derive(Debug, Serialize)]
pub struct FaceMatchResponse {
    pub verdict: FaceMatchVerdict,
    pub status: StatusReport,
}

#[derive(Debug, Serialize)]
pub struct NextActionResponse {
    pub session: SessionId,
    pub action: Option<LivenessAction>,
    pub instruction: Option<&'static str>,
    pub complete: bool,
}

// ── Handlers ─────────────────────────────────────────────────────────────

pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, RpcError> {
    Ok(Json(HealthResponse {
        status: "ok",
        records: state.service.record_count()?,
    }))
}

pub async fn get_status(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<StatusReport>, RpcError> {
    let user: UserId = parse(&user, "user")?;
    Ok(Json(state.service.status(&user)?))
}

pub async fn get_next_step(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<NextStepResponse>, RpcError> {
    let user: UserId = parse(&user, "user")?;
    let next_step = state.service.next_step(&user)?;
    Ok(Json(NextStepResponse {
        user_id: user,
        next_step,
    }))
}

/// 200 when the preset is satisfied, 403 with the remediation step otherwise.
pub async fn authorize(
    State(state): State<AppState>,
    Path((user, preset)): Path<(String, String)>,
) -> Result<Json<AuthorizedResponse>, RpcError> {
    let user: UserId = parse(&user, "user")?;
    let preset: Preset = preset.parse()?;
    state.service.require(&user, preset).inspect_err(|e| {
        debug!(user = %user, %preset, error = %e, "access check refused");
    })?;
    Ok(Json(AuthorizedResponse {
        allowed: true,
        preset,
    }))
}

pub async fn email_sent(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<StatusReport>, RpcError> {
    let user: UserId = parse(&user, "user")?;
    Ok(Json(state.service.mark_email_link_sent(&user)?))
}

pub async fn email_verified(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<StatusReport>, RpcError> {
    let user: UserId = parse(&user, "user")?;
    Ok(Json(state.service.mark_email_verified(&user)?))
}

pub async fn record_document(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(req): Json<DocumentRequest>,
) -> Result<Json<StatusReport>, RpcError> {
    let user: UserId = parse(&user, "user")?;
    let kind: DocumentKind = parse(&req.kind, "document kind")?;
    Ok(Json(state.service.record_document(&user, kind, &req.reference)?))
}

pub async fn documents_complete(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<StatusReport>, RpcError> {
    let user: UserId = parse(&user, "user")?;
    Ok(Json(state.service.mark_documents_uploaded(&user)?))
}

pub async fn face_match(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(req): Json<FaceMatchRequest>,
) -> Result<Json<FaceMatchResponse>, RpcError> {
    let user: UserId = parse(&user, "user")?;
    let outcome = state.service.evaluate_face_match(&user, req.similarity_score)?;
    Ok(Json(FaceMatchResponse {
        verdict: outcome.verdict,
        status: outcome.record.into(),
    }))
}

pub async fn retry(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(req): Json<RetryRequest>,
) -> Result<Json<StatusReport>, RpcError> {
    let user: UserId = parse(&user, "user")?;
    let step: RetryStep = parse(&req.step, "step")?;
    Ok(Json(state.service.retry(&user, step)?))
}

pub async fn mark_failed(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(req): Json<FailRequest>,
) -> Result<Json<StatusReport>, RpcError> {
    let user: UserId = parse(&user, "user")?;
    let reason = req.reason.trim();
    if reason.is_empty() {
        return Err(RpcError::InvalidRequest("reason must not be empty".into()));
    }
    Ok(Json(state.service.mark_failed(&user, reason)?))
}

pub async fn start_liveness(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<(StatusCode, Json<SessionView>), RpcError> {
    let user: UserId = parse(&user, "user")?;
    let view = state.service.start_liveness(&user)?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_liveness_session(
    State(state): State<AppState>,
    Path((user, session)): Path<(String, String)>,
) -> Result<Json<SessionView>, RpcError> {
    let user: UserId = parse(&user, "user")?;
    let session: SessionId = parse(&session, "session")?;
    Ok(Json(state.service.liveness_session(&user, session)?))
}

pub async fn next_liveness_action(
    State(state): State<AppState>,
    Path((user, session)): Path<(String, String)>,
) -> Result<Json<NextActionResponse>, RpcError> {
    let user: UserId = parse(&user, "user")?;
    let session: SessionId = parse(&session, "session")?;
    let action = state.service.next_liveness_action(&user, session)?;
    Ok(Json(NextActionResponse {
        session,
        action,
        instruction: action.map(|a| a.instruction()),
        complete: action.is_none(),
    }))
}

pub async fn submit_liveness_result(
    State(state): State<AppState>,
    Path((user, session)): Path<(String, String)>,
    Json(req): Json<LivenessResultRequest>,
) -> Result<Json<SubmitOutcome>, RpcError> {
    let user: UserId = parse(&user, "user")?;
    let session: SessionId = parse(&session, "session")?;
    let action: LivenessAction = parse(&req.action, "action")?;
    let outcome = LivenessOutcome {
        success: req.success,
        confidence: req.confidence,
    };
    Ok(Json(state.service.submit_liveness_result(
        &user, session, action, outcome,
    )?))
}

pub async fn abandon_liveness(
    State(state): State<AppState>,
    Path((user, session)): Path<(String, String)>,
) -> Result<StatusCode, RpcError> {
    let user: UserId = parse(&user, "user")?;
    let session: SessionId = parse(&session, "session")?;
    state.service.abandon_liveness(&user, session)?;
    Ok(StatusCode::NO_CONTENT)
}
