//! HTTP request handlers

use super::server::AppContext;
use crate::error::Error;
use crate::playback::{SessionHandle, SessionRequest, SessionSnapshot, UserCommand};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use zoomi_common::Locale;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
    error: String,
}

/// Body of POST /api/v1/sessions. Exactly one reference is expected.
#[derive(Debug, Default, Deserialize)]
pub struct OpenSessionRequest {
    #[serde(default)]
    library_item_id: Option<Uuid>,
    #[serde(default)]
    exercise_id: Option<Uuid>,
    #[serde(default)]
    plan_id: Option<Uuid>,
    #[serde(default)]
    user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct LocaleRequest {
    /// Language tag, e.g. "he", "en", "he-IL"
    locale: String,
}

#[derive(Debug, Serialize)]
pub struct LocaleResponse {
    locale: Locale,
}

type ApiError = (StatusCode, Json<StatusResponse>);

fn api_error(err: Error) -> ApiError {
    let status = match &err {
        Error::InvalidState(_) => StatusCode::CONFLICT,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(StatusResponse {
            status: "error".to_string(),
            error: err.to_string(),
        }),
    )
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "exercise_player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Session Endpoints
// ============================================================================

/// POST /api/v1/sessions - Open a playback session, replacing the current one
pub async fn open_session(
    State(ctx): State<AppContext>,
    Json(req): Json<OpenSessionRequest>,
) -> (StatusCode, Json<SessionSnapshot>) {
    let handle = ctx
        .state
        .open_session(SessionRequest {
            library_item_id: req.library_item_id,
            exercise_id: req.exercise_id,
            plan_id: req.plan_id,
            user_id: req.user_id,
        })
        .await;

    info!(session_id = %handle.session_id(), "Session opened via API");
    (StatusCode::CREATED, Json(handle.snapshot()))
}

async fn current(ctx: &AppContext) -> Result<SessionHandle, ApiError> {
    ctx.state
        .current_session()
        .await
        .ok_or_else(|| api_error(Error::NotFound("No session open".to_string())))
}

/// GET /api/v1/session - Snapshot of the current session
pub async fn get_session(State(ctx): State<AppContext>) -> Result<Json<SessionSnapshot>, ApiError> {
    let handle = current(&ctx).await?;
    Ok(Json(handle.snapshot()))
}

async fn command(ctx: &AppContext, command: UserCommand) -> Result<Json<SessionSnapshot>, ApiError> {
    let handle = current(ctx).await?;
    match handle.send(command).await {
        Ok(snapshot) => Ok(Json(snapshot)),
        Err(e) => {
            warn!(session_id = %handle.session_id(), %command, "Command rejected: {}", e);
            Err(api_error(e))
        }
    }
}

/// POST /api/v1/session/start
pub async fn start(State(ctx): State<AppContext>) -> Result<Json<SessionSnapshot>, ApiError> {
    command(&ctx, UserCommand::Start).await
}

/// POST /api/v1/session/done - "I'm done" on a rep prompt
pub async fn reps_done(State(ctx): State<AppContext>) -> Result<Json<SessionSnapshot>, ApiError> {
    command(&ctx, UserCommand::RepsDone).await
}

/// POST /api/v1/session/replay
pub async fn replay(State(ctx): State<AppContext>) -> Result<Json<SessionSnapshot>, ApiError> {
    command(&ctx, UserCommand::Replay).await
}

/// POST /api/v1/session/dismiss - Close the completion summary
pub async fn dismiss(State(ctx): State<AppContext>) -> Result<Json<SessionSnapshot>, ApiError> {
    command(&ctx, UserCommand::DismissSummary).await
}

/// POST /api/v1/session/back - Leave the player
pub async fn back(State(ctx): State<AppContext>) -> Result<Json<SessionSnapshot>, ApiError> {
    command(&ctx, UserCommand::Exit).await
}

// ============================================================================
// Locale Endpoints
// ============================================================================

/// GET /api/v1/locale
pub async fn get_locale(State(ctx): State<AppContext>) -> Json<LocaleResponse> {
    Json(LocaleResponse {
        locale: ctx.state.locale(),
    })
}

/// PUT /api/v1/locale - Applies from the next resolved exercise
pub async fn set_locale(
    State(ctx): State<AppContext>,
    Json(req): Json<LocaleRequest>,
) -> Json<LocaleResponse> {
    let locale = Locale::from_language_tag(&req.locale);
    ctx.state.set_locale(locale);
    Json(LocaleResponse { locale })
}
