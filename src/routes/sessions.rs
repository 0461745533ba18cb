use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::session::{ModeSummary, SessionSummary},
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Routes exposing modes and live sessions.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/modes", get(list_modes))
        .route("/sessions", get(list_sessions))
        .route("/sessions/{room}", get(get_session))
}

/// List the configured game modes.
#[utoipa::path(
    get,
    path = "/modes",
    tag = "sessions",
    responses(
        (status = 200, description = "Configured modes", body = [ModeSummary])
    )
)]
pub async fn list_modes(State(state): State<SharedState>) -> Json<Vec<ModeSummary>> {
    Json(session_service::list_modes(&state))
}

/// List the sessions currently running.
#[utoipa::path(
    get,
    path = "/sessions",
    tag = "sessions",
    responses(
        (status = 200, description = "Live sessions", body = [SessionSummary])
    )
)]
pub async fn list_sessions(State(state): State<SharedState>) -> Json<Vec<SessionSummary>> {
    Json(session_service::list_sessions(&state))
}

/// Inspect the session running in a room.
#[utoipa::path(
    get,
    path = "/sessions/{room}",
    tag = "sessions",
    params(("room" = String, Path, description = "Room code of the session")),
    responses(
        (status = 200, description = "Session state", body = SessionSummary),
        (status = 404, description = "No session in this room")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    Path(room): Path<String>,
) -> Result<Json<SessionSummary>, AppError> {
    let summary = session_service::session_summary(&state, &room)?;
    Ok(Json(summary))
}
