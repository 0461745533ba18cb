use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::state::{game::ConnectionId, state_machine::InvalidTransition};

/// Inbound events that are dropped without any state change or broadcast.
///
/// These are expected traffic (late or stale client messages), not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IgnoredEvent {
    /// The connection never joined the session or already left it.
    #[error("unknown connection")]
    UnknownConnection,
    /// The event is not accepted in the current phase.
    #[error("not accepted while {0}")]
    WrongPhase(&'static str),
    /// The sender does not hold the current turn.
    #[error("sender does not hold the turn")]
    NotYourTurn,
    /// Tick from a cancelled, expired or replaced clock.
    #[error("stale clock tick")]
    StaleTick,
}

/// Errors raised by the session core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Missing or empty dataset for the requested mode.
    #[error("configuration error: {0}")]
    Config(String),
    /// Internal inconsistency; never expected in correct operation.
    #[error("invariant violated: {0}")]
    InvariantViolation(&'static str),
    /// A phase change was attempted from a phase that does not allow it.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// The connection already joined this session.
    #[error("connection `{0}` already joined")]
    DuplicateConnection(ConnectionId),
    /// Event dropped on purpose.
    #[error("event ignored: {0}")]
    Ignored(#[from] IgnoredEvent),
}

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The session task is gone.
    #[error("session closed")]
    SessionClosed,
}

impl From<SessionError> for ServiceError {
    fn from(err: SessionError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Service unavailable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::SessionClosed => AppError::ServiceUnavailable("session closed".into()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_errors_become_bad_requests() {
        let unknown_mode = ServiceError::from(SessionError::Config("unknown mode `moons`".into()));
        assert!(matches!(
            &unknown_mode,
            ServiceError::InvalidInput(message) if message.contains("moons")
        ));
        assert!(matches!(AppError::from(unknown_mode), AppError::BadRequest(_)));

        let ignored = ServiceError::from(SessionError::from(IgnoredEvent::WrongPhase("ended")));
        assert!(matches!(
            ignored,
            ServiceError::InvalidInput(message) if message == "event ignored: not accepted while ended"
        ));
    }

    #[test]
    fn closed_session_is_unavailable() {
        let response = AppError::from(ServiceError::SessionClosed).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
