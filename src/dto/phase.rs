use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::SessionPhase;

/// Session phase as exposed to clients (WebSocket and REST).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleSessionPhase {
    /// Waiting for players to ready up.
    Lobby,
    /// Turns are being played.
    Playing,
    /// Final scores are available.
    Ended,
}

impl From<&SessionPhase> for VisibleSessionPhase {
    fn from(value: &SessionPhase) -> Self {
        match value {
            SessionPhase::Lobby => VisibleSessionPhase::Lobby,
            SessionPhase::Playing(_) => VisibleSessionPhase::Playing,
            SessionPhase::Ended(_) => VisibleSessionPhase::Ended,
        }
    }
}
