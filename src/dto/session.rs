use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::{common::PlayerSummary, phase::VisibleSessionPhase},
    state::{
        Snapshot,
        game::GameMode,
        state_machine::SessionPhase,
    },
};

/// Public view of a running session returned by `/sessions` routes.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSummary {
    /// Room code.
    pub room: String,
    /// Mode identifier.
    pub mode: String,
    pub phase: VisibleSessionPhase,
    /// Number of phase changes since the session opened.
    pub version: usize,
    /// Players in turn order.
    pub players: Vec<PlayerSummary>,
    /// Holder of the current turn while playing.
    pub current_player_name: Option<String>,
    pub turn_number: Option<u32>,
    /// Seconds left in the current turn.
    pub turn_time_left: u32,
    /// Entities still to be found in the current game.
    pub remaining_entities: usize,
    /// Entities found in the current game.
    pub guessed_entities: usize,
    /// Why the last game ended, once ended.
    pub end_reason: Option<String>,
}

impl From<&Snapshot> for SessionSummary {
    fn from(snapshot: &Snapshot) -> Self {
        let (current_player_name, turn_number) = match snapshot.phase {
            SessionPhase::Playing(turn) => (
                snapshot
                    .players
                    .iter()
                    .find(|player| player.connection_id == turn.player)
                    .map(|player| player.name.clone()),
                Some(turn.number),
            ),
            _ => (None, None),
        };

        Self {
            room: snapshot.room.clone(),
            mode: snapshot.mode.clone(),
            phase: VisibleSessionPhase::from(&snapshot.phase),
            version: snapshot.version,
            players: snapshot.players.iter().map(PlayerSummary::from).collect(),
            current_player_name,
            turn_number,
            turn_time_left: snapshot.turn_time_left,
            remaining_entities: snapshot.remaining,
            guessed_entities: snapshot.guessed,
            end_reason: match snapshot.phase {
                SessionPhase::Ended(reason) => Some(reason.to_string()),
                _ => None,
            },
        }
    }
}

/// Playable mode as listed by `/modes`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ModeSummary {
    pub id: String,
    pub name: String,
    /// Size of the dataset.
    pub entities: usize,
    pub turn_duration_secs: u32,
    pub points_per_correct: u32,
    /// Ready players needed to start.
    pub min_players: usize,
    /// Mode used when a join names none.
    pub is_default: bool,
}

impl From<&GameMode> for ModeSummary {
    fn from(mode: &GameMode) -> Self {
        Self {
            id: mode.id.clone(),
            name: mode.name.clone(),
            entities: mode.entities.len(),
            turn_duration_secs: mode.turn_duration_secs,
            points_per_correct: mode.points_per_correct,
            min_players: mode.min_players,
            is_default: false,
        }
    }
}
