use serde::Serialize;
use utoipa::ToSchema;

use crate::state::game::Player;

/// Roster entry sent whenever the player list changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PlayerSummary {
    pub name: String,
    pub score: u32,
    pub is_ready: bool,
}

impl From<&Player> for PlayerSummary {
    fn from(player: &Player) -> Self {
        Self {
            name: player.name.clone(),
            score: player.score,
            is_ready: player.is_ready,
        }
    }
}

/// Per-player statistics shown on the final scoreboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FinalScore {
    pub name: String,
    pub score: u32,
    pub correct_answers: u32,
    pub total_attempts: u32,
}

impl From<&Player> for FinalScore {
    fn from(player: &Player) -> Self {
        Self {
            name: player.name.clone(),
            score: player.score,
            correct_answers: player.correct_answers,
            total_attempts: player.total_attempts,
        }
    }
}
