use std::sync::Arc;

use uuid::Uuid;

/// Stable identity of a connected client for the lifetime of its socket.
pub type ConnectionId = Uuid;

/// A geographic unit players have to name (country, region, state...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Mode-specific identifier sent to clients (ISO code, region code).
    pub id: String,
    /// Canonical name, which is also the expected answer.
    pub name: String,
    /// Accepted alternative spellings.
    pub alt_names: Vec<String>,
}

impl Entity {
    /// Build an entity without alternative names.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            alt_names: Vec::new(),
        }
    }

    /// Attach accepted alternative spellings.
    pub fn with_alt_names<I, S>(mut self, alt_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alt_names = alt_names.into_iter().map(Into::into).collect();
        self
    }
}

/// Player info tracked during a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Connection the player joined from.
    pub connection_id: ConnectionId,
    /// Display name chosen at join time.
    pub name: String,
    /// Accumulated points, never decreases within a game.
    pub score: u32,
    /// Whether the player asked to start the game.
    pub is_ready: bool,
    /// Number of entities the player named correctly.
    pub correct_answers: u32,
    /// Number of wrong guesses.
    pub total_attempts: u32,
}

impl Player {
    /// Fresh player with zeroed stats.
    pub fn new(connection_id: ConnectionId, name: impl Into<String>) -> Self {
        Self {
            connection_id,
            name: name.into(),
            score: 0,
            is_ready: false,
            correct_answers: 0,
            total_attempts: 0,
        }
    }
}

/// Settings and dataset for one kind of game (e.g. countries of the world).
///
/// A mode is handed to each session at construction; sessions never look it
/// up from global state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameMode {
    /// Identifier used by clients when opening a room.
    pub id: String,
    /// Human readable label.
    pub name: String,
    /// Seconds a player has to answer before the turn rotates.
    pub turn_duration_secs: u32,
    /// Points awarded for each correct answer.
    pub points_per_correct: u32,
    /// Number of ready players required to start a game.
    pub min_players: usize,
    /// Entities making up a full game, in dataset order.
    pub entities: Vec<Entity>,
}

/// Modes are shared read-only between the config and every session using them.
pub type SharedMode = Arc<GameMode>;
