use indexmap::IndexMap;

use crate::{
    error::SessionError,
    state::game::{ConnectionId, Player},
};

/// Connected players keyed by connection, in join order.
///
/// Join order is the turn order, so removals must keep the relative order of
/// the remaining players.
#[derive(Debug, Clone, Default)]
pub struct PlayerRegistry {
    players: IndexMap<ConnectionId, Player>,
}

impl PlayerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new player at the end of the turn order.
    pub fn add(
        &mut self,
        connection_id: ConnectionId,
        name: impl Into<String>,
    ) -> Result<&Player, SessionError> {
        if self.players.contains_key(&connection_id) {
            return Err(SessionError::DuplicateConnection(connection_id));
        }
        let entry = self
            .players
            .entry(connection_id)
            .or_insert_with(|| Player::new(connection_id, name));
        Ok(entry)
    }

    /// Remove a player, returning it with its index in the turn order.
    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<(usize, Player)> {
        self.players
            .shift_remove_full(connection_id)
            .map(|(index, _, player)| (index, player))
    }

    /// Look up a player.
    pub fn get(&self, connection_id: &ConnectionId) -> Option<&Player> {
        self.players.get(connection_id)
    }

    /// Look up a player for mutation.
    pub fn get_mut(&mut self, connection_id: &ConnectionId) -> Option<&mut Player> {
        self.players.get_mut(connection_id)
    }

    /// Player at `index` in turn order.
    pub fn get_index(&self, index: usize) -> Option<&Player> {
        self.players.get_index(index).map(|(_, player)| player)
    }

    /// Players in turn order.
    pub fn all(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// First player in turn order.
    pub fn first(&self) -> Option<&Player> {
        self.players.first().map(|(_, player)| player)
    }

    /// Player after `connection_id` in turn order, wrapping to the first one.
    pub fn next_after(&self, connection_id: &ConnectionId) -> Option<&Player> {
        let index = self.players.get_index_of(connection_id)?;
        self.get_index((index + 1) % self.players.len())
    }

    /// Number of players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// True when there is at least one player and all of them are ready.
    pub fn all_ready(&self) -> bool {
        !self.players.is_empty() && self.players.values().all(|player| player.is_ready)
    }

    /// Zero scores, stats and ready flags for a new game.
    pub fn reset_for_restart(&mut self) {
        for player in self.players.values_mut() {
            player.score = 0;
            player.correct_answers = 0;
            player.total_attempts = 0;
            player.is_ready = false;
        }
    }
}
