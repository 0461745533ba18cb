use std::{fmt, sync::Arc};

use rand::{SeedableRng, rngs::StdRng};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    dto::{
        common::{FinalScore, PlayerSummary},
        phase::VisibleSessionPhase,
        timestamp_now,
        ws::ServerMessage,
    },
    error::{IgnoredEvent, SessionError},
    state::{
        clock::{ClockGeneration, ClockSignal, Ticker, TurnClock},
        game::{ConnectionId, Player, SharedMode},
        hub::Outbox,
        matcher,
        players::PlayerRegistry,
        pool::EntityPool,
    },
};

/// Coarse lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Accepting joins and waiting for everyone to ready up.
    Lobby,
    /// Turn loop running; the turn always belongs to a connected player.
    Playing(Turn),
    /// No more turns; final scores were published.
    Ended(EndReason),
}

impl SessionPhase {
    fn label(&self) -> &'static str {
        match self {
            SessionPhase::Lobby => "in lobby",
            SessionPhase::Playing(_) => "playing",
            SessionPhase::Ended(_) => "ended",
        }
    }
}

/// Ownership of the active turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Turn {
    /// Player allowed to guess or skip.
    pub player: ConnectionId,
    /// 1-based turn counter, bumped on every rotation.
    pub number: u32,
}

/// Why a game stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The pool is exhausted.
    AllEntitiesGuessed,
    /// The last player left mid-game.
    PlayerLeft,
    /// The turn could not be handed to anyone.
    NoPlayers,
}

impl EndReason {
    /// Wire representation of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::AllEntitiesGuessed => "all entities guessed",
            EndReason::PlayerLeft => "player left",
            EndReason::NoPlayers => "no players left",
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase-level events applied to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// Everyone is ready; the given player opens the game.
    StartGame(Turn),
    /// The turn moves to another player (or stays with a solo player).
    PassTurn(Turn),
    /// The game is over.
    Finish(EndReason),
    /// Discard the current or finished game and go back to the lobby.
    Restart,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the session was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: PhaseEvent,
}

/// Read-only view of a session, published after every processed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Room code of the session.
    pub room: String,
    /// Mode identifier.
    pub mode: String,
    /// Current phase.
    pub phase: SessionPhase,
    /// Number of phase changes so far.
    pub version: usize,
    /// Players in turn order.
    pub players: Vec<Player>,
    /// Entities still to be found.
    pub remaining: usize,
    /// Entities found so far.
    pub guessed: usize,
    /// Seconds left in the current turn.
    pub turn_time_left: u32,
}

/// Server-authoritative state of one multiplayer session.
///
/// Every operation runs to completion before the next one is handled; timer
/// ticks reach the machine through [`SessionStateMachine::clock_tick`] like
/// any other event. Operations that do not apply to the current state return
/// [`SessionError::Ignored`] and leave the state and the outbox untouched.
pub struct SessionStateMachine {
    room: String,
    mode: SharedMode,
    phase: SessionPhase,
    version: usize,
    players: PlayerRegistry,
    pool: EntityPool,
    clock: TurnClock,
    outbox: Arc<dyn Outbox>,
    rng: StdRng,
}

impl SessionStateMachine {
    /// Create a session in the lobby phase.
    ///
    /// Fails with [`SessionError::Config`] when the mode has no entities.
    pub fn new(
        room: impl Into<String>,
        mode: SharedMode,
        outbox: Arc<dyn Outbox>,
        ticker: Box<dyn Ticker>,
    ) -> Result<Self, SessionError> {
        Self::with_rng(room, mode, outbox, ticker, StdRng::from_os_rng())
    }

    /// Same as [`SessionStateMachine::new`] with an explicit shuffle source.
    pub fn with_rng(
        room: impl Into<String>,
        mode: SharedMode,
        outbox: Arc<dyn Outbox>,
        ticker: Box<dyn Ticker>,
        rng: StdRng,
    ) -> Result<Self, SessionError> {
        if mode.entities.is_empty() {
            return Err(SessionError::Config(format!(
                "mode `{}` has no entities",
                mode.id
            )));
        }

        Ok(Self {
            room: room.into(),
            mode,
            phase: SessionPhase::Lobby,
            version: 0,
            players: PlayerRegistry::new(),
            pool: EntityPool::new(),
            clock: TurnClock::new(ticker),
            outbox,
            rng,
        })
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Player holding the turn, if a game is running.
    pub fn current_turn_player(&self) -> Option<ConnectionId> {
        match self.phase {
            SessionPhase::Playing(turn) => Some(turn.player),
            _ => None,
        }
    }

    /// Current turn number, if a game is running.
    pub fn turn_number(&self) -> Option<u32> {
        match self.phase {
            SessionPhase::Playing(turn) => Some(turn.number),
            _ => None,
        }
    }

    /// Connected players.
    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    /// Entities of the current game.
    pub fn pool(&self) -> &EntityPool {
        &self.pool
    }

    /// Generation of the latest turn clock run.
    pub fn clock_generation(&self) -> ClockGeneration {
        self.clock.generation()
    }

    /// Seconds left in the current turn.
    pub fn turn_time_left(&self) -> u32 {
        self.clock.time_left()
    }

    /// Whether the last player left.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Capture the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            room: self.room.clone(),
            mode: self.mode.id.clone(),
            phase: self.phase,
            version: self.version,
            players: self.players.all().cloned().collect(),
            remaining: self.pool.remaining_len(),
            guessed: self.pool.guessed().len(),
            turn_time_left: self.clock.time_left(),
        }
    }

    /// Add a player, welcome them and share the new roster.
    ///
    /// Late joiners are appended to the turn order.
    pub fn join(
        &mut self,
        connection_id: ConnectionId,
        display_name: &str,
    ) -> Result<(), SessionError> {
        let player_name = self.players.add(connection_id, display_name)?.name.clone();
        info!(room = %self.room, connection = %connection_id, player = %player_name, "player joined");

        self.outbox
            .send_to(connection_id, &self.welcome(connection_id));
        self.outbox.broadcast(&ServerMessage::PlayerJoined {
            player_name,
            players: self.roster(),
        });
        Ok(())
    }

    /// Remove a player. Explicit leaves and lost connections are handled alike.
    pub fn leave(&mut self, connection_id: ConnectionId) -> Result<(), SessionError> {
        let (index, player) = self
            .players
            .remove(&connection_id)
            .ok_or(IgnoredEvent::UnknownConnection)?;
        info!(room = %self.room, connection = %connection_id, player = %player.name, "player left");

        self.outbox.broadcast(&ServerMessage::PlayerLeft {
            player_name: player.name,
            players: self.roster(),
        });

        match self.phase {
            SessionPhase::Playing(_) if self.players.is_empty() => {
                self.end_game(EndReason::PlayerLeft)
            }
            SessionPhase::Playing(turn) if turn.player == connection_id => {
                // The follower of the leaver now sits at the leaver's index.
                let next = self
                    .players
                    .get_index(index % self.players.len())
                    .map(|player| player.connection_id)
                    .ok_or(SessionError::InvariantViolation(
                        "no follower for a departing turn holder",
                    ))?;
                self.pass_turn(next, turn.number + 1)
            }
            SessionPhase::Lobby => self.start_if_ready(),
            _ => Ok(()),
        }
    }

    /// Mark a player ready, starting the game once enough players are ready.
    pub fn set_ready(&mut self, connection_id: ConnectionId) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Lobby {
            return Err(IgnoredEvent::WrongPhase(self.phase.label()).into());
        }
        let player = self
            .players
            .get_mut(&connection_id)
            .ok_or(IgnoredEvent::UnknownConnection)?;
        if player.is_ready {
            return Ok(());
        }
        player.is_ready = true;
        let player_name = player.name.clone();
        debug!(room = %self.room, player = %player_name, "player ready");

        self.outbox.broadcast(&ServerMessage::PlayerReady {
            player_name,
            players: self.roster(),
        });
        self.start_if_ready()
    }

    /// Submit an answer for the current entity.
    ///
    /// A correct answer keeps the turn with the guesser; a wrong one rotates it.
    pub fn guess(&mut self, connection_id: ConnectionId, text: &str) -> Result<(), SessionError> {
        let turn = self.turn_held_by(connection_id)?;
        let entity = self
            .pool
            .current()
            .cloned()
            .ok_or(SessionError::InvariantViolation(
                "guess against an exhausted pool",
            ))?;
        let points = self.mode.points_per_correct;
        let player = self
            .players
            .get_mut(&connection_id)
            .ok_or(SessionError::InvariantViolation(
                "turn held by an unknown player",
            ))?;

        if matcher::is_match(text, &entity) {
            player.score = player.score.saturating_add(points);
            player.correct_answers += 1;
            let (player_name, score) = (player.name.clone(), player.score);
            self.pool.mark_current_guessed()?;
            info!(room = %self.room, player = %player_name, entity = %entity.id, score, "correct answer");

            self.outbox.broadcast(&ServerMessage::Correct {
                player_name,
                entity_name: entity.name,
                score,
            });
            self.advance_to_next_entity()
        } else {
            player.total_attempts += 1;
            let player_name = player.name.clone();
            debug!(room = %self.room, player = %player_name, "wrong answer");

            self.outbox.broadcast(&ServerMessage::Wrong {
                player_name,
                guess: text.to_string(),
            });
            self.switch_turn(turn)
        }
    }

    /// Pass the turn without answering; the entity stays current.
    pub fn skip(&mut self, connection_id: ConnectionId) -> Result<(), SessionError> {
        let turn = self.turn_held_by(connection_id)?;
        let player_name = self.player_name(&connection_id);
        debug!(room = %self.room, player = %player_name, "turn skipped");

        self.outbox
            .broadcast(&ServerMessage::Skipped { player_name });
        self.switch_turn(turn)
    }

    /// Discard the current or finished game and return to the lobby with
    /// zeroed scores; the next game starts once players ready up again.
    pub fn restart(&mut self, connection_id: ConnectionId) -> Result<(), SessionError> {
        let requested_by = self
            .players
            .get(&connection_id)
            .map(|player| player.name.clone())
            .ok_or(IgnoredEvent::UnknownConnection)?;
        if self.phase == SessionPhase::Lobby {
            return Err(IgnoredEvent::WrongPhase(self.phase.label()).into());
        }

        self.clock.cancel();
        self.transition(PhaseEvent::Restart)?;
        self.players.reset_for_restart();
        self.pool.clear();
        info!(room = %self.room, player = %requested_by, "game restarted");

        self.outbox.broadcast(&ServerMessage::GameRestarted {
            requested_by,
            players: self.roster(),
        });
        Ok(())
    }

    /// Relay a chat line to everyone, in any phase.
    pub fn chat(&mut self, connection_id: ConnectionId, text: &str) -> Result<(), SessionError> {
        let player_name = self
            .players
            .get(&connection_id)
            .map(|player| player.name.clone())
            .ok_or(IgnoredEvent::UnknownConnection)?;

        self.outbox.broadcast(&ServerMessage::ChatMessage {
            player_name,
            text: text.to_string(),
            timestamp: timestamp_now(),
        });
        Ok(())
    }

    /// Account for one elapsed second of clock run `generation`.
    ///
    /// Ticks from a cancelled or replaced run are ignored; expiry rotates the
    /// turn like a skip.
    pub fn clock_tick(&mut self, generation: ClockGeneration) -> Result<(), SessionError> {
        let SessionPhase::Playing(turn) = self.phase else {
            return Err(IgnoredEvent::StaleTick.into());
        };

        match self.clock.on_tick(generation) {
            None => Err(IgnoredEvent::StaleTick.into()),
            Some(ClockSignal::Tick { remaining }) => {
                self.outbox.broadcast(&ServerMessage::Tick {
                    turn_time_left: remaining,
                });
                Ok(())
            }
            Some(ClockSignal::Expired) => {
                info!(room = %self.room, turn = turn.number, "turn timed out");
                self.outbox
                    .broadcast(&ServerMessage::Tick { turn_time_left: 0 });
                self.switch_turn(turn)
            }
        }
    }

    /// Final standings, best score first; ties keep join order.
    pub fn final_scores(&self) -> Vec<FinalScore> {
        let mut scores: Vec<FinalScore> = self.players.all().map(FinalScore::from).collect();
        scores.sort_by(|a, b| b.score.cmp(&a.score));
        scores
    }

    fn start_if_ready(&mut self) -> Result<(), SessionError> {
        if self.players.len() >= self.mode.min_players && self.players.all_ready() {
            self.start_game()
        } else {
            Ok(())
        }
    }

    fn start_game(&mut self) -> Result<(), SessionError> {
        let (first_player, first_player_name) = self
            .players
            .first()
            .map(|player| (player.connection_id, player.name.clone()))
            .ok_or(SessionError::InvariantViolation(
                "starting a game without players",
            ))?;

        self.pool.initialize(&self.mode.entities, &mut self.rng)?;
        self.transition(PhaseEvent::StartGame(Turn {
            player: first_player,
            number: 1,
        }))?;
        info!(
            room = %self.room,
            mode = %self.mode.id,
            players = self.players.len(),
            entities = self.pool.total(),
            "game started"
        );

        self.outbox.broadcast(&ServerMessage::GameStarted {
            first_player_name,
            total_entities: self.pool.total(),
        });
        self.advance_to_next_entity()
    }

    fn advance_to_next_entity(&mut self) -> Result<(), SessionError> {
        let Some(entity_id) = self.pool.current().map(|entity| entity.id.clone()) else {
            return self.end_game(EndReason::AllEntitiesGuessed);
        };

        self.outbox.broadcast(&ServerMessage::NewEntity {
            entity_id,
            remaining: self.pool.remaining_len(),
        });
        self.clock.cancel();
        self.clock.start(self.mode.turn_duration_secs);
        Ok(())
    }

    fn switch_turn(&mut self, turn: Turn) -> Result<(), SessionError> {
        self.clock.cancel();
        let next = self
            .players
            .next_after(&turn.player)
            .or_else(|| self.players.first())
            .map(|player| player.connection_id);

        match next {
            Some(next) => self.pass_turn(next, turn.number + 1),
            None => self.end_game(EndReason::NoPlayers),
        }
    }

    fn pass_turn(&mut self, next: ConnectionId, number: u32) -> Result<(), SessionError> {
        self.clock.cancel();
        self.transition(PhaseEvent::PassTurn(Turn {
            player: next,
            number,
        }))?;
        let next_player_name = self.player_name(&next);
        debug!(room = %self.room, player = %next_player_name, turn = number, "turn changed");

        self.outbox.broadcast(&ServerMessage::TurnChanged {
            next_player_name,
            turn_number: number,
        });
        self.clock.start(self.mode.turn_duration_secs);
        Ok(())
    }

    fn end_game(&mut self, reason: EndReason) -> Result<(), SessionError> {
        self.clock.cancel();
        self.transition(PhaseEvent::Finish(reason))?;
        info!(room = %self.room, %reason, "game ended");

        self.outbox.broadcast(&ServerMessage::GameEnded {
            reason: reason.to_string(),
            scores: self.final_scores(),
        });
        Ok(())
    }

    fn turn_held_by(&self, connection_id: ConnectionId) -> Result<Turn, SessionError> {
        match self.phase {
            SessionPhase::Playing(turn) if turn.player == connection_id => Ok(turn),
            SessionPhase::Playing(_) => Err(IgnoredEvent::NotYourTurn.into()),
            other => Err(IgnoredEvent::WrongPhase(other.label()).into()),
        }
    }

    fn player_name(&self, connection_id: &ConnectionId) -> String {
        self.players
            .get(connection_id)
            .map(|player| player.name.clone())
            .unwrap_or_default()
    }

    fn roster(&self) -> Vec<PlayerSummary> {
        self.players.all().map(PlayerSummary::from).collect()
    }

    fn welcome(&self, connection_id: ConnectionId) -> ServerMessage {
        let turn = match self.phase {
            SessionPhase::Playing(turn) => Some(turn),
            _ => None,
        };
        ServerMessage::Welcome {
            connection_id,
            room: self.room.clone(),
            mode: self.mode.id.clone(),
            mode_name: self.mode.name.clone(),
            phase: VisibleSessionPhase::from(&self.phase),
            turn_duration_secs: self.mode.turn_duration_secs,
            total_entities: self.mode.entities.len(),
            players: self.roster(),
            current_entity_id: turn
                .and_then(|_| self.pool.current())
                .map(|entity| entity.id.clone()),
            current_player_name: turn.map(|turn| self.player_name(&turn.player)),
            turn_number: turn.map(|turn| turn.number),
        }
    }

    fn transition(&mut self, event: PhaseEvent) -> Result<(), SessionError> {
        self.phase = self.compute_transition(event)?;
        self.version += 1;
        Ok(())
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: PhaseEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (SessionPhase::Lobby, PhaseEvent::StartGame(turn)) => SessionPhase::Playing(turn),
            (SessionPhase::Playing(_), PhaseEvent::PassTurn(turn)) => SessionPhase::Playing(turn),
            (SessionPhase::Playing(_), PhaseEvent::Finish(reason)) => SessionPhase::Ended(reason),
            (SessionPhase::Playing(_) | SessionPhase::Ended(_), PhaseEvent::Restart) => {
                SessionPhase::Lobby
            }
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
