pub mod actor;
pub mod clock;
pub mod game;
pub mod hub;
pub mod matcher;
pub mod players;
pub mod pool;
pub mod state_machine;

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{
    config::AppConfig,
    error::{ServiceError, SessionError},
    state::game::ConnectionId,
};

pub use self::actor::{SessionActor, SessionCommand, SessionHandle, SessionMap};
pub use self::state_machine::Snapshot;

pub type SharedState = Arc<AppState>;

/// Central application state: configuration and the live sessions by room.
pub struct AppState {
    config: Arc<AppConfig>,
    sessions: SessionMap,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig) -> SharedState {
        Arc::new(Self {
            config: Arc::new(config),
            sessions: Arc::new(DashMap::new()),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// Handle of the session running in `room`, if any.
    pub fn session(&self, room: &str) -> Option<SessionHandle> {
        self.sessions
            .get(room)
            .map(|entry| entry.value().clone())
            .filter(|handle| !handle.is_closed())
    }

    /// Rooms and handles of every live session.
    pub fn sessions(&self) -> Vec<(String, SessionHandle)> {
        self.sessions
            .iter()
            .filter(|entry| !entry.value().is_closed())
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|entry| !entry.value().is_closed())
            .count()
    }

    /// Join `room`, opening the session with `mode` if nobody plays there yet.
    ///
    /// Joining an existing session keeps the mode it was opened with.
    pub fn join_session(
        &self,
        room: &str,
        mode: Option<&str>,
        connection_id: ConnectionId,
        display_name: &str,
        tx: mpsc::UnboundedSender<Message>,
    ) -> Result<SessionHandle, ServiceError> {
        let handle = self.open_session(room, mode)?;
        if let Some(requested) = mode.filter(|requested| *requested != handle.mode()) {
            debug!(session = %room, requested, mode = handle.mode(), "room already runs another mode");
        }

        handle.send(SessionCommand::Join {
            connection_id,
            display_name: display_name.to_string(),
            tx,
        })?;
        Ok(handle)
    }

    fn open_session(&self, room: &str, mode: Option<&str>) -> Result<SessionHandle, SessionError> {
        match self.sessions.entry(room.to_string()) {
            Entry::Occupied(entry) if !entry.get().is_closed() => Ok(entry.get().clone()),
            Entry::Occupied(mut entry) => {
                let handle = self.spawn_session(room, mode)?;
                entry.insert(handle.clone());
                Ok(handle)
            }
            Entry::Vacant(entry) => {
                let handle = self.spawn_session(room, mode)?;
                entry.insert(handle.clone());
                Ok(handle)
            }
        }
    }

    fn spawn_session(&self, room: &str, mode: Option<&str>) -> Result<SessionHandle, SessionError> {
        let mode = self.config.mode(mode)?;
        info!(session = %room, mode = %mode.id, "opening session");
        let (actor, handle) = SessionActor::new(room, mode, self.sessions.clone())?;
        tokio::spawn(actor.run());
        Ok(handle)
    }
}
