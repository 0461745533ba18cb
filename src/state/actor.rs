//! Tokio task owning one session state machine.

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{self, Duration, Instant},
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::ServerMessage,
    error::{ServiceError, SessionError},
    state::{
        clock::{ClockGeneration, Ticker},
        game::{ConnectionId, SharedMode},
        hub::{ConnectionHub, Outbox},
        state_machine::{SessionStateMachine, Snapshot},
    },
};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Live sessions keyed by room code.
pub type SessionMap = Arc<DashMap<String, SessionHandle>>;

/// Events processed by a session actor, one at a time.
#[derive(Debug)]
pub enum SessionCommand {
    /// Attach a socket and add its player.
    Join {
        /// Connection identity.
        connection_id: ConnectionId,
        /// Validated display name.
        display_name: String,
        /// Writer channel of the socket.
        tx: mpsc::UnboundedSender<Message>,
    },
    /// Explicit leave or lost connection.
    Leave {
        /// Connection identity.
        connection_id: ConnectionId,
    },
    /// Ready up in the lobby.
    Ready {
        /// Connection identity.
        connection_id: ConnectionId,
    },
    /// Answer attempt.
    Guess {
        /// Connection identity.
        connection_id: ConnectionId,
        /// Raw answer.
        text: String,
    },
    /// Pass the turn.
    Skip {
        /// Connection identity.
        connection_id: ConnectionId,
    },
    /// Back to the lobby with zeroed scores.
    Restart {
        /// Connection identity.
        connection_id: ConnectionId,
    },
    /// Chat line.
    Chat {
        /// Connection identity.
        connection_id: ConnectionId,
        /// Message body.
        text: String,
    },
    /// One elapsed second of the given turn clock run.
    ClockTick(ClockGeneration),
}

/// Cloneable handle used to reach a session actor.
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    mode: String,
    commands: mpsc::UnboundedSender<SessionCommand>,
    snapshot: watch::Receiver<Snapshot>,
}

impl SessionHandle {
    /// Identity of the actor behind this handle.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Mode the session was opened with.
    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Queue a command for the actor.
    pub fn send(&self, command: SessionCommand) -> Result<(), ServiceError> {
        self.commands
            .send(command)
            .map_err(|_| ServiceError::SessionClosed)
    }

    /// Latest state published by the actor.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    /// Whether the actor stopped accepting commands.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// [`Ticker`] feeding one `ClockTick` per second into the actor inbox.
///
/// Holds a weak sender so pending ticks never keep a finished actor alive.
pub struct IntervalTicker {
    inbox: mpsc::WeakUnboundedSender<SessionCommand>,
    task: Option<JoinHandle<()>>,
}

impl IntervalTicker {
    /// Ticker delivering into `inbox`.
    pub fn new(inbox: &mpsc::UnboundedSender<SessionCommand>) -> Self {
        Self {
            inbox: inbox.downgrade(),
            task: None,
        }
    }
}

impl Ticker for IntervalTicker {
    fn start(&mut self, generation: ClockGeneration) {
        self.stop();
        let inbox = self.inbox.clone();
        self.task = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            loop {
                interval.tick().await;
                let Some(inbox) = inbox.upgrade() else {
                    break;
                };
                if inbox.send(SessionCommand::ClockTick(generation)).is_err() {
                    break;
                }
            }
        }));
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for IntervalTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Owner of a [`SessionStateMachine`], fed by a [`SessionHandle`].
pub struct SessionActor {
    id: Uuid,
    room: String,
    machine: SessionStateMachine,
    hub: Arc<ConnectionHub>,
    inbox: mpsc::UnboundedReceiver<SessionCommand>,
    snapshot: watch::Sender<Snapshot>,
    sessions: SessionMap,
}

impl SessionActor {
    /// Build an actor for `room` together with its handle.
    ///
    /// The actor removes its own entry from `sessions` once its last player
    /// leaves.
    pub fn new(
        room: impl Into<String>,
        mode: SharedMode,
        sessions: SessionMap,
    ) -> Result<(Self, SessionHandle), SessionError> {
        let room = room.into();
        let (commands, inbox) = mpsc::unbounded_channel();
        let hub = Arc::new(ConnectionHub::new());
        let outbox: Arc<dyn Outbox> = hub.clone();
        let mode_id = mode.id.clone();

        let machine = SessionStateMachine::new(
            room.clone(),
            mode,
            outbox,
            Box::new(IntervalTicker::new(&commands)),
        )?;
        let (snapshot, snapshot_rx) = watch::channel(machine.snapshot());
        let id = Uuid::new_v4();

        let actor = Self {
            id,
            room,
            machine,
            hub,
            inbox,
            snapshot,
            sessions,
        };
        let handle = SessionHandle {
            id,
            mode: mode_id,
            commands,
            snapshot: snapshot_rx,
        };
        Ok((actor, handle))
    }

    /// Process commands until the last player leaves.
    pub async fn run(mut self) {
        info!(session = %self.room, id = %self.id, "session opened");

        while let Some(command) = self.inbox.recv().await {
            let outcome = self.handle(command);
            self.report(outcome);
            self.snapshot.send_replace(self.machine.snapshot());

            if self.machine.is_empty() {
                break;
            }
        }

        let id = self.id;
        self.sessions.remove_if(&self.room, |_, handle| handle.id() == id);
        self.inbox.close();
        // Joins that raced the shutdown are turned away so the client can retry.
        while let Some(command) = self.inbox.recv().await {
            if let SessionCommand::Join { tx, .. } = command {
                reject_join(&tx);
            }
        }
        if !self.hub.is_empty() {
            warn!(
                session = %self.room,
                connections = self.hub.len(),
                "session closed with attached sockets"
            );
        }
        info!(session = %self.room, id = %self.id, "session closed");
    }

    fn handle(&mut self, command: SessionCommand) -> Result<(), SessionError> {
        match command {
            SessionCommand::Join {
                connection_id,
                display_name,
                tx,
            } => {
                self.hub.register(connection_id, tx);
                self.machine.join(connection_id, &display_name)
            }
            SessionCommand::Leave { connection_id } => {
                self.hub.unregister(&connection_id);
                self.machine.leave(connection_id)
            }
            SessionCommand::Ready { connection_id } => self.machine.set_ready(connection_id),
            SessionCommand::Guess {
                connection_id,
                text,
            } => self.machine.guess(connection_id, &text),
            SessionCommand::Skip { connection_id } => self.machine.skip(connection_id),
            SessionCommand::Restart { connection_id } => self.machine.restart(connection_id),
            SessionCommand::Chat {
                connection_id,
                text,
            } => self.machine.chat(connection_id, &text),
            SessionCommand::ClockTick(generation) => self.machine.clock_tick(generation),
        }
    }

    fn report(&self, outcome: Result<(), SessionError>) {
        match outcome {
            Ok(()) => {}
            Err(SessionError::Ignored(reason)) => {
                debug!(session = %self.room, %reason, "event ignored");
            }
            Err(err @ (SessionError::InvariantViolation(_) | SessionError::InvalidTransition(_))) => {
                error!(session = %self.room, error = %err, "session invariant violated");
            }
            Err(err) => {
                warn!(session = %self.room, error = %err, "session command failed");
            }
        }
    }
}

fn reject_join(tx: &mpsc::UnboundedSender<Message>) {
    let message = ServerMessage::Error {
        message: "session closed, please join again".into(),
    };
    if let Ok(payload) = serde_json::to_string(&message) {
        let _ = tx.send(Message::Text(payload.into()));
    }
    let _ = tx.send(Message::Close(None));
}
