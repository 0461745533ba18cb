use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::ValidationError;

use crate::dto::{
    common::{FinalScore, PlayerSummary},
    phase::VisibleSessionPhase,
    validation::{
        MAX_CHAT_LEN, MAX_GUESS_LEN, validate_display_name, validate_room_code,
        validate_text_length,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
/// Messages accepted from player WebSocket clients.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Must be the first message of a connection.
    Join {
        display_name: String,
        room: String,
        #[serde(default)]
        mode: Option<String>,
    },
    Ready,
    Guess {
        text: String,
    },
    Skip,
    Restart,
    Chat {
        text: String,
    },
    #[serde(other)]
    Unknown,
}

/// Reasons an inbound frame is rejected before reaching the session.
#[derive(Debug, Error)]
pub enum ClientMessageError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid {field}: {source}")]
    Invalid {
        field: &'static str,
        source: ValidationError,
    },
}

impl ClientMessage {
    /// Parse a text frame and validate its payload.
    pub fn from_json_str(text: &str) -> Result<Self, ClientMessageError> {
        let message: Self = serde_json::from_str(text)?;
        message.validate()?;
        Ok(message)
    }

    fn validate(&self) -> Result<(), ClientMessageError> {
        match self {
            Self::Join {
                display_name, room, ..
            } => {
                validate_display_name(display_name).map_err(invalid("display_name"))?;
                validate_room_code(room).map_err(invalid("room"))
            }
            Self::Guess { text } => {
                validate_text_length(text, MAX_GUESS_LEN).map_err(invalid("guess"))
            }
            Self::Chat { text } => validate_text_length(text, MAX_CHAT_LEN).map_err(invalid("chat")),
            Self::Ready | Self::Skip | Self::Restart | Self::Unknown => Ok(()),
        }
    }
}

fn invalid(field: &'static str) -> impl FnOnce(ValidationError) -> ClientMessageError {
    move |source| ClientMessageError::Invalid { field, source }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
/// Messages pushed to player WebSocket clients.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent to a joiner only, with enough state to render the session.
    Welcome {
        connection_id: Uuid,
        room: String,
        mode: String,
        mode_name: String,
        phase: VisibleSessionPhase,
        turn_duration_secs: u32,
        total_entities: usize,
        players: Vec<PlayerSummary>,
        current_entity_id: Option<String>,
        current_player_name: Option<String>,
        turn_number: Option<u32>,
    },
    PlayerJoined {
        player_name: String,
        players: Vec<PlayerSummary>,
    },
    PlayerLeft {
        player_name: String,
        players: Vec<PlayerSummary>,
    },
    PlayerReady {
        player_name: String,
        players: Vec<PlayerSummary>,
    },
    GameStarted {
        first_player_name: String,
        total_entities: usize,
    },
    /// Only the identifier is sent; the name is the answer.
    NewEntity {
        entity_id: String,
        remaining: usize,
    },
    TurnChanged {
        next_player_name: String,
        turn_number: u32,
    },
    Tick {
        turn_time_left: u32,
    },
    Correct {
        player_name: String,
        entity_name: String,
        score: u32,
    },
    Wrong {
        player_name: String,
        guess: String,
    },
    Skipped {
        player_name: String,
    },
    GameEnded {
        reason: String,
        scores: Vec<FinalScore>,
    },
    GameRestarted {
        requested_by: String,
        players: Vec<PlayerSummary>,
    },
    ChatMessage {
        player_name: String,
        text: String,
        timestamp: String,
    },
    /// Request could not be served (unknown mode, invalid join).
    Error {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_join() {
        let message = ClientMessage::from_json_str(
            r#"{"type":"join","display_name":"Alice","room":"lobby-1","mode":"countries"}"#,
        )
        .unwrap();
        assert_eq!(
            message,
            ClientMessage::Join {
                display_name: "Alice".into(),
                room: "lobby-1".into(),
                mode: Some("countries".into()),
            }
        );
    }

    #[test]
    fn join_mode_is_optional() {
        let message =
            ClientMessage::from_json_str(r#"{"type":"join","display_name":"Bob","room":"r"}"#)
                .unwrap();
        assert!(matches!(message, ClientMessage::Join { mode: None, .. }));
    }

    #[test]
    fn unknown_type_is_tolerated() {
        let message = ClientMessage::from_json_str(r#"{"type":"dance"}"#).unwrap();
        assert_eq!(message, ClientMessage::Unknown);
    }

    #[test]
    fn rejects_invalid_payloads() {
        assert!(matches!(
            ClientMessage::from_json_str(r#"{"type":"join","display_name":"","room":"r"}"#),
            Err(ClientMessageError::Invalid {
                field: "display_name",
                ..
            })
        ));
        assert!(matches!(
            ClientMessage::from_json_str(r#"{"type":"join","display_name":"a","room":"no way"}"#),
            Err(ClientMessageError::Invalid { field: "room", .. })
        ));
        let long_guess = format!(r#"{{"type":"guess","text":"{}"}}"#, "x".repeat(101));
        assert!(matches!(
            ClientMessage::from_json_str(&long_guess),
            Err(ClientMessageError::Invalid { field: "guess", .. })
        ));
        assert!(matches!(
            ClientMessage::from_json_str("not json"),
            Err(ClientMessageError::Malformed(_))
        ));
    }

    #[test]
    fn server_messages_are_tagged_in_snake_case() {
        let json = serde_json::to_value(ServerMessage::TurnChanged {
            next_player_name: "Bob".into(),
            turn_number: 2,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "turn_changed", "next_player_name": "Bob", "turn_number": 2})
        );

        let json = serde_json::to_value(ServerMessage::NewEntity {
            entity_id: "FRA".into(),
            remaining: 3,
        })
        .unwrap();
        assert_eq!(json["type"], "new_entity");
        assert!(json.get("entity_name").is_none());
    }
}
