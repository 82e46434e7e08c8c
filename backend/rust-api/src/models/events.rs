use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::category::GamePhase;

/// Pushed to every SSE subscriber of a game
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GameEvent {
    HostMessage(HostMessage),
    CueStarted(CueSignal),
    CueEnded(CueSignal),
    RoundAdvanced(RoundAdvanced),
    GameCompleted(GameCompleted),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HostMessage {
    pub game_id: String,
    pub message: String,
    pub phase: GamePhase,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CueSignal {
    pub game_id: String,
    pub cue: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RoundAdvanced {
    pub game_id: String,
    pub round: u32,
    pub score: u32,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GameCompleted {
    pub game_id: String,
    pub score: u32,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl GameEvent {
    pub fn to_sse_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            GameEvent::HostMessage(_) => "host-message",
            GameEvent::CueStarted(_) => "cue-started",
            GameEvent::CueEnded(_) => "cue-ended",
            GameEvent::RoundAdvanced(_) => "round-advanced",
            GameEvent::GameCompleted(_) => "game-completed",
        }
    }
}
