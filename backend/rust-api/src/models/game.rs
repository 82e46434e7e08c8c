use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::category::{Category, Difficulty, GamePhase, QuestionStage};
use crate::errors::FailureKind;
use crate::services::round_engine::{Cue, RoundEngine, Turn};

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateGameRequest {
    pub difficulty: Option<Difficulty>,
    #[validate(range(min = 1, max = 50))]
    pub number_of_rounds: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PlayerInputRequest {
    #[validate(length(min = 1, max = 500))]
    pub text: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NicknameRequest {
    #[validate(length(min = 1, max = 40))]
    pub nickname: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub category: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnswerRequest {
    #[validate(length(min = 1, max = 500))]
    pub answer: String,
}

/// Public snapshot of a game. Never carries the hidden answers of a round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameView {
    pub game_id: String,
    pub nickname: Option<String>,
    pub phase: GamePhase,
    pub round: u32,
    pub number_of_rounds: u32,
    pub score: u32,
    pub streak: u32,
    pub difficulty: Difficulty,
    pub category: Option<Category>,
    pub stage: Option<QuestionStage>,
    pub awaiting_bonus: bool,
    pub round_points: u32,
    pub max_round_points: Option<u32>,
    pub round_complete: bool,
    pub phrase: Option<String>,
    pub message: String,
    pub prompt: String,
    pub history_len: usize,
}

impl GameView {
    pub fn new(game_id: Uuid, engine: &RoundEngine) -> Self {
        let state = engine.state();
        let round = state.current.as_ref();

        Self {
            game_id: game_id.to_string(),
            nickname: state.nickname.clone(),
            phase: state.phase,
            round: state.round,
            number_of_rounds: engine.settings().number_of_rounds,
            score: state.score,
            streak: state.streak,
            difficulty: engine.settings().difficulty,
            category: round.map(|r| r.category),
            stage: round.map(|r| r.stage),
            awaiting_bonus: round.is_some_and(|r| r.awaiting_bonus),
            round_points: state.round_points(),
            max_round_points: engine.max_round_points(),
            round_complete: round.is_some_and(|r| r.concluded),
            phrase: round.map(|r| r.phrase.phrase.clone()),
            message: engine.message().to_string(),
            prompt: engine.prompt(),
            history_len: state.log.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    pub message: String,
    pub prompt: String,
    pub cues: Vec<Cue>,
    pub failure: Option<FailureKind>,
    /// Milliseconds until the round advances on its own
    pub follow_up_ms: Option<u64>,
    pub game: GameView,
}

impl TurnResponse {
    pub fn new(turn: Turn, game: GameView) -> Self {
        Self {
            message: turn.message,
            prompt: game.prompt.clone(),
            cues: turn.cues,
            failure: turn.failure,
            follow_up_ms: turn.follow_up.map(|f| f.delay.as_millis() as u64),
            game,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateGameResponse {
    pub game_id: String,
    pub message: String,
    pub prompt: String,
    pub game: GameView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub key: Category,
    pub name: String,
    pub points: u32,
    pub max_points: u32,
    pub creator_label: Option<String>,
}
