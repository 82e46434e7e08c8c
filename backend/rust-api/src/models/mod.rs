pub mod answer;
pub mod category;
pub mod conversation;
pub mod events;
pub mod game;
pub mod phrase;

pub use category::{Category, Difficulty, GamePhase, QuestionStage};
pub use game::{GameView, TurnResponse};
