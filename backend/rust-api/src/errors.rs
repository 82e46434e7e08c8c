//! Error types shared by the engine, the AI client and the session layer.
//!
//! Collaborator failures never escape the engine: they are turned into a
//! retry message on the returned turn. `GameError` covers input the engine
//! refuses outright, `SessionError` adds the concurrency/lifecycle cases of
//! a hosted game.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::category::{Category, GamePhase, UnknownCategory};

/// Which collaborator a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Phrase generation
    Fetch,
    /// Answer grading
    Validation,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Fetch => f.write_str("generation"),
            FailureKind::Validation => f.write_str("validation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("generation failed: {0}")]
    FetchFailure(String),
    #[error("validation failed: {0}")]
    ValidationFailure(String),
    #[error("malformed {kind} response: {detail}")]
    MalformedResponse { kind: FailureKind, detail: String },
}

impl CollaboratorError {
    pub fn kind(&self) -> FailureKind {
        match self {
            CollaboratorError::FetchFailure(_) => FailureKind::Fetch,
            CollaboratorError::ValidationFailure(_) => FailureKind::Validation,
            CollaboratorError::MalformedResponse { kind, .. } => *kind,
        }
    }

    pub fn transport(kind: FailureKind, detail: impl Into<String>) -> Self {
        match kind {
            FailureKind::Fetch => CollaboratorError::FetchFailure(detail.into()),
            FailureKind::Validation => CollaboratorError::ValidationFailure(detail.into()),
        }
    }

    pub fn malformed(kind: FailureKind, detail: impl Into<String>) -> Self {
        CollaboratorError::MalformedResponse {
            kind,
            detail: detail.into(),
        }
    }
}

/// Player input the engine refuses without touching state
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("expected phase {expected:?}, game is in {actual:?}")]
    InvalidPhase {
        expected: GamePhase,
        actual: GamePhase,
    },
    #[error("the game is over")]
    GameCompleted,
    #[error("input must not be empty")]
    EmptyInput,
    #[error("nickname must be at most {max} characters")]
    NicknameTooLong { max: usize },
    #[error(transparent)]
    UnknownCategory(#[from] UnknownCategory),
    #[error("a {0} round is already in progress")]
    RoundInProgress(Category),
    #[error("no round in progress, pick a category first")]
    NoActiveRound,
    #[error("the round is over, the next one starts shortly")]
    RoundConcluding,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("game not found")]
    NotFound,
    #[error("game has been closed")]
    Closed,
    #[error("previous input is still being processed")]
    Busy,
    #[error(transparent)]
    Game(#[from] GameError),
}
