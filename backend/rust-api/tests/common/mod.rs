#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};
use legendary_lines_api::{
    config::Config,
    create_router,
    errors::CollaboratorError,
    models::{
        answer::{AnswerCheck, AnswerType, Verdict},
        category::{Category, Difficulty},
        conversation::ConversationLog,
        phrase::PhraseRecord,
    },
    services::{
        collaborators::{AnswerOracle, PhraseSource},
        round_engine::{GameSettings, GameTimings, RoundEngine},
        scoring::PointTable,
        AppState,
    },
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn phrase(source: &str, year: i32, creator: Option<&str>) -> PhraseRecord {
    PhraseRecord {
        phrase: format!("A line from {}", source),
        source: source.to_string(),
        year,
        creator: creator.map(str::to_string),
        hint: "Think harder".to_string(),
        genre: None,
    }
}

/// Quote worth 1 base point; Song and Movie keep their 1 and 2
pub fn scenario_points() -> PointTable {
    PointTable::default()
        .with(Category::Quote, 1)
        .expect("valid base points")
}

pub fn test_settings() -> GameSettings {
    GameSettings {
        difficulty: Difficulty::Easy,
        number_of_rounds: 2,
        points: scenario_points(),
        timings: GameTimings::immediate(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchCall {
    pub category: Category,
    pub difficulty: Difficulty,
    /// Length of the history passed as context, if any was
    pub context_len: Option<usize>,
}

/// Phrase source answering from a script, then with a default phrase
#[derive(Default)]
pub struct StubPhrases {
    script: Mutex<VecDeque<Result<PhraseRecord, CollaboratorError>>>,
    calls: Mutex<Vec<FetchCall>>,
}

impl StubPhrases {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, result: Result<PhraseRecord, CollaboratorError>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PhraseSource for StubPhrases {
    async fn fetch(
        &self,
        category: Category,
        difficulty: Difficulty,
        context: Option<&ConversationLog>,
    ) -> Result<PhraseRecord, CollaboratorError> {
        self.calls.lock().unwrap().push(FetchCall {
            category,
            difficulty,
            context_len: context.map(ConversationLog::len),
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(phrase("Casablanca", 1942, Some("Michael Curtiz"))))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckCall {
    pub answer_type: AnswerType,
    pub player_answer: String,
    pub correct_answer: String,
    pub history: serde_json::Value,
}

/// Oracle answering from a script; an exhausted script is a validation failure
#[derive(Default)]
pub struct ScriptedOracle {
    script: Mutex<VecDeque<Result<Verdict, CollaboratorError>>>,
    calls: Mutex<Vec<CheckCall>>,
}

impl ScriptedOracle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, result: Result<Verdict, CollaboratorError>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn verdicts(&self, verdicts: impl IntoIterator<Item = Verdict>) {
        for verdict in verdicts {
            self.push(Ok(verdict));
        }
    }

    pub fn calls(&self) -> Vec<CheckCall> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, request: AnswerCheck<'_>) -> Result<Verdict, CollaboratorError> {
        self.calls.lock().unwrap().push(CheckCall {
            answer_type: request.answer_type,
            player_answer: request.player_answer.to_string(),
            correct_answer: request.correct_answer.to_string(),
            history: serde_json::to_value(&request.conversation_history).unwrap(),
        });
        self.script.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(CollaboratorError::ValidationFailure(
                "script exhausted".to_string(),
            ))
        })
    }
}

#[async_trait]
impl AnswerOracle for ScriptedOracle {
    async fn check(&self, request: AnswerCheck<'_>) -> Result<Verdict, CollaboratorError> {
        self.answer(request)
    }
}

/// Oracle that holds every check until the test releases it
pub struct GatedOracle {
    inner: Arc<ScriptedOracle>,
    gate: Semaphore,
    entered: Notify,
}

impl GatedOracle {
    pub fn new(inner: Arc<ScriptedOracle>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            gate: Semaphore::new(0),
            entered: Notify::new(),
        })
    }

    /// Resolves once a check is waiting at the gate
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self, checks: usize) {
        self.gate.add_permits(checks);
    }
}

#[async_trait]
impl AnswerOracle for GatedOracle {
    async fn check(&self, request: AnswerCheck<'_>) -> Result<Verdict, CollaboratorError> {
        self.entered.notify_one();
        let permit = self.gate.acquire().await.unwrap();
        permit.forget();
        self.inner.answer(request)
    }
}

pub fn engine(phrases: Arc<StubPhrases>, oracle: Arc<ScriptedOracle>) -> RoundEngine {
    RoundEngine::new(test_settings(), phrases, oracle)
}

/// Engine already past the greeting
pub fn playing_engine(phrases: Arc<StubPhrases>, oracle: Arc<ScriptedOracle>) -> RoundEngine {
    let mut engine = engine(phrases, oracle);
    engine.submit_nickname("Ada").unwrap();
    engine
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.game.points = scenario_points();
    config.game.number_of_rounds = 2;
    config.game.timings = GameTimings::immediate();
    config.metrics_auth = "metrics:secret".to_string();
    config
}

pub fn create_test_app(
    phrases: Arc<dyn PhraseSource>,
    oracle: Arc<dyn AnswerOracle>,
) -> (Router, Arc<AppState>) {
    init_tracing();

    let state = Arc::new(AppState::with_collaborators(test_config(), phrases, oracle));
    (create_router(state.clone()), state)
}
