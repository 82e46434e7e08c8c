use std::sync::Arc;

use crate::config::Config;
use ai_client::AiClient;
use collaborators::{AnswerOracle, PhraseSource};
use round_engine::{GameSettings, RoundEngine};
use session_service::{GameSession, GameStore};

pub struct AppState {
    pub config: Config,
    pub games: Arc<GameStore>,
    pub phrases: Arc<dyn PhraseSource>,
    pub oracle: Arc<dyn AnswerOracle>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let client = Arc::new(AiClient::new(
            &config.ai.endpoint,
            config.ai.timeout(),
            config.ai.retry(),
        )?);
        tracing::info!("AI backend configured at {}", client.endpoint());

        Ok(Self::with_collaborators(config, client.clone(), client))
    }

    /// State over arbitrary collaborators, e.g. scripted ones in tests
    pub fn with_collaborators(
        config: Config,
        phrases: Arc<dyn PhraseSource>,
        oracle: Arc<dyn AnswerOracle>,
    ) -> Self {
        let games = Arc::new(GameStore::new(config.game.retention));
        if tokio::runtime::Handle::try_current().is_ok() {
            games.spawn_sweeper();
        } else {
            tracing::warn!("No async runtime, expired games will not be swept");
        }

        Self {
            config,
            games,
            phrases,
            oracle,
        }
    }

    pub async fn start_game(&self, settings: GameSettings) -> Arc<GameSession> {
        let engine = RoundEngine::new(settings, self.phrases.clone(), self.oracle.clone());
        self.games.create(engine).await
    }
}

pub mod ai_client;
pub mod collaborators;
pub mod round_engine;
pub mod scoring;
pub mod session_service;
