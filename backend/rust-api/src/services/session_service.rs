use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::round_engine::{Cue, FollowUpAction, RoundEngine, Turn};
use crate::errors::SessionError;
use crate::metrics::{GAMES_ACTIVE, GAMES_TOTAL};
use crate::models::category::{Category, GamePhase};
use crate::models::events::{CueSignal, GameCompleted, GameEvent, HostMessage, RoundAdvanced};
use crate::models::game::{GameView, TurnResponse};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// When the store lets go of games nobody is playing any more
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Unfinished games with no activity for this long are dropped
    pub idle_timeout: Duration,
    /// Finished games stay readable for this long after their last event
    pub completed_grace: Duration,
    pub sweep_interval: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30 * 60),
            completed_grace: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub enum PlayerAction {
    /// Free text routed by the current phase
    Input(String),
    Nickname(String),
    Category(Category),
    Answer(String),
}

/// One hosted game: the engine, its event feed and the token that ends its tasks
pub struct GameSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    engine: Mutex<RoundEngine>,
    /// View as of the last finished turn; readable while the engine is busy
    snapshot: watch::Sender<GameView>,
    events: broadcast::Sender<GameEvent>,
    shutdown: CancellationToken,
    started: Instant,
    /// Milliseconds after `started` of the last applied action or advance
    last_active_ms: AtomicU64,
}

impl GameSession {
    fn new(engine: RoundEngine, shutdown: CancellationToken) -> Self {
        let id = Uuid::new_v4();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (snapshot, _) = watch::channel(GameView::new(id, &engine));
        Self {
            id,
            created_at: Utc::now(),
            engine: Mutex::new(engine),
            snapshot,
            events,
            shutdown,
            started: Instant::now(),
            last_active_ms: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    /// Cancelled when the game is removed or the server shuts down
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Never waits on a turn in flight
    pub fn view(&self) -> GameView {
        self.snapshot.borrow().clone()
    }

    /// Time since the last applied action or round advance
    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_active_ms.load(Ordering::Relaxed));
        self.started.elapsed().saturating_sub(last)
    }

    fn touch(&self) {
        let now = self.started.elapsed().as_millis() as u64;
        self.last_active_ms.fetch_max(now, Ordering::Relaxed);
    }

    fn apply(&self, view: GameView) {
        self.snapshot.send_replace(view);
        self.touch();
    }

    fn expired(&self, policy: &RetentionPolicy) -> bool {
        let idle = self.idle_for();
        if self.is_completed() {
            idle >= policy.completed_grace
        } else {
            // A busy engine is being played right now
            idle >= policy.idle_timeout && self.engine.try_lock().is_ok()
        }
    }

    /// Applies one player action. A second action while one is still being
    /// processed is rejected, never queued.
    pub async fn handle(self: &Arc<Self>, action: PlayerAction) -> Result<TurnResponse, SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        let mut engine = self.engine.try_lock().map_err(|_| SessionError::Busy)?;

        let turn = match action {
            PlayerAction::Input(text) => engine.handle_input(&text).await?,
            PlayerAction::Nickname(nickname) => engine.submit_nickname(&nickname)?,
            PlayerAction::Category(category) => engine.select_category(category).await?,
            PlayerAction::Answer(answer) => engine.submit_answer(&answer).await?,
        };
        let view = GameView::new(self.id, &engine);
        self.apply(view.clone());
        drop(engine);

        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        self.dispatch(&turn, &view);
        Ok(TurnResponse::new(turn, view))
    }

    fn dispatch(self: &Arc<Self>, turn: &Turn, view: &GameView) {
        self.publish(GameEvent::HostMessage(HostMessage {
            game_id: self.id.to_string(),
            message: turn.message.clone(),
            phase: view.phase,
            timestamp: Utc::now(),
        }));

        for cue in &turn.cues {
            self.publish(self.cue_event(*cue, true));
            if let Cue::Celebration { duration_ms } = cue {
                self.schedule_cue_end(*cue, Duration::from_millis(*duration_ms));
            }
        }

        if let Some(follow_up) = turn.follow_up {
            match follow_up.action {
                FollowUpAction::AdvanceRound => self.schedule_advance(follow_up.delay),
            }
        }
    }

    fn schedule_cue_end(self: &Arc<Self>, cue: Cue, after: Duration) {
        let session = Arc::clone(self);
        let token = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    session.publish(session.cue_event(cue, false));
                }
            }
        });
    }

    fn schedule_advance(self: &Arc<Self>, delay: Duration) {
        tracing::debug!("Game {}: advancing round in {:?}", self.id, delay);
        let session = Arc::clone(self);
        let token = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("Game {}: pending advance cancelled", session.id);
                }
                _ = tokio::time::sleep(delay) => {
                    session.advance().await;
                }
            }
        });
    }

    async fn advance(&self) {
        let mut engine = self.engine.lock().await;
        if self.is_closed() {
            return;
        }

        let turn = match engine.advance_round() {
            Ok(turn) => turn,
            Err(e) => {
                tracing::warn!("Game {}: scheduled advance skipped: {}", self.id, e);
                return;
            }
        };
        let state = engine.state();
        let (phase, round, score) = (state.phase, state.round, state.score);
        self.apply(GameView::new(self.id, &engine));
        drop(engine);

        self.publish(GameEvent::HostMessage(HostMessage {
            game_id: self.id.to_string(),
            message: turn.message.clone(),
            phase,
            timestamp: Utc::now(),
        }));

        if phase == GamePhase::Completed {
            GAMES_TOTAL.with_label_values(&["completed"]).inc();
            self.publish(GameEvent::GameCompleted(GameCompleted {
                game_id: self.id.to_string(),
                score,
                message: turn.message,
                timestamp: Utc::now(),
            }));
        } else {
            self.publish(GameEvent::RoundAdvanced(RoundAdvanced {
                game_id: self.id.to_string(),
                round,
                score,
                message: turn.message,
                timestamp: Utc::now(),
            }));
        }
    }

    fn cue_event(&self, cue: Cue, started: bool) -> GameEvent {
        let signal = CueSignal {
            game_id: self.id.to_string(),
            cue: cue.name().to_string(),
            timestamp: Utc::now(),
        };
        if started {
            GameEvent::CueStarted(signal)
        } else {
            GameEvent::CueEnded(signal)
        }
    }

    fn publish(&self, event: GameEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub fn is_completed(&self) -> bool {
        self.snapshot.borrow().phase == GamePhase::Completed
    }
}

/// In-memory registry of running games
pub struct GameStore {
    games: RwLock<HashMap<Uuid, Arc<GameSession>>>,
    root: CancellationToken,
    retention: RetentionPolicy,
}

impl Default for GameStore {
    fn default() -> Self {
        Self::new(RetentionPolicy::default())
    }
}

impl GameStore {
    pub fn new(retention: RetentionPolicy) -> Self {
        Self {
            games: RwLock::new(HashMap::new()),
            root: CancellationToken::new(),
            retention,
        }
    }

    /// Sweeps expired games every `sweep_interval` until `shutdown_all`
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        let every = self.retention.sweep_interval.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(Instant::now() + every, every);
            loop {
                tokio::select! {
                    _ = store.root.cancelled() => break,
                    _ = ticks.tick() => {
                        store.sweep().await;
                    }
                }
            }
            tracing::debug!("Game sweeper stopped");
        })
    }

    /// Removes finished games past their grace period and idle unfinished ones
    pub async fn sweep(&self) -> usize {
        let expired: Vec<Uuid> = self
            .games
            .read()
            .await
            .values()
            .filter(|session| session.expired(&self.retention))
            .map(|session| session.id)
            .collect();

        let mut removed = 0;
        for id in expired {
            if self.remove(id).await.is_ok() {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!("Swept {} expired games", removed);
        }
        removed
    }

    pub async fn create(&self, engine: RoundEngine) -> Arc<GameSession> {
        let session = Arc::new(GameSession::new(engine, self.root.child_token()));
        self.games
            .write()
            .await
            .insert(session.id, Arc::clone(&session));

        GAMES_TOTAL.with_label_values(&["created"]).inc();
        GAMES_ACTIVE.inc();
        tracing::info!("Game created: {}", session.id);
        session
    }

    pub async fn get(&self, id: Uuid) -> Result<Arc<GameSession>, SessionError> {
        self.games
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound)
    }

    /// Removes the game and cancels everything it still has scheduled
    pub async fn remove(&self, id: Uuid) -> Result<(), SessionError> {
        let session = self
            .games
            .write()
            .await
            .remove(&id)
            .ok_or(SessionError::NotFound)?;
        session.shutdown.cancel();
        GAMES_ACTIVE.dec();

        if !session.is_completed() {
            GAMES_TOTAL.with_label_values(&["abandoned"]).inc();
        }
        tracing::info!("Game removed: {}", id);
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.games.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.games.read().await.is_empty()
    }

    pub async fn shutdown_all(&self) {
        self.root.cancel();
        let mut games = self.games.write().await;
        let count = games.len();
        games.clear();
        GAMES_ACTIVE.sub(count as i64);
        tracing::info!("Closed {} running games", count);
    }
}
