use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::collaborators::{AnswerOracle, PhraseSource};
use super::scoring::PointTable;
use crate::errors::{CollaboratorError, FailureKind, GameError};
use crate::metrics::{ANSWERS_SUBMITTED_TOTAL, BONUS_DECISIONS_TOTAL, CELEBRATIONS_TOTAL};
use crate::models::answer::{AnswerCheck, AnswerType, BonusDecision, Verdict};
use crate::models::category::{Category, Difficulty, GamePhase, QuestionStage};
use crate::models::conversation::{ContextItem, ConversationEntry, ConversationLog};
use crate::models::phrase::PhraseRecord;

const GREETING: &str = "👋 Hello, brilliant player! Welcome to 🎮 Legendary Lines Game !\n\
    Ready to test your memory and wit? Let's dive into a world of words and wonders!\n\
    🎭 Choose an epic alias for your adventure!";
const FETCH_RETRY_MESSAGE: &str = "😅 Oops! Had trouble fetching a phrase. Try another category!";
const VALIDATION_RETRY_MESSAGE: &str =
    "Sorry, there was an error checking your answer. Please try again.";

pub const MAX_NICKNAME_CHARS: usize = 40;

// Final score per round that earns the legend message
const LEGENDARY_ROUND_SCORE: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameTimings {
    pub bonus_decline: Duration,
    pub round_exhausted: Duration,
    pub incorrect_answer: Duration,
    pub celebration: Duration,
}

impl Default for GameTimings {
    fn default() -> Self {
        Self {
            bonus_decline: Duration::from_millis(2000),
            round_exhausted: Duration::from_millis(6000),
            incorrect_answer: Duration::from_millis(5000),
            celebration: Duration::from_millis(5000),
        }
    }
}

impl GameTimings {
    pub fn immediate() -> Self {
        Self {
            bonus_decline: Duration::ZERO,
            round_exhausted: Duration::ZERO,
            incorrect_answer: Duration::ZERO,
            celebration: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameSettings {
    pub difficulty: Difficulty,
    pub number_of_rounds: u32,
    pub points: PointTable,
    pub timings: GameTimings,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            number_of_rounds: 5,
            points: PointTable::default(),
            timings: GameTimings::default(),
        }
    }
}

/// Side effect for the presentation layer; the engine never plays it itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Cue {
    PhraseReveal,
    Incorrect,
    Celebration { duration_ms: u64 },
}

impl Cue {
    pub fn name(&self) -> &'static str {
        match self {
            Cue::PhraseReveal => "phrase-reveal",
            Cue::Incorrect => "incorrect",
            Cue::Celebration { .. } => "celebration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUpAction {
    AdvanceRound,
}

/// Action the caller must run after `delay` unless the session ends first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowUp {
    pub action: FollowUpAction,
    pub delay: Duration,
}

/// Result of one engine operation
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub message: String,
    pub cues: Vec<Cue>,
    pub follow_up: Option<FollowUp>,
    /// Set when a collaborator call failed and state was left as it was
    pub failure: Option<FailureKind>,
}

impl Turn {
    fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cues: Vec::new(),
            follow_up: None,
            failure: None,
        }
    }

    fn with_cue(mut self, cue: Cue) -> Self {
        self.cues.push(cue);
        self
    }

    fn then_advance(mut self, delay: Duration) -> Self {
        self.follow_up = Some(FollowUp {
            action: FollowUpAction::AdvanceRound,
            delay,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundState {
    pub category: Category,
    pub phrase: PhraseRecord,
    pub stage: QuestionStage,
    pub points: u32,
    pub awaiting_bonus: bool,
    /// Round is over and waits for its advance follow-up
    pub concluded: bool,
}

impl RoundState {
    fn new(category: Category, phrase: PhraseRecord) -> Self {
        Self {
            category,
            phrase,
            stage: QuestionStage::Source,
            points: 0,
            awaiting_bonus: false,
            concluded: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub nickname: Option<String>,
    pub phase: GamePhase,
    /// 1-based
    pub round: u32,
    /// Score committed at the start of the current round
    pub previous_score: u32,
    /// Displayed score: previous_score plus the current round's points
    pub score: u32,
    pub streak: u32,
    pub current: Option<RoundState>,
    pub log: ConversationLog,
}

impl GameState {
    fn new() -> Self {
        Self {
            nickname: None,
            phase: GamePhase::Greeting,
            round: 1,
            previous_score: 0,
            score: 0,
            streak: 0,
            current: None,
            log: ConversationLog::new(),
        }
    }

    pub fn round_points(&self) -> u32 {
        self.current.as_ref().map_or(0, |round| round.points)
    }
}

/// Drives one game: phases, question stages, bonus offers and scoring.
///
/// Every operation takes `&mut self` for the whole collaborator round-trip,
/// so a session can never interleave two inputs. When a collaborator fails
/// the state is left exactly as it was before the call.
pub struct RoundEngine {
    settings: GameSettings,
    state: GameState,
    message: String,
    phrases: Arc<dyn PhraseSource>,
    oracle: Arc<dyn AnswerOracle>,
}

impl RoundEngine {
    pub fn new(
        settings: GameSettings,
        phrases: Arc<dyn PhraseSource>,
        oracle: Arc<dyn AnswerOracle>,
    ) -> Self {
        Self {
            settings,
            state: GameState::new(),
            message: GREETING.to_string(),
            phrases,
            oracle,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    /// Latest host message
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn max_round_points(&self) -> Option<u32> {
        self.state
            .current
            .as_ref()
            .map(|round| self.settings.points.max_points(round.category))
    }

    /// Placeholder for the player's next input
    pub fn prompt(&self) -> String {
        match self.state.phase {
            GamePhase::Greeting => "Enter your nickname...".to_string(),
            GamePhase::Completed => "Thanks for playing!".to_string(),
            GamePhase::Playing => match &self.state.current {
                None => "Pick a category...".to_string(),
                Some(round) if round.concluded => "Get ready for the next round...".to_string(),
                Some(round) if round.awaiting_bonus => "Yes or No...".to_string(),
                Some(round) => stage_prompt(round.category, round.stage),
            },
        }
    }

    /// Routes free text to the operation the current phase expects
    pub async fn handle_input(&mut self, text: &str) -> Result<Turn, GameError> {
        match self.state.phase {
            GamePhase::Greeting => self.submit_nickname(text),
            GamePhase::Playing if self.state.current.is_none() => {
                let category: Category = non_empty(text)?.parse()?;
                self.select_category(category).await
            }
            GamePhase::Playing => self.submit_answer(text).await,
            GamePhase::Completed => Err(GameError::GameCompleted),
        }
    }

    pub fn submit_nickname(&mut self, text: &str) -> Result<Turn, GameError> {
        if self.state.phase != GamePhase::Greeting {
            return Err(GameError::InvalidPhase {
                expected: GamePhase::Greeting,
                actual: self.state.phase,
            });
        }
        let nickname = non_empty(text)?;
        if nickname.chars().count() > MAX_NICKNAME_CHARS {
            return Err(GameError::NicknameTooLong {
                max: MAX_NICKNAME_CHARS,
            });
        }
        let nickname = nickname.to_string();

        tracing::info!("Player joined as {}", nickname);
        let message = format!(
            "{}! Love that name! 🎯\nAlright hotshot, pick your poison - which category are you brave enough to tackle first? 💪",
            nickname
        );
        self.state.nickname = Some(nickname);
        self.state.phase = GamePhase::Playing;

        Ok(self.emit(Turn::message(message)))
    }

    pub async fn select_category(&mut self, category: Category) -> Result<Turn, GameError> {
        self.require_playing()?;
        if let Some(round) = &self.state.current {
            return Err(GameError::RoundInProgress(round.category));
        }

        let context = self
            .state
            .log
            .mentions(category)
            .then_some(&self.state.log);
        let result = self
            .phrases
            .fetch(category, self.settings.difficulty, context)
            .await;

        let phrase = match result {
            Ok(phrase) => phrase,
            Err(e) => return Ok(self.retry(e, FETCH_RETRY_MESSAGE)),
        };

        tracing::info!(
            "Round {} started: category={}, difficulty={}",
            self.state.round,
            category,
            self.settings.difficulty.as_str()
        );
        let message = format!(
            "🎭 Here's your {} phrase:\n\n\"{}\"\n\n🤔 Can you tell me the source?",
            category.display_name().to_lowercase(),
            phrase.phrase
        );
        self.state.current = Some(RoundState::new(category, phrase));

        Ok(self.emit(Turn::message(message).with_cue(Cue::PhraseReveal)))
    }

    pub async fn submit_answer(&mut self, text: &str) -> Result<Turn, GameError> {
        self.require_playing()?;
        let reply = non_empty(text)?;
        let round = self.state.current.as_ref().ok_or(GameError::NoActiveRound)?;
        if round.concluded {
            return Err(GameError::RoundConcluding);
        }

        if round.awaiting_bonus {
            self.resolve_bonus_reply(reply).await
        } else {
            self.resolve_answer(reply).await
        }
    }

    /// Ends the current round and opens the next one, or finishes the game
    pub fn advance_round(&mut self) -> Result<Turn, GameError> {
        self.require_playing()?;
        let nickname = self.state.nickname.clone().unwrap_or_default();

        self.state.previous_score = self.state.score;
        self.state.current = None;

        let message = if self.state.round < self.settings.number_of_rounds {
            self.state.round += 1;
            tracing::info!(
                "Advancing to round {}/{} with score {}",
                self.state.round,
                self.settings.number_of_rounds,
                self.state.score
            );
            format!(
                "Alright {}, you're on a roll! 🎲\nTime to conquer round {}! Which category's calling your name? 🌟",
                nickname, self.state.round
            )
        } else {
            self.state.phase = GamePhase::Completed;
            let score = self.state.score;
            tracing::info!("Game completed with score {}", score);
            if score == self.settings.number_of_rounds * LEGENDARY_ROUND_SCORE {
                format!("🏆 ABSOLUTELY INCREDIBLE! {} POINTS?! You're not just a player, you're a LEGEND! Take a bow, champion! 🎉", score)
            } else {
                format!("Game over, superstar! {} points - not too shabby! 🌟 Come back and show me what else you've got! 💪", score)
            }
        };

        Ok(self.emit(Turn::message(message)))
    }

    async fn resolve_bonus_reply(&mut self, reply: &str) -> Result<Turn, GameError> {
        let (category, stage) = self.round_at_stake()?;

        let mut history = self.state.log.context();
        history.push(ContextItem::bonus_question(stage, reply));
        let check = AnswerCheck {
            player_answer: reply,
            correct_answer: "yes",
            answer_type: AnswerType::BonusConfirmation,
            conversation_history: history,
        };
        let result = self.oracle.check(check).await;
        let verdict = match result {
            Ok(verdict) => verdict,
            Err(e) => return Ok(self.retry(e, VALIDATION_RETRY_MESSAGE)),
        };

        let decision = BonusDecision::from_verdict(&verdict);
        BONUS_DECISIONS_TOTAL
            .with_label_values(&[stage.as_str(), decision.as_str()])
            .inc();
        self.record(&verdict)?;

        let round = self.state.current.as_mut().ok_or(GameError::NoActiveRound)?;
        let turn = match decision {
            BonusDecision::Accepted => {
                round.awaiting_bonus = false;
                Turn::message(stage_prompt(category, stage))
            }
            BonusDecision::Declined => {
                round.concluded = true;
                tracing::info!(
                    "Bonus declined at {}, keeping {} points",
                    stage,
                    round.points
                );
                Turn::message(format!(
                    "Alright! You keep your {} points for this round. 🎯",
                    round.points
                ))
                .then_advance(self.settings.timings.bonus_decline)
            }
            BonusDecision::Unrecognized => {
                tracing::debug!("Bonus reply {:?} was not read as yes/no", reply);
                Turn::message(format!(
                    "Just so I'm sure - do you want to try the {} for {} points? (Yes/No) 🤔",
                    stage_noun(category, stage),
                    bonus_label(stage)
                ))
            }
        };

        Ok(self.emit(turn))
    }

    async fn resolve_answer(&mut self, answer: &str) -> Result<Turn, GameError> {
        let (category, stage) = self.round_at_stake()?;
        let correct_answer = self
            .state
            .current
            .as_ref()
            .map(|round| round.phrase.answer_for(stage))
            .ok_or(GameError::NoActiveRound)?;

        let check = AnswerCheck {
            player_answer: answer,
            correct_answer: &correct_answer,
            answer_type: stage.into(),
            conversation_history: self.state.log.context(),
        };
        let result = self.oracle.check(check).await;
        let verdict = match result {
            Ok(verdict) => verdict,
            Err(e) => return Ok(self.retry(e, VALIDATION_RETRY_MESSAGE)),
        };

        ANSWERS_SUBMITTED_TOTAL
            .with_label_values(&[stage.as_str(), if verdict.is_correct { "true" } else { "false" }])
            .inc();
        self.record(&verdict)?;

        let max_points = self.settings.points.max_points(category);
        let timings = self.settings.timings;
        let state = &mut self.state;
        let round = state.current.as_mut().ok_or(GameError::NoActiveRound)?;
        let mut turn = Turn::message(verdict.feedback.clone());

        if verdict.is_correct {
            round.points += self.settings.points.points(category, stage);
            state.score = state.previous_score + round.points;
            state.streak += 1;

            match stage.next_for(category) {
                Some(next) => {
                    round.stage = next;
                    round.awaiting_bonus = true;
                }
                None => {
                    round.concluded = true;
                    if round.points == max_points {
                        CELEBRATIONS_TOTAL.inc();
                        turn = turn.with_cue(Cue::Celebration {
                            duration_ms: timings.celebration.as_millis() as u64,
                        });
                    }
                    turn = turn.then_advance(timings.round_exhausted);
                }
            }

            tracing::info!(
                "Correct {} answer: round_points={}, score={}, streak={}",
                stage,
                round.points,
                state.score,
                state.streak
            );
        } else {
            tracing::info!(
                "Incorrect {} answer, forfeiting {} round points",
                stage,
                round.points
            );
            round.points = 0;
            round.concluded = true;
            state.score = state.previous_score;
            state.streak = 0;
            turn = turn
                .with_cue(Cue::Incorrect)
                .then_advance(timings.incorrect_answer);
        }

        Ok(self.emit(turn))
    }

    fn round_at_stake(&self) -> Result<(Category, QuestionStage), GameError> {
        self.state
            .current
            .as_ref()
            .map(|round| (round.category, round.stage))
            .ok_or(GameError::NoActiveRound)
    }

    /// The one place history grows; called once per resolved verdict, before
    /// the verdict is applied
    fn record(&mut self, verdict: &Verdict) -> Result<(), GameError> {
        let round = self.state.current.as_ref().ok_or(GameError::NoActiveRound)?;
        let entry = ConversationEntry {
            round: self.state.round,
            category: round.category,
            question_type: round.stage,
            was_correct: verdict.is_correct,
            feedback: verdict.feedback.clone(),
            is_awaiting_bonus: round.awaiting_bonus,
            timestamp: Utc::now(),
        };
        self.state.log.append(entry);
        Ok(())
    }

    fn require_playing(&self) -> Result<(), GameError> {
        match self.state.phase {
            GamePhase::Playing => Ok(()),
            GamePhase::Completed => Err(GameError::GameCompleted),
            actual => Err(GameError::InvalidPhase {
                expected: GamePhase::Playing,
                actual,
            }),
        }
    }

    fn retry(&mut self, error: CollaboratorError, message: &str) -> Turn {
        tracing::warn!("Collaborator call failed: {}", error);
        let mut turn = Turn::message(message);
        turn.failure = Some(error.kind());
        self.emit(turn)
    }

    fn emit(&mut self, turn: Turn) -> Turn {
        self.message = turn.message.clone();
        turn
    }
}

fn non_empty(text: &str) -> Result<&str, GameError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(GameError::EmptyInput)
    } else {
        Ok(trimmed)
    }
}

fn stage_noun(category: Category, stage: QuestionStage) -> &'static str {
    match stage {
        QuestionStage::Source => "source",
        QuestionStage::Year => "year",
        QuestionStage::Creator => category.creator_label().unwrap_or("creator"),
    }
}

fn stage_prompt(category: Category, stage: QuestionStage) -> String {
    format!("Enter the {}...", stage_noun(category, stage))
}

fn bonus_label(stage: QuestionStage) -> &'static str {
    match stage {
        QuestionStage::Source => "base",
        QuestionStage::Year => "DOUBLE",
        QuestionStage::Creator => "TRIPLE",
    }
}
