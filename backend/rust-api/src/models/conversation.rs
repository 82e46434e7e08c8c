use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::{Category, QuestionStage};

/// One resolved oracle exchange. Serialized as the backend's history format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEntry {
    pub round: u32,
    pub category: Category,
    pub question_type: QuestionStage,
    pub was_correct: bool,
    pub feedback: String,
    pub is_awaiting_bonus: bool,
    pub timestamp: DateTime<Utc>,
}

/// Append-only, oldest-first record of the session's exchanges
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ConversationLog {
    entries: Vec<ConversationEntry>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, entry: ConversationEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationEntry> {
        self.entries.last()
    }

    /// Whether any earlier exchange was about `category`
    pub fn mentions(&self, category: Category) -> bool {
        self.entries.iter().any(|entry| entry.category == category)
    }

    /// History as sent to the oracle
    pub fn context(&self) -> Vec<ContextItem<'_>> {
        self.entries.iter().map(ContextItem::Entry).collect()
    }
}

/// Item of the history payload sent with an answer check
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ContextItem<'a> {
    Entry(&'a ConversationEntry),
    BonusQuestion(BonusQuestion<'a>),
}

/// Synthetic trailing item describing the pending yes/no question
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusQuestion<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub question_type: QuestionStage,
    pub player_answer: &'a str,
}

impl<'a> ContextItem<'a> {
    pub fn bonus_question(question_type: QuestionStage, player_answer: &'a str) -> Self {
        ContextItem::BonusQuestion(BonusQuestion {
            kind: "bonus_question",
            question_type,
            player_answer,
        })
    }
}
