use serde::{Deserialize, Serialize};

use super::category::QuestionStage;
use super::conversation::ContextItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    Source,
    Year,
    Creator,
    BonusConfirmation,
}

impl From<QuestionStage> for AnswerType {
    fn from(stage: QuestionStage) -> Self {
        match stage {
            QuestionStage::Source => AnswerType::Source,
            QuestionStage::Year => AnswerType::Year,
            QuestionStage::Creator => AnswerType::Creator,
        }
    }
}

impl AnswerType {
    pub fn as_str(self) -> &'static str {
        match self {
            AnswerType::Source => "source",
            AnswerType::Year => "year",
            AnswerType::Creator => "creator",
            AnswerType::BonusConfirmation => "bonus_confirmation",
        }
    }
}

/// What the oracle is asked to grade
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerCheck<'a> {
    pub player_answer: &'a str,
    pub correct_answer: &'a str,
    pub answer_type: AnswerType,
    pub conversation_history: Vec<ContextItem<'a>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAnswerResponse {
    pub is_correct: Option<bool>,
    pub feedback: Option<String>,
    pub is_bonus_response: Option<bool>,
    pub bonus_declined: Option<bool>,
}

impl CheckAnswerResponse {
    pub fn into_verdict(self) -> Result<Verdict, String> {
        let is_correct = self
            .is_correct
            .ok_or_else(|| "missing field `isCorrect`".to_string())?;
        let feedback = self
            .feedback
            .ok_or_else(|| "missing field `feedback`".to_string())?;

        Ok(Verdict {
            is_correct,
            feedback,
            is_bonus_response: self.is_bonus_response.unwrap_or(false),
            bonus_declined: self.bonus_declined,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_correct: bool,
    pub feedback: String,
    pub is_bonus_response: bool,
    pub bonus_declined: Option<bool>,
}

impl Verdict {
    pub fn correct(feedback: impl Into<String>) -> Self {
        Self {
            is_correct: true,
            feedback: feedback.into(),
            is_bonus_response: false,
            bonus_declined: None,
        }
    }

    pub fn incorrect(feedback: impl Into<String>) -> Self {
        Self {
            is_correct: false,
            ..Self::correct(feedback)
        }
    }

    /// Verdict for a yes (`accepted`) or no reply to a bonus offer
    pub fn bonus_reply(accepted: bool, feedback: impl Into<String>) -> Self {
        Self {
            is_correct: accepted,
            feedback: feedback.into(),
            is_bonus_response: true,
            bonus_declined: Some(!accepted),
        }
    }
}

/// How a verdict on a yes/no reply moves the round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusDecision {
    Accepted,
    Declined,
    /// Graded as correct but not as a yes/no: the offer stays open
    Unrecognized,
}

impl BonusDecision {
    pub fn from_verdict(verdict: &Verdict) -> Self {
        match (verdict.is_bonus_response, verdict.is_correct) {
            (true, true) => BonusDecision::Accepted,
            (_, false) => BonusDecision::Declined,
            (false, true) => BonusDecision::Unrecognized,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BonusDecision::Accepted => "accepted",
            BonusDecision::Declined => "declined",
            BonusDecision::Unrecognized => "unrecognized",
        }
    }
}
