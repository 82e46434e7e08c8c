use async_trait::async_trait;

use crate::errors::CollaboratorError;
use crate::models::answer::{AnswerCheck, Verdict};
use crate::models::category::{Category, Difficulty};
use crate::models::conversation::ConversationLog;
use crate::models::phrase::PhraseRecord;

/// Produces the phrase for a new round
#[async_trait]
pub trait PhraseSource: Send + Sync {
    /// `context` is the session history when the category was played before,
    /// so the backend can avoid repeating itself
    async fn fetch(
        &self,
        category: Category,
        difficulty: Difficulty,
        context: Option<&ConversationLog>,
    ) -> Result<PhraseRecord, CollaboratorError>;
}

/// Grades player replies, both factual answers and bonus yes/no replies
#[async_trait]
pub trait AnswerOracle: Send + Sync {
    async fn check(&self, request: AnswerCheck<'_>) -> Result<Verdict, CollaboratorError>;
}
