use serde::{Deserialize, Serialize};

use super::category::{Category, Difficulty, DifficultyConfig, QuestionStage};
use super::conversation::ConversationEntry;

/// Phrase to guess plus the hidden facts for every stage of the round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseRecord {
    pub phrase: String,
    pub source: String,
    pub year: i32,
    pub creator: Option<String>,
    pub hint: String,
    pub genre: Option<String>,
}

impl PhraseRecord {
    /// Reference answer the oracle grades against at `stage`
    pub fn answer_for(&self, stage: QuestionStage) -> String {
        match stage {
            QuestionStage::Source => self.source.clone(),
            QuestionStage::Year => self.year.to_string(),
            QuestionStage::Creator => self
                .creator
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePhraseRequest<'a> {
    pub category: Category,
    pub difficulty: Difficulty,
    pub difficulty_config: DifficultyConfig,
    pub conversation_history: Option<&'a [ConversationEntry]>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePhraseResponse {
    pub phrase: Option<String>,
    pub source: Option<String>,
    pub year: Option<YearValue>,
    pub hint: Option<String>,
    #[serde(default)]
    pub additional_info: Option<AdditionalInfo>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdditionalInfo {
    pub creator: Option<String>,
    pub genre: Option<String>,
}

/// The backend types `year` as a JSON number; models sometimes send a string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum YearValue {
    Number(f64),
    Text(String),
}

impl YearValue {
    fn to_year(&self) -> Option<i32> {
        match self {
            YearValue::Number(n) if n.fract() == 0.0 && n.abs() < 100_000.0 => Some(*n as i32),
            YearValue::Number(_) => None,
            YearValue::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl GeneratePhraseResponse {
    /// Fails with the name of the first missing or unusable required field
    pub fn into_record(self) -> Result<PhraseRecord, String> {
        let phrase = required_text(self.phrase, "phrase")?;
        let source = required_text(self.source, "source")?;
        let year = self
            .year
            .as_ref()
            .ok_or_else(|| "missing field `year`".to_string())?
            .to_year()
            .ok_or_else(|| "field `year` is not a whole year".to_string())?;
        let hint = required_text(self.hint, "hint")?;
        let info = self.additional_info.unwrap_or_default();

        Ok(PhraseRecord {
            phrase,
            source,
            year,
            creator: info.creator.filter(|c| !c.trim().is_empty()),
            hint,
            genre: info.genre,
        })
    }
}

fn required_text(value: Option<String>, field: &str) -> Result<String, String> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        Some(_) => Err(format!("field `{}` is empty", field)),
        None => Err(format!("missing field `{}`", field)),
    }
}
