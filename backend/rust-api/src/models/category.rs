use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Song,
    Movie,
    FamousPerson,
    FictionalCharacter,
    Book,
    Poet,
    Quote,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Song,
        Category::Movie,
        Category::FamousPerson,
        Category::FictionalCharacter,
        Category::Book,
        Category::Poet,
        Category::Quote,
    ];

    /// Wire key used by the AI backend and in conversation history
    pub fn key(self) -> &'static str {
        match self {
            Category::Song => "SONG",
            Category::Movie => "MOVIE",
            Category::FamousPerson => "FAMOUS_PERSON",
            Category::FictionalCharacter => "FICTIONAL_CHARACTER",
            Category::Book => "BOOK",
            Category::Poet => "POET",
            Category::Quote => "QUOTE",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Category::Song => "Song",
            Category::Movie => "Movie",
            Category::FamousPerson => "Famous Person",
            Category::FictionalCharacter => "Fictional Character",
            Category::Book => "Book",
            Category::Poet => "Poet",
            Category::Quote => "Quote",
        }
    }

    /// Only these categories chain a third bonus question after the year
    pub fn offers_creator(self) -> bool {
        matches!(self, Category::Movie | Category::Song | Category::Book)
    }

    pub fn creator_label(self) -> Option<&'static str> {
        match self {
            Category::Movie => Some("director"),
            Category::Song => Some("artist/band"),
            Category::Book => Some("author"),
            _ => None,
        }
    }

    /// Stages reachable in a round of this category, in order
    pub fn stages(self) -> &'static [QuestionStage] {
        if self.offers_creator() {
            &[
                QuestionStage::Source,
                QuestionStage::Year,
                QuestionStage::Creator,
            ]
        } else {
            &[QuestionStage::Source, QuestionStage::Year]
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    // Accepts "FAMOUS_PERSON", "famous person", "Famous-Person"...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                other => other.to_ascii_uppercase(),
            })
            .collect();

        Category::ALL
            .into_iter()
            .find(|category| category.key() == normalized)
            .ok_or_else(|| UnknownCategory(s.trim().to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStage {
    Source,
    Year,
    Creator,
}

impl QuestionStage {
    pub fn multiplier(self) -> u32 {
        match self {
            QuestionStage::Source => 1,
            QuestionStage::Year => 2,
            QuestionStage::Creator => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QuestionStage::Source => "source",
            QuestionStage::Year => "year",
            QuestionStage::Creator => "creator",
        }
    }

    /// The bonus stage offered after a correct answer at `self`, if any
    pub fn next_for(self, category: Category) -> Option<QuestionStage> {
        let stages = category.stages();
        let position = stages.iter().position(|stage| *stage == self)?;
        stages.get(position + 1).copied()
    }
}

impl fmt::Display for QuestionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Greeting,
    Playing,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Generation hint forwarded to the phrase backend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifficultyConfig {
    pub popularity: &'static str,
    pub description: &'static str,
    pub temperature: f32,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "EASY",
            Difficulty::Medium => "MEDIUM",
            Difficulty::Hard => "HARD",
        }
    }

    pub fn modifiers(self) -> DifficultyConfig {
        match self {
            Difficulty::Easy => DifficultyConfig {
                popularity: "well-known",
                description: "commonly recognized phrases",
                temperature: 0.7,
            },
            Difficulty::Medium => DifficultyConfig {
                popularity: "moderately known",
                description: "somewhat challenging phrases",
                temperature: 0.8,
            },
            Difficulty::Hard => DifficultyConfig {
                popularity: "obscure",
                description: "rare and challenging phrases",
                temperature: 0.9,
            },
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EASY" => Ok(Difficulty::Easy),
            "MEDIUM" => Ok(Difficulty::Medium),
            "HARD" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_keys_and_display_names() {
        assert_eq!("SONG".parse::<Category>(), Ok(Category::Song));
        assert_eq!("famous person".parse::<Category>(), Ok(Category::FamousPerson));
        assert_eq!(
            " Fictional-Character ".parse::<Category>(),
            Ok(Category::FictionalCharacter)
        );
        assert_eq!(
            "opera".parse::<Category>(),
            Err(UnknownCategory("opera".to_string()))
        );
    }

    #[test]
    fn creator_stage_only_for_movie_song_book() {
        for category in Category::ALL {
            let next = QuestionStage::Year.next_for(category);
            if category.offers_creator() {
                assert_eq!(next, Some(QuestionStage::Creator));
                assert!(category.creator_label().is_some());
            } else {
                assert_eq!(next, None);
            }
            assert_eq!(
                QuestionStage::Source.next_for(category),
                Some(QuestionStage::Year)
            );
            assert_eq!(QuestionStage::Creator.next_for(category), None);
        }
    }

    #[test]
    fn difficulty_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Difficulty::Hard).unwrap(), "\"HARD\"");
        assert_eq!("easy".parse::<Difficulty>(), Ok(Difficulty::Easy));
        assert_eq!(Difficulty::Medium.modifiers().temperature, 0.8);
    }
}
