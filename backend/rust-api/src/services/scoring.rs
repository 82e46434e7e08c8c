use crate::models::category::{Category, QuestionStage};
use std::collections::HashMap;

pub const MIN_BASE_POINTS: u32 = 1;
pub const MAX_BASE_POINTS: u32 = 6;

/// Points awarded for a correct answer at `stage` in a category worth `base`
pub fn stage_points(base: u32, stage: QuestionStage) -> u32 {
    base * stage.multiplier()
}

/// Best attainable round total: every stage the category offers, answered correctly
pub fn max_points(base: u32, category: Category) -> u32 {
    category
        .stages()
        .iter()
        .map(|stage| stage_points(base, *stage))
        .sum()
}

/// Base weight per category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointTable {
    weights: HashMap<Category, u32>,
}

impl Default for PointTable {
    fn default() -> Self {
        let weights = HashMap::from([
            (Category::Song, 1),
            (Category::Movie, 2),
            (Category::FamousPerson, 3),
            (Category::FictionalCharacter, 3),
            (Category::Book, 4),
            (Category::Poet, 5),
            (Category::Quote, 6),
        ]);
        Self { weights }
    }
}

impl PointTable {
    /// Table with every category worth the same base weight
    pub fn uniform(base: u32) -> Result<Self, String> {
        let mut table = Self::default();
        for category in Category::ALL {
            table.set(category, base)?;
        }
        Ok(table)
    }

    pub fn set(&mut self, category: Category, base: u32) -> Result<(), String> {
        if !(MIN_BASE_POINTS..=MAX_BASE_POINTS).contains(&base) {
            return Err(format!(
                "base points for {} must be between {} and {}, got {}",
                category, MIN_BASE_POINTS, MAX_BASE_POINTS, base
            ));
        }
        self.weights.insert(category, base);
        Ok(())
    }

    pub fn with(mut self, category: Category, base: u32) -> Result<Self, String> {
        self.set(category, base)?;
        Ok(self)
    }

    pub fn base_points(&self, category: Category) -> u32 {
        self.weights
            .get(&category)
            .copied()
            .unwrap_or(MIN_BASE_POINTS)
    }

    pub fn points(&self, category: Category, stage: QuestionStage) -> u32 {
        stage_points(self.base_points(category), stage)
    }

    pub fn max_points(&self, category: Category) -> u32 {
        max_points(self.base_points(category), category)
    }
}
