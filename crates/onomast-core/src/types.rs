//! Items in, records out.

use serde::{Deserialize, Serialize};

use crate::taxonomy::{Difficulty, Origin};

/// Stable position of an item in the input, used to restore output order.
pub type ItemId = usize;

/// Explanation used when the assessment call fails or returns nothing usable.
pub const FALLBACK_EXPLANATION: &str = "Sin información.";

/// Column headers the CSV writer appends, in [`EnrichmentRecord::column_values`] order.
pub const ENRICHMENT_COLUMNS: [&str; 5] = [
    "Family_Origin",
    "Name_Description",
    "Pronunciation_Spanish",
    "Pronunciation_Foreign",
    "Pronunciation_Explanation",
];

/// One unit of work: a name and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub payload: String,
}

impl Item {
    pub fn new(id: ItemId, payload: impl Into<String>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }

    /// Number `payloads` from 0 in iteration order.
    pub fn numbered<I, S>(payloads: I) -> Vec<Item>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        payloads
            .into_iter()
            .enumerate()
            .map(|(id, p)| Item::new(id, p))
            .collect()
    }

    pub fn is_blank(&self) -> bool {
        self.payload.trim().is_empty()
    }
}

/// Pronunciation difficulty for Spanish and for foreign speakers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub spanish: Difficulty,
    pub foreign: Difficulty,
    pub explanation: String,
}

impl Assessment {
    pub fn fallback() -> Self {
        Self {
            spanish: Difficulty::Easy,
            foreign: Difficulty::Hard,
            explanation: FALLBACK_EXPLANATION.to_string(),
        }
    }
}

/// Everything learned about one item. Produced exactly once per item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    pub item_id: ItemId,
    pub category: Origin,
    pub narrative: String,
    pub difficulty_primary: Difficulty,
    pub difficulty_secondary: Difficulty,
    pub explanation: String,
}

impl EnrichmentRecord {
    pub(crate) fn assemble(
        item_id: ItemId,
        category: Origin,
        narrative: String,
        assessment: Assessment,
    ) -> Self {
        Self {
            item_id,
            category,
            narrative,
            difficulty_primary: assessment.spanish,
            difficulty_secondary: assessment.foreign,
            explanation: assessment.explanation,
        }
    }

    /// Values for [`ENRICHMENT_COLUMNS`].
    pub fn column_values(&self) -> [String; 5] {
        [
            self.category.label().to_string(),
            self.narrative.clone(),
            self.difficulty_primary.label().to_string(),
            self.difficulty_secondary.label().to_string(),
            self.explanation.clone(),
        ]
    }
}

/// Narrative used when the narrative call fails.
pub fn fallback_narrative(category: Origin) -> String {
    format!("Nombre de origen {category}.")
}
