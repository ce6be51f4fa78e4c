//! Result types returned by the intake pipeline.

use crate::pipeline::extract::{extract_age, extract_email, extract_name, extract_phone};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// The fields pulled from one page of recognised text.
///
/// Every field is always present; a field the heuristics could not find is
/// the empty string. `message` stays empty unless the LLM extractor fills it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedRecord {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub age: String,
    pub message: String,
}

impl ExtractedRecord {
    /// Run every extractor over `text`.
    pub fn from_text(text: &str) -> Self {
        Self {
            name: extract_name(text).unwrap_or_default(),
            email: extract_email(text).unwrap_or_default(),
            phone: extract_phone(text).unwrap_or_default(),
            age: extract_age(text).unwrap_or_default(),
            message: String::new(),
        }
    }

    /// Number of extracted (non-empty) fields, `message` excluded.
    pub fn filled_fields(&self) -> usize {
        [&self.name, &self.email, &self.phone, &self.age]
            .iter()
            .filter(|f| !f.is_empty())
            .count()
    }
}

/// Outcome of processing one upload.
///
/// Serialises as the record's JSON object, or as `{}` when the document had
/// no pages. The two shapes differ on purpose: clients distinguish "nothing
/// to read" from "read, but found nothing".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    Record(ExtractedRecord),
    Empty,
}

impl IntakeOutcome {
    pub fn record(&self) -> Option<&ExtractedRecord> {
        match self {
            IntakeOutcome::Record(r) => Some(r),
            IntakeOutcome::Empty => None,
        }
    }
}

impl Serialize for IntakeOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            IntakeOutcome::Record(record) => record.serialize(serializer),
            IntakeOutcome::Empty => serializer.serialize_map(Some(0))?.end(),
        }
    }
}
