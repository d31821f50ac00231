use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One tagged datum as it appears in the instance document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFact {
    pub tag: String,
    pub value: String,
    pub context_ref: String,
    pub unit_ref: String,
}

/// The period of a single `<context>` element, before any validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodDescriptor {
    pub context_id: String,
    pub instant: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PeriodType {
    Instant,
    Duration,
}

/// A resolved reporting period. Instants carry the same date in `start` and `end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub id: String,
    pub period_type: PeriodType,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Context {
    pub fn instant(id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            period_type: PeriodType::Instant,
            start: date,
            end: date,
        }
    }

    pub fn duration(id: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            id: id.into(),
            period_type: PeriodType::Duration,
            start,
            end,
        }
    }

    pub fn period_label(&self) -> String {
        match self.period_type {
            PeriodType::Instant => self.end.to_string(),
            PeriodType::Duration => format!("{} to {}", self.start, self.end),
        }
    }
}

/// Everything the core needs from one instance document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub facts: Vec<RawFact>,
    pub periods: Vec<PeriodDescriptor>,
}
