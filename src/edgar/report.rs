use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use strum::{EnumIter, IntoEnumIterator};

/// Form types that carry XBRL financial statements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, EnumIter)]
#[serde(try_from = "String", into = "String")]
pub enum ReportType {
    #[default]
    Form10K,
    Form10Q,
    Form20F,
    Form40F,
    Form6K,
    Form8K,
    Other(String),
}

impl TryFrom<String> for ReportType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ReportType::from_str(&s)
    }
}

impl From<ReportType> for String {
    fn from(report_type: ReportType) -> Self {
        report_type.to_string()
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportType::Form10K => write!(f, "10-K"),
            ReportType::Form10Q => write!(f, "10-Q"),
            ReportType::Form20F => write!(f, "20-F"),
            ReportType::Form40F => write!(f, "40-F"),
            ReportType::Form6K => write!(f, "6-K"),
            ReportType::Form8K => write!(f, "8-K"),
            ReportType::Other(s) => write!(f, "{}", s),
        }
    }
}

pub static REPORT_TYPES: Lazy<String> = Lazy::new(|| {
    ReportType::iter()
        .filter(|t| !matches!(t, ReportType::Other(_)))
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
});

impl ReportType {
    pub fn list_types() -> &'static str {
        &REPORT_TYPES
    }
}

impl FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<ReportType, String> {
        match s.trim().to_uppercase().as_str() {
            "10-K" | "10K" => Ok(ReportType::Form10K),
            "10-Q" | "10Q" => Ok(ReportType::Form10Q),
            "20-F" | "20F" => Ok(ReportType::Form20F),
            "40-F" | "40F" => Ok(ReportType::Form40F),
            "6-K" | "6K" => Ok(ReportType::Form6K),
            "8-K" | "8K" => Ok(ReportType::Form8K),
            "" => Err("empty form type".to_string()),
            _ => Ok(ReportType::Other(s.trim().to_string())),
        }
    }
}
