use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::report::ReportType;

/// Identity of a filing, derived from its file name
/// (`<ticker>_<yyyymmdd>_<form>.xml`, e.g. `aapl_20240928_10-K.xml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingId {
    pub file_name: String,
    pub ticker: String,
    pub fiscal_year: String,
    pub report_type: ReportType,
}

impl FilingId {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow!("Invalid filing path: {:?}", path))?;

        Self::from_file_name(file_name)
    }

    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let stem = file_name.strip_suffix(".xml").unwrap_or(file_name);
        let parts: Vec<&str> = stem.split('_').collect();

        let ticker = parts[0].trim().to_lowercase();
        if ticker.is_empty() {
            return Err(anyhow!("No ticker in filing name: {}", file_name));
        }

        let fiscal_year = parts
            .get(1)
            .and_then(|date| date.get(..4))
            .filter(|year| year.chars().all(|c| c.is_ascii_digit()))
            .ok_or_else(|| anyhow!("No fiscal year in filing name: {}", file_name))?
            .to_string();

        // Filings without an explicit form are annual reports
        let report_type = match parts.get(2) {
            Some(form) => form
                .parse::<ReportType>()
                .map_err(|e| {
                    anyhow!(
                        "Invalid form type in {}: {} (expected one of {})",
                        file_name,
                        e,
                        ReportType::list_types()
                    )
                })?,
            None => ReportType::Form10K,
        };

        Ok(Self {
            file_name: file_name.to_string(),
            ticker,
            fiscal_year,
            report_type,
        })
    }

    /// Base name for this filing's output, unique per run second.
    pub fn output_name(&self, run_at: DateTime<Local>) -> String {
        format!(
            "output_{}_{}_{}_{}",
            self.ticker,
            self.fiscal_year,
            self.report_type,
            run_at.format("%Y%m%d_%H%M%S")
        )
    }
}
