//! Per-entity mapping from filer tags to normalized field names.

mod loader;

pub use loader::MappingSource;

use anyhow::{anyhow, Context as _, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::edgar::parsing::PeriodType;

/// Which contexts a rule may resolve against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextFilter {
    Instant,
    Duration,
    #[default]
    Any,
}

impl ContextFilter {
    /// Unrecognised or missing labels mean "any context".
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_lowercase()).as_deref() {
            Some("instant") => ContextFilter::Instant,
            Some("duration") => ContextFilter::Duration,
            _ => ContextFilter::Any,
        }
    }

    pub fn accepts(&self, period_type: PeriodType) -> bool {
        match self {
            ContextFilter::Instant => period_type == PeriodType::Instant,
            ContextFilter::Duration => period_type == PeriodType::Duration,
            ContextFilter::Any => true,
        }
    }
}

impl std::fmt::Display for ContextFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextFilter::Instant => write!(f, "instant"),
            ContextFilter::Duration => write!(f, "duration"),
            ContextFilter::Any => write!(f, "any"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMappingRule {
    pub normalized_name: String,
    /// Tried in order; the first tag with a numeric match wins.
    pub candidate_tags: Vec<String>,
    pub context_filter: ContextFilter,
    pub qa_group: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RuleEntry {
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    qa_group: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MappingFile {
    fields: serde_yaml::Mapping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    pub source: PathBuf,
    pub rules: Vec<FieldMappingRule>,
}

impl MappingConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read mapping file {}", path.display()))?;
        Self::from_yaml_str(&content, path.to_path_buf())
    }

    pub fn from_yaml_str(content: &str, source: PathBuf) -> Result<Self> {
        let file: MappingFile = serde_yaml::from_str(content)
            .map_err(|e| anyhow!("Invalid mapping file {}: {}", source.display(), e))?;

        let mut rules = Vec::with_capacity(file.fields.len());
        for (key, value) in file.fields {
            let normalized_name = key
                .as_str()
                .ok_or_else(|| {
                    anyhow!(
                        "Field names must be strings in {}, got {:?}",
                        source.display(),
                        key
                    )
                })?
                .to_string();

            let entry: RuleEntry = if value.is_null() {
                RuleEntry::default()
            } else {
                serde_yaml::from_value(value).map_err(|e| {
                    anyhow!(
                        "Invalid rule for field '{}' in {}: {}",
                        normalized_name,
                        source.display(),
                        e
                    )
                })?
            };

            if entry.tags.is_empty() {
                log::warn!(
                    "Field '{}' in {} lists no tags and will never resolve",
                    normalized_name,
                    source.display()
                );
            }

            rules.push(FieldMappingRule {
                normalized_name,
                candidate_tags: entry.tags,
                context_filter: ContextFilter::from_label(entry.context.as_deref()),
                qa_group: entry
                    .qa_group
                    .map(|g| g.trim().to_string())
                    .filter(|g| !g.is_empty()),
            });
        }

        Ok(Self { source, rules })
    }

    /// QA group labels referenced by at least one rule.
    pub fn declared_qa_groups(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().filter_map(|rule| rule.qa_group.as_deref())
    }
}
