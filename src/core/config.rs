use anyhow::{anyhow, Result};
use std::path::PathBuf;

use crate::output::OutputFormat;
use crate::utils::dirs::{LOG_FILE, MAPPING_DIR, OUTPUT_DIR};

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub mapping_dir: PathBuf,
    pub output_dir: PathBuf,
    pub log_file: Option<PathBuf>,
    pub format: OutputFormat,
    pub jobs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mapping_dir: PathBuf::from(MAPPING_DIR),
            output_dir: PathBuf::from(OUTPUT_DIR),
            log_file: Some(PathBuf::from(LOG_FILE)),
            format: OutputFormat::Xlsx,
            jobs: 1,
        }
    }
}

impl Config {
    /// Reads `XBRL_QA_*` variables, after loading `.env` if there is one.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();

        let mapping_dir = var("XBRL_QA_MAPPING_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.mapping_dir);

        let output_dir = var("XBRL_QA_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);

        // An empty value turns the log file off
        let log_file = match var("XBRL_QA_LOG_FILE") {
            Some(path) if path.trim().is_empty() => None,
            Some(path) => Some(PathBuf::from(path)),
            None => defaults.log_file,
        };

        let format = match var("XBRL_QA_FORMAT") {
            Some(format) => format
                .parse::<OutputFormat>()
                .map_err(|_| anyhow!("XBRL_QA_FORMAT must be xlsx, csv or json, got '{}'", format))?,
            None => defaults.format,
        };

        let jobs = match var("XBRL_QA_JOBS") {
            Some(jobs) => jobs
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| anyhow!("XBRL_QA_JOBS must be a positive integer, got '{}'", jobs))?,
            None => defaults.jobs,
        };

        Ok(Self {
            mapping_dir,
            output_dir,
            log_file,
            format,
            jobs,
        })
    }
}
