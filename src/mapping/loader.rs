use anyhow::{anyhow, Result};
use std::path::PathBuf;

use super::MappingConfig;

pub const DEFAULT_MAPPING_FILE: &str = "default.yaml";

/// Directory of per-entity mapping files: `<ticker>.yaml`, `<cik>.yaml`
/// and an optional `default.yaml` fallback.
#[derive(Clone, Debug)]
pub struct MappingSource {
    mapping_dir: PathBuf,
}

impl MappingSource {
    pub fn new(mapping_dir: impl Into<PathBuf>) -> Self {
        Self {
            mapping_dir: mapping_dir.into(),
        }
    }

    /// Ticker first, then CIK, then the default file.
    pub fn resolve_path(&self, ticker: Option<&str>, cik: Option<&str>) -> Result<PathBuf> {
        if let Some(ticker) = ticker {
            let path = self
                .mapping_dir
                .join(format!("{}.yaml", ticker.to_lowercase()));
            if path.exists() {
                return Ok(path);
            }
            log::warn!(
                "Mapping file for ticker '{}' not found at {}",
                ticker,
                path.display()
            );
        }

        if let Some(cik) = cik {
            let path = self.mapping_dir.join(format!("{}.yaml", cik));
            if path.exists() {
                return Ok(path);
            }
            log::warn!(
                "Mapping file for CIK '{}' not found at {}",
                cik,
                path.display()
            );
        }

        let default_path = self.mapping_dir.join(DEFAULT_MAPPING_FILE);
        if default_path.exists() {
            log::info!("Falling back to {}", default_path.display());
            return Ok(default_path);
        }

        Err(anyhow!(
            "No mapping file found in {} for ticker {:?} / CIK {:?} and no {} provided",
            self.mapping_dir.display(),
            ticker,
            cik,
            DEFAULT_MAPPING_FILE
        ))
    }

    pub fn load(&self, ticker: Option<&str>, cik: Option<&str>) -> Result<MappingConfig> {
        let path = self.resolve_path(ticker, cik)?;
        log::debug!("Loading mapping from {}", path.display());
        MappingConfig::from_file(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const RULES: &str = "fields:\n  Total Assets:\n    tags: [us-gaap:Assets]\n";

    #[test]
    fn test_resolution_order() {
        let dir = tempdir().unwrap();
        let source = MappingSource::new(dir.path());

        assert!(source.resolve_path(Some("aapl"), Some("0000320193")).is_err());

        fs::write(dir.path().join("default.yaml"), RULES).unwrap();
        assert_eq!(
            source.resolve_path(Some("aapl"), None).unwrap(),
            dir.path().join("default.yaml")
        );

        fs::write(dir.path().join("0000320193.yaml"), RULES).unwrap();
        assert_eq!(
            source.resolve_path(Some("aapl"), Some("0000320193")).unwrap(),
            dir.path().join("0000320193.yaml")
        );

        fs::write(dir.path().join("aapl.yaml"), RULES).unwrap();
        assert_eq!(
            source.resolve_path(Some("AAPL"), Some("0000320193")).unwrap(),
            dir.path().join("aapl.yaml")
        );
    }

    #[test]
    fn test_load() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("msft.yaml"), RULES).unwrap();

        let config = MappingSource::new(dir.path()).load(Some("msft"), None).unwrap();
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.source, dir.path().join("msft.yaml"));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("msft.yaml"), "fields: [1, 2").unwrap();

        assert!(MappingSource::new(dir.path()).load(Some("msft"), None).is_err());
    }
}
