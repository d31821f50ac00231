use anyhow::{Context as _, Result};
use std::fs;
use std::path::{Path, PathBuf};

// Default locations, relative to the working directory
pub const MAPPING_DIR: &str = "mapping";
pub const OUTPUT_DIR: &str = "output";
pub const LOG_FILE: &str = "xbrl_batch.log";

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(())
}

/// Instance documents (`*.xml`) directly inside `folder`, sorted by name.
pub fn discover_filings(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut filings = Vec::new();

    for entry in fs::read_dir(folder)
        .with_context(|| format!("Failed to read folder {}", folder.display()))?
    {
        let path = entry?.path();
        let is_xml = path.extension().is_some_and(|ext| ext == "xml");
        if path.is_file() && is_xml {
            filings.push(path);
        }
    }

    filings.sort();
    Ok(filings)
}
