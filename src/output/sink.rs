use anyhow::{anyhow, Context as _, Result};
use csv::WriterBuilder;
use rust_xlsxwriter::Workbook;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use strum::{Display, EnumString};

use super::bundle::ResultBundle;
use crate::utils::dirs::ensure_dir;

// Suffixes tried after the plain name is taken: `_2`, `_3`, ...
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Destination for finished bundles. Implementations are shared across
/// batch workers, so a write must not depend on previous writes and must
/// never replace an earlier output.
pub trait OutputSink: Send + Sync {
    /// Writes one bundle under `output_name`, or `output_name_N` when that
    /// name is taken, and returns where it went.
    fn write(&self, bundle: &ResultBundle, output_name: &str) -> Result<PathBuf>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputFormat {
    #[default]
    Xlsx,
    Csv,
    Json,
}

impl OutputFormat {
    pub fn sink(&self, output_dir: impl Into<PathBuf>) -> Arc<dyn OutputSink> {
        match self {
            OutputFormat::Xlsx => Arc::new(XlsxSink::new(output_dir)),
            OutputFormat::Csv => Arc::new(CsvWorkbookSink::new(output_dir)),
            OutputFormat::Json => Arc::new(JsonSink::new(output_dir)),
        }
    }
}

fn candidate_name(output_name: &str, attempt: usize) -> String {
    if attempt == 1 {
        output_name.to_string()
    } else {
        format!("{}_{}", output_name, attempt)
    }
}

/// Atomically claims the first free name under `dir`, using `create` to make
/// the target. `create` must fail with `AlreadyExists` on a taken name.
fn claim_target(
    dir: &Path,
    output_name: &str,
    extension: Option<&str>,
    create: impl Fn(&Path) -> std::io::Result<()>,
) -> Result<PathBuf> {
    ensure_dir(dir)?;

    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let name = candidate_name(output_name, attempt);
        let path = match extension {
            Some(ext) => dir.join(format!("{}.{}", name, ext)),
            None => dir.join(name),
        };
        match create(&path) {
            Ok(()) => {
                if attempt > 1 {
                    log::warn!("{} was taken, writing to {}", output_name, path.display());
                }
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create {}", path.display()))
            }
        }
    }

    Err(anyhow!(
        "No free output name for {} in {}",
        output_name,
        dir.display()
    ))
}

fn create_new_file(path: &Path) -> std::io::Result<()> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map(|_| ())
}

/// One `.xlsx` workbook per run with a worksheet per sheet.
pub struct XlsxSink {
    output_dir: PathBuf,
}

impl XlsxSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl OutputSink for XlsxSink {
    fn write(&self, bundle: &ResultBundle, output_name: &str) -> Result<PathBuf> {
        let path = claim_target(&self.output_dir, output_name, Some("xlsx"), create_new_file)?;

        let mut workbook = Workbook::new();
        for sheet in bundle.sheets() {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(sheet.name)?;

            for (col, header) in sheet.headers.iter().enumerate() {
                worksheet.write_string(0, col as u16, *header)?;
            }
            for (row, cells) in sheet.rows.iter().enumerate() {
                for (col, cell) in cells.iter().enumerate() {
                    worksheet.write_string(row as u32 + 1, col as u16, cell.as_str())?;
                }
            }
        }

        workbook
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// One directory per run with a CSV file per sheet.
pub struct CsvWorkbookSink {
    output_dir: PathBuf,
}

impl CsvWorkbookSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl OutputSink for CsvWorkbookSink {
    fn write(&self, bundle: &ResultBundle, output_name: &str) -> Result<PathBuf> {
        let workbook_dir = claim_target(&self.output_dir, output_name, None, |path| {
            fs::create_dir(path)
        })?;

        for sheet in bundle.sheets() {
            let path = workbook_dir.join(sheet_file_name(sheet.name));
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

            writer.write_record(&sheet.headers)?;
            for row in &sheet.rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }

        Ok(workbook_dir)
    }
}

fn sheet_file_name(sheet_name: &str) -> String {
    format!("{}.csv", sheet_name.replace(' ', "_"))
}

/// The whole bundle as a single pretty-printed JSON document.
pub struct JsonSink {
    output_dir: PathBuf,
}

impl JsonSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl OutputSink for JsonSink {
    fn write(&self, bundle: &ResultBundle, output_name: &str) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(bundle)?;
        let path = claim_target(&self.output_dir, output_name, Some("json"), create_new_file)?;

        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        file.write_all(json.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(path)
    }
}

/// Keeps bundles in memory, for callers that want the results without files.
#[derive(Default)]
pub struct MemorySink {
    bundles: Mutex<Vec<(String, ResultBundle)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bundles(&self) -> Result<Vec<(String, ResultBundle)>> {
        self.bundles
            .lock()
            .map(|b| b.clone())
            .map_err(|_| anyhow!("Memory sink lock poisoned"))
    }
}

impl OutputSink for MemorySink {
    fn write(&self, bundle: &ResultBundle, output_name: &str) -> Result<PathBuf> {
        let mut bundles = self
            .bundles
            .lock()
            .map_err(|_| anyhow!("Memory sink lock poisoned"))?;

        let name = (1..=MAX_NAME_ATTEMPTS)
            .map(|attempt| candidate_name(output_name, attempt))
            .find(|name| bundles.iter().all(|(taken, _)| taken != name))
            .ok_or_else(|| anyhow!("No free output name for {}", output_name))?;

        bundles.push((name.clone(), bundle.clone()));
        Ok(PathBuf::from(name))
    }
}
