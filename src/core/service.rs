use anyhow::{Context as _, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::edgar::parsing::{parse_document, ParsedDocument};
use crate::edgar::FilingId;
use crate::mapping::{MappingConfig, MappingSource};
use crate::normalize::{normalize, resolve_contexts, value_map};
use crate::output::{OutputSink, ResultBundle};
use crate::qa::{run_all_checks, QaReport};
use crate::utils::dirs::discover_filings;
use crate::utils::progress::ProgressTracker;
use crate::utils::rate_limit::WorkerLimiter;

/// Runs the normalization and QA core over one parsed document. No I/O.
pub fn process_document(
    filing: FilingId,
    document: ParsedDocument,
    mapping: MappingConfig,
) -> ResultBundle {
    let contexts = resolve_contexts(&document.periods);
    let normalized = normalize(&document.facts, &contexts, &mapping.rules);
    let qa = run_all_checks(&value_map(&normalized), mapping.declared_qa_groups());

    ResultBundle::assemble(filing, document.facts, contexts, mapping, normalized, qa)
}

#[derive(Debug, Clone)]
pub struct DocumentReport {
    pub source: PathBuf,
    pub filing: FilingId,
    pub output: PathBuf,
    pub resolved_fields: usize,
    pub total_fields: usize,
    pub qa: QaReport,
}

#[derive(Debug, Clone)]
pub enum DocumentOutcome {
    Saved(DocumentReport),
    Failed { source: PathBuf, error: String },
}

impl DocumentOutcome {
    pub fn source(&self) -> &Path {
        match self {
            DocumentOutcome::Saved(report) => &report.source,
            DocumentOutcome::Failed { source, .. } => source,
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, DocumentOutcome::Saved(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<DocumentOutcome>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_saved()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Processes filings from disk and hands the bundles to a sink.
#[derive(Clone)]
pub struct FilingService {
    mappings: MappingSource,
    sink: Arc<dyn OutputSink>,
}

impl FilingService {
    pub fn new(mappings: MappingSource, sink: Arc<dyn OutputSink>) -> Self {
        Self { mappings, sink }
    }

    /// Mapping lookup uses `ticker` when given, otherwise the ticker from the
    /// file name, then `cik`, then the default mapping.
    pub fn process_file(
        &self,
        path: &Path,
        ticker: Option<&str>,
        cik: Option<&str>,
    ) -> Result<DocumentReport> {
        let filing = FilingId::from_path(path)?;
        let mapping = self
            .mappings
            .load(Some(ticker.unwrap_or(filing.ticker.as_str())), cik)?;

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let document = parse_document(&content)?;

        let bundle = process_document(filing, document, mapping);
        let output_name = bundle.filing.output_name(Local::now());
        let output = self.sink.write(&bundle, &output_name)?;

        Ok(DocumentReport {
            source: path.to_path_buf(),
            filing: bundle.filing.clone(),
            output,
            resolved_fields: bundle.normalized.iter().filter(|v| v.is_resolved()).count(),
            total_fields: bundle.normalized.len(),
            qa: bundle.qa.clone(),
        })
    }

    /// Like `process_file`, but a failure is logged and returned as an outcome.
    pub fn run_file(
        &self,
        path: &Path,
        ticker: Option<&str>,
        cik: Option<&str>,
        tracker: &ProgressTracker,
    ) -> DocumentOutcome {
        log::info!("Start processing file: {}", path.display());
        tracker.start_document(path);

        match self.process_file(path, ticker, cik) {
            Ok(report) => {
                log::info!(
                    "Successfully processed {} ({}/{} fields resolved), output saved to {}",
                    path.display(),
                    report.resolved_fields,
                    report.total_fields,
                    report.output.display()
                );
                tracker.document_saved(path, &report.output);
                DocumentOutcome::Saved(report)
            }
            Err(e) => {
                let error = format!("{:#}", e);
                log::error!("Failed to process {}: {}", path.display(), error);
                tracker.document_failed(path, &error);
                DocumentOutcome::Failed {
                    source: path.to_path_buf(),
                    error,
                }
            }
        }
    }

    /// Every `*.xml` in `folder`, one after another.
    pub fn run_batch(&self, folder: &Path, tracker: &ProgressTracker) -> Result<BatchSummary> {
        let filings = discover_filings(folder)?;
        log::info!("Found {} filings in {}", filings.len(), folder.display());
        tracker.set_total(filings.len() as u64);

        let outcomes = filings
            .iter()
            .map(|path| self.run_file(path, None, None, tracker))
            .collect();

        Ok(BatchSummary { outcomes })
    }

    /// Same as `run_batch`, with up to `jobs` documents on blocking worker threads.
    /// Outcomes keep discovery order.
    pub async fn run_batch_parallel(
        &self,
        folder: &Path,
        jobs: usize,
        tracker: &ProgressTracker,
    ) -> Result<BatchSummary> {
        let filings = discover_filings(folder)?;
        log::info!(
            "Found {} filings in {}, running {} at a time",
            filings.len(),
            folder.display(),
            jobs
        );
        tracker.set_total(filings.len() as u64);

        let limiter = WorkerLimiter::new(jobs);
        let mut handles = Vec::with_capacity(filings.len());

        for path in filings {
            let permit = limiter.acquire().await?;
            let service = self.clone();
            let worker_tracker = tracker.clone();
            let worker_path = path.clone();

            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                service.run_file(&worker_path, None, None, &worker_tracker)
            });
            handles.push((path, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (path, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let error = format!("worker failed: {}", e);
                    log::error!("Failed to process {}: {}", path.display(), error);
                    tracker.document_failed(&path, &error);
                    DocumentOutcome::Failed {
                        source: path,
                        error,
                    }
                }
            };
            outcomes.push(outcome);
        }

        Ok(BatchSummary { outcomes })
    }
}
