use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Batch progress bar plus the per-document console notices.
#[derive(Clone)]
pub struct ProgressTracker {
    progress_bar: ProgressBar,
    quiet: bool,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Self {
            progress_bar: pb,
            quiet: false,
        }
    }

    /// No bar and no console output.
    pub fn quiet() -> Self {
        Self {
            progress_bar: ProgressBar::hidden(),
            quiet: true,
        }
    }

    pub fn set_total(&self, total: u64) {
        self.progress_bar.set_length(total);
    }

    pub fn start_document(&self, path: &Path) {
        self.progress_bar.set_message(file_label(path));
        self.notice(format!("📄 Processing {} ...", path.display()));
    }

    pub fn document_saved(&self, path: &Path, output: &Path) {
        self.progress_bar.inc(1);
        self.notice(format!(
            "{} {} -> {}",
            "✅".green(),
            file_label(path),
            output.display().to_string().green()
        ));
    }

    pub fn document_failed(&self, path: &Path, error: &str) {
        self.progress_bar.inc(1);
        self.notice(format!(
            "{} Error processing {}: {}",
            "❌".red(),
            path.display(),
            error.red()
        ));
    }

    pub fn finish(&self, succeeded: usize, failed: usize) {
        self.progress_bar.finish_and_clear();
        let summary = format!(
            "Processed {} filings: {} saved, {} failed",
            succeeded + failed,
            succeeded,
            failed
        );
        if failed == 0 {
            self.notice(summary.green().to_string());
        } else {
            self.notice(summary.yellow().to_string());
        }
    }

    fn notice(&self, line: String) {
        if !self.quiet {
            self.progress_bar.suspend(|| println!("{}", line));
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
