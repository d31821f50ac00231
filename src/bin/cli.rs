use anyhow::Result;
use colored::*;
use std::path::PathBuf;
use structopt::StructOpt;
use xbrl_qa::{
    core::{Config, DocumentOutcome, FilingService},
    mapping::MappingSource,
    output::OutputFormat,
    utils::logging::init_logging,
    ProgressTracker,
};

#[derive(StructOpt, Debug)]
struct CommonOpt {
    /// Directory holding <ticker>.yaml / <cik>.yaml / default.yaml
    #[structopt(long, parse(from_os_str))]
    mapping_dir: Option<PathBuf>,

    /// Where reports are written
    #[structopt(long, parse(from_os_str))]
    output_dir: Option<PathBuf>,

    /// Report format: xlsx, csv or json
    #[structopt(long)]
    format: Option<OutputFormat>,

    /// Append log records to this file
    #[structopt(long, parse(from_os_str))]
    log_file: Option<PathBuf>,

    /// Log to stderr instead of a file
    #[structopt(long)]
    no_log_file: bool,
}

impl CommonOpt {
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.mapping_dir {
            config.mapping_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(log_file) = &self.log_file {
            config.log_file = Some(log_file.clone());
        }
        if self.no_log_file {
            config.log_file = None;
        }
    }
}

#[derive(StructOpt, Debug)]
#[structopt(name = "xbrl-qa", about = "Normalize XBRL filings and run QA checks")]
enum Opt {
    /// Process every XBRL file in a folder
    Batch {
        /// Folder containing <ticker>_<yyyymmdd>_<form>.xml files
        #[structopt(long, parse(from_os_str))]
        folder: PathBuf,

        /// Number of filings processed at the same time
        #[structopt(long)]
        jobs: Option<usize>,

        #[structopt(flatten)]
        common: CommonOpt,
    },
    /// Process a single XBRL file
    File {
        #[structopt(parse(from_os_str))]
        input: PathBuf,

        /// Mapping ticker, instead of the one in the file name
        #[structopt(long)]
        ticker: Option<String>,

        /// CIK mapping to try when there is no ticker mapping
        #[structopt(long)]
        cik: Option<String>,

        #[structopt(flatten)]
        common: CommonOpt,
    },
}

impl Opt {
    fn common(&self) -> &CommonOpt {
        match self {
            Opt::Batch { common, .. } | Opt::File { common, .. } => common,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::from_args();

    let mut config = Config::from_env()?;
    opt.common().apply(&mut config);
    init_logging(config.log_file.as_deref())?;

    let service = FilingService::new(
        MappingSource::new(&config.mapping_dir),
        config.format.sink(&config.output_dir),
    );

    match opt {
        Opt::Batch { folder, jobs, .. } => {
            let jobs = jobs.unwrap_or(config.jobs).max(1);
            let tracker = ProgressTracker::new();

            let summary = if jobs > 1 {
                service.run_batch_parallel(&folder, jobs, &tracker).await?
            } else {
                service.run_batch(&folder, &tracker)?
            };

            tracker.finish(summary.succeeded(), summary.failed());
            Ok(())
        }
        Opt::File { input, ticker, cik, .. } => {
            if !input.exists() {
                eprintln!("Input file does not exist: {:?}", input);
                std::process::exit(1);
            }

            let tracker = ProgressTracker::new();
            match service.run_file(&input, ticker.as_deref(), cik.as_deref(), &tracker) {
                DocumentOutcome::Saved(report) => {
                    tracker.finish(1, 0);
                    for outcome in &report.qa.outcomes {
                        let status = if outcome.passed {
                            "pass".green()
                        } else {
                            "fail".red()
                        };
                        println!("  {:<18} {}", outcome.check.to_string(), status);
                    }

                    if report.qa.is_empty() {
                        println!("{}", "No QA checks declared by the mapping".yellow());
                    } else if report.qa.all_passed() {
                        println!("{}", "All QA checks passed".green());
                    } else {
                        println!("{}", "Some QA checks failed".red());
                    }
                    Ok(())
                }
                DocumentOutcome::Failed { .. } => {
                    tracker.finish(0, 1);
                    std::process::exit(1);
                }
            }
        }
    }
}
