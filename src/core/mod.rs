pub mod config;
pub mod service;

pub use config::Config;
pub use service::{process_document, BatchSummary, DocumentOutcome, DocumentReport, FilingService};
