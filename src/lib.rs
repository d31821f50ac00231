pub mod core;
pub mod edgar;
pub mod mapping;
pub mod normalize;
pub mod output;
pub mod qa;
pub mod utils;

// Re-exports
pub use crate::core::{process_document, Config, FilingService};
pub use utils::progress::ProgressTracker;
