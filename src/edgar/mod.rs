pub mod filing;
pub mod parsing;
pub mod report;

pub use filing::FilingId;
pub use report::ReportType;
