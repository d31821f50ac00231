pub mod bundle;
pub mod format;
pub mod sink;

pub use bundle::{ResultBundle, Sheet};
pub use format::format_fact_value;
pub use sink::{CsvWorkbookSink, JsonSink, MemorySink, OutputFormat, OutputSink, XlsxSink};
