pub mod types;
pub mod xbrl;

#[cfg(test)]
pub(crate) mod tests;

pub use types::{Context, ParsedDocument, PeriodDescriptor, PeriodType, RawFact};
pub use xbrl::parse_document;
