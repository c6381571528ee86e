pub mod document;
pub mod label;
pub mod occurrence;
pub mod summary;

pub use document::{Document, SourceSentence};
pub use label::LabelType;
pub use occurrence::{NewOccurrence, NumeralOccurrence, NumeralSpan};
pub use summary::LabelSummary;
