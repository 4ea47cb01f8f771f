pub mod error;
pub mod export;
pub mod ingest;
pub mod llm;

pub use error::ErrorKind;
pub use export::{export_csv, ExportError, EXPORT_COLUMNS, EXPORT_FILENAME, LIST_SEPARATOR};
pub use ingest::{
    BatchError, BatchInput, BatchProcessor, BatchResult, CandidateRecord, CompositeTextExtractor,
    DocumentFormat, EntryError, EntryFailure, ProjectSlot, RawEntry, TextExtractor,
};
pub use llm::{GeminiClient, StructuredExtractor, SummaryError, EXTRACTION_PROMPT};
