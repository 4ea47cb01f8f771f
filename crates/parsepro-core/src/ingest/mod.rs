mod archive;
mod extractor;
mod normalizer;
mod pipeline;

pub use archive::{expand, ArchiveEntries, ArchiveError, ArchiveResult, RawEntry};
pub use extractor::{
    CompositeTextExtractor, DocumentFormat, DocxTextExtractor, ExtractionError, ExtractionResult,
    PdfTextExtractor, TextExtractor,
};
pub use normalizer::{
    normalize, CandidateRecord, NormalizationError, NormalizationResult, ProjectSlot,
    PROJECT_SLOTS,
};
pub use pipeline::{
    BatchError, BatchInput, BatchProcessor, BatchResult, EntryError, EntryFailure,
};
