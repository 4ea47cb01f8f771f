use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::archive::{self, ArchiveError, ArchiveResult, RawEntry};
use super::extractor::{CompositeTextExtractor, DocumentFormat, ExtractionError, TextExtractor};
use super::normalizer::{self, CandidateRecord, NormalizationError};
use crate::error::ErrorKind;
use crate::llm::{StructuredExtractor, SummaryError};

/// Failure of the request as a whole; nothing partial survives these.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Unsupported upload format: {0}")]
    UnsupportedFormat(String),
    #[error("Unreadable batch container: {0}")]
    Unreadable(String),
    #[error("Credential missing or rejected: {0}")]
    Auth(String),
}

impl BatchError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::Unreadable(_) => ErrorKind::BatchUnreadable,
            Self::Auth(_) => ErrorKind::AuthFailure,
        }
    }
}

/// Failure of one entry at any stage; recorded, never fatal to the batch.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Summary(#[from] SummaryError),
    #[error(transparent)]
    Normalization(#[from] NormalizationError),
    #[error("Failed to read archive entry: {0}")]
    Archive(String),
}

impl EntryError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Extraction(ExtractionError::UnsupportedFormat(_)) => ErrorKind::UnsupportedFormat,
            Self::Extraction(ExtractionError::CorruptDocument(_)) | Self::Archive(_) => {
                ErrorKind::CorruptDocument
            }
            Self::Summary(SummaryError::Auth(_)) => ErrorKind::AuthFailure,
            Self::Summary(SummaryError::Upstream(_)) => ErrorKind::UpstreamFailure,
            Self::Summary(SummaryError::Timeout) => ErrorKind::Timeout,
            Self::Normalization(_) => ErrorKind::MalformedResponse,
        }
    }
}

#[derive(Debug)]
pub struct EntryFailure {
    pub entry_name: String,
    pub error: EntryError,
}

impl EntryFailure {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

/// Outcome of one batch: normalized records in entry-discovery order,
/// plus the entries that failed. Created per request, never persisted.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub records: Vec<CandidateRecord>,
    pub failures: Vec<EntryFailure>,
}

impl BatchResult {
    pub fn success_count(&self) -> usize {
        self.records.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

/// One inbound upload, resolved to either a single document or an
/// archive to expand.
#[derive(Debug)]
pub enum BatchInput {
    Document {
        name: String,
        format: DocumentFormat,
        bytes: Vec<u8>,
    },
    Archive {
        name: String,
        bytes: Vec<u8>,
    },
}

const ARCHIVE_CONTENT_TYPES: &[&str] = &[
    "application/zip",
    "application/x-zip",
    "application/x-zip-compressed",
];

impl BatchInput {
    /// Resolve an upload's declared content type (with extension as a
    /// fallback) into a batch input. Anything that is neither a supported
    /// document nor an archive fails the whole request up front.
    pub fn from_upload(
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Self, BatchError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        if ARCHIVE_CONTENT_TYPES.contains(&content_type) || extension.as_deref() == Some("zip") {
            return Ok(Self::Archive {
                name: filename.to_string(),
                bytes,
            });
        }

        let format = DocumentFormat::from_mime(content_type)
            .or_else(|| extension.as_deref().and_then(DocumentFormat::from_extension));

        match format {
            Some(format) => Ok(Self::Document {
                name: filename.to_string(),
                format,
                bytes,
            }),
            None => Err(BatchError::UnsupportedFormat(content_type.to_string())),
        }
    }
}

/// Drives extract -> summarize -> normalize over every entry of one
/// input, isolating per-entry failures so one bad resume never aborts
/// the batch. Stateless across batches; safe to share between requests.
pub struct BatchProcessor {
    extractor: Box<dyn TextExtractor>,
    client: Arc<dyn StructuredExtractor>,
    entry_timeout: Duration,
}

const DEFAULT_ENTRY_TIMEOUT: Duration = Duration::from_secs(60);

impl BatchProcessor {
    #[must_use]
    pub fn new(client: Arc<dyn StructuredExtractor>) -> Self {
        Self {
            extractor: Box::new(CompositeTextExtractor::default()),
            client,
            entry_timeout: DEFAULT_ENTRY_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Box<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    #[must_use]
    pub fn with_entry_timeout(mut self, timeout: Duration) -> Self {
        self.entry_timeout = timeout;
        self
    }

    /// Process one input to completion. The batch is always drained; no
    /// entry is retried. Only an unreadable container or a rejected
    /// credential fails the request outright.
    pub async fn process(
        &self,
        input: BatchInput,
        credential: &str,
    ) -> Result<BatchResult, BatchError> {
        let entries: Box<dyn Iterator<Item = ArchiveResult<RawEntry>> + Send> = match input {
            BatchInput::Document {
                name,
                format,
                bytes,
            } => Box::new(std::iter::once(Ok(RawEntry {
                name,
                bytes,
                format,
            }))),
            BatchInput::Archive { name: _, bytes } => {
                let expanded = archive::expand(bytes)
                    .map_err(|e| BatchError::Unreadable(e.to_string()))?;
                Box::new(expanded)
            }
        };

        let mut result = BatchResult::default();

        for item in entries {
            let (name, outcome) = match item {
                Ok(entry) => {
                    let name = entry.name.clone();
                    let outcome = self.process_entry(entry, credential).await;
                    (name, outcome)
                }
                Err(ArchiveError::Entry { name, reason }) => {
                    (name, Err(EntryError::Archive(reason)))
                }
                Err(ArchiveError::Unreadable(reason)) => {
                    return Err(BatchError::Unreadable(reason));
                }
            };

            match outcome {
                Ok(record) => result.records.push(record),
                // A rejected credential cannot succeed for any later
                // entry; abort the request instead of failing them all.
                Err(EntryError::Summary(SummaryError::Auth(reason))) => {
                    return Err(BatchError::Auth(reason));
                }
                Err(error) => {
                    tracing::warn!(entry = %name, kind = %error.kind(), "entry failed: {error}");
                    result.failures.push(EntryFailure {
                        entry_name: name,
                        error,
                    });
                }
            }
        }

        Ok(result)
    }

    async fn process_entry(
        &self,
        entry: RawEntry,
        credential: &str,
    ) -> Result<CandidateRecord, EntryError> {
        let RawEntry { bytes, format, .. } = entry;

        let text = self.extractor.extract(&bytes, format)?;
        drop(bytes);

        let raw = tokio::time::timeout(
            self.entry_timeout,
            self.client.request_summary(&text, credential),
        )
        .await
        .map_err(|_| EntryError::Summary(SummaryError::Timeout))??;

        Ok(normalizer::normalize(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::SummaryResult;
    use async_trait::async_trait;
    use std::io::Write;

    const REPLY: &str = r#"{"name":"Jane Doe","education":"","certification":[],"skills":["Go"],"email":"","contact_no":"","cgpa":null,"project1":{"name":"X","description":"Y"}}"#;

    struct StubExtractor {
        reply: String,
    }

    impl StubExtractor {
        fn with_reply(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
            })
        }
    }

    #[async_trait]
    impl StructuredExtractor for StubExtractor {
        async fn request_summary(&self, _text: &str, _credential: &str) -> SummaryResult<String> {
            Ok(self.reply.clone())
        }
    }

    struct FailingExtractor {
        error: fn() -> SummaryError,
    }

    #[async_trait]
    impl StructuredExtractor for FailingExtractor {
        async fn request_summary(&self, _text: &str, _credential: &str) -> SummaryResult<String> {
            Err((self.error)())
        }
    }

    struct SlowExtractor {
        delay: Duration,
    }

    #[async_trait]
    impl StructuredExtractor for SlowExtractor {
        async fn request_summary(&self, _text: &str, _credential: &str) -> SummaryResult<String> {
            tokio::time::sleep(self.delay).await;
            Ok(REPLY.to_string())
        }
    }

    fn docx_bytes(text: &str) -> Vec<u8> {
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document><w:body><w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:body></w:document>"
        );
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("word/document.xml", options).unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn pdf_bytes(text: &str) -> Vec<u8> {
        use lopdf::dictionary;
        use lopdf::{Document, Object, Stream};

        let mut doc = Document::with_version("1.4");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let content = format!("BT /F1 12 Tf 100 700 Td ({text}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        });
        if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(page_id) {
            dict.set("Parent", pages_id);
        }
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for (name, bytes) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_from_upload_resolution() {
        assert!(matches!(
            BatchInput::from_upload("resumes.zip", "application/zip", vec![]),
            Ok(BatchInput::Archive { .. })
        ));
        assert!(matches!(
            BatchInput::from_upload("cv.pdf", "application/pdf", vec![]),
            Ok(BatchInput::Document {
                format: DocumentFormat::Pdf,
                ..
            })
        ));
        // Extension rescues a generic content type.
        assert!(matches!(
            BatchInput::from_upload("cv.docx", "application/octet-stream", vec![]),
            Ok(BatchInput::Document {
                format: DocumentFormat::Docx,
                ..
            })
        ));
        assert!(matches!(
            BatchInput::from_upload("notes.txt", "text/plain", vec![]),
            Err(BatchError::UnsupportedFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_single_document_success() {
        let processor = BatchProcessor::new(StubExtractor::with_reply(REPLY));
        let input = BatchInput::Document {
            name: "cv.docx".into(),
            format: DocumentFormat::Docx,
            bytes: docx_bytes("Name: Jane Doe"),
        };

        let result = processor.process(input, "key").await.unwrap();

        assert_eq!(result.success_count(), 1);
        assert_eq!(result.failure_count(), 0);
        let record = &result.records[0];
        assert_eq!(record.skills, vec!["Go"]);
        assert_eq!(record.projects[0].name, "X");
        assert_eq!(record.projects[0].description, "Y");
        for slot in &record.projects[1..] {
            assert_eq!(slot.name, "");
            assert_eq!(slot.description, "");
        }
    }

    #[tokio::test]
    async fn test_single_pdf_success() {
        let processor = BatchProcessor::new(StubExtractor::with_reply(REPLY));
        let input = BatchInput::Document {
            name: "cv.pdf".into(),
            format: DocumentFormat::Pdf,
            bytes: pdf_bytes("Name: Jane Doe"),
        };

        let result = processor.process(input, "key").await.unwrap();

        assert_eq!(result.success_count(), 1);
        assert_eq!(result.failure_count(), 0);
        assert_eq!(result.records[0].name, "Jane Doe");
    }

    #[tokio::test]
    async fn test_single_document_failure_is_exclusive() {
        let processor = BatchProcessor::new(StubExtractor::with_reply(REPLY));
        let input = BatchInput::Document {
            name: "cv.pdf".into(),
            format: DocumentFormat::Pdf,
            bytes: b"not a pdf".to_vec(),
        };

        let result = processor.process(input, "key").await.unwrap();

        assert_eq!(result.success_count(), 0);
        assert_eq!(result.failure_count(), 1);
        assert_eq!(result.failures[0].kind(), ErrorKind::CorruptDocument);
    }

    #[tokio::test]
    async fn test_archive_skips_unsupported_entries() {
        let processor = BatchProcessor::new(StubExtractor::with_reply(REPLY));
        let bytes = build_zip(&[
            ("jane.docx", docx_bytes("Jane").as_slice()),
            ("notes.txt", b"plain text"),
        ]);

        let result = processor
            .process(
                BatchInput::Archive {
                    name: "batch.zip".into(),
                    bytes,
                },
                "key",
            )
            .await
            .unwrap();

        assert_eq!(result.success_count(), 1);
        assert_eq!(result.failure_count(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_isolated() {
        let processor = BatchProcessor::new(StubExtractor::with_reply(REPLY));
        let bytes = build_zip(&[
            ("good.docx", docx_bytes("Jane").as_slice()),
            ("bad.pdf", b"not a pdf"),
        ]);

        let result = processor
            .process(
                BatchInput::Archive {
                    name: "batch.zip".into(),
                    bytes,
                },
                "key",
            )
            .await
            .unwrap();

        assert_eq!(result.success_count(), 1);
        assert_eq!(result.failure_count(), 1);
        assert_eq!(result.failures[0].entry_name, "bad.pdf");
        assert_eq!(result.failures[0].kind(), ErrorKind::CorruptDocument);
    }

    #[tokio::test]
    async fn test_malformed_reply_does_not_stop_the_batch() {
        struct AlternatingExtractor {
            calls: std::sync::Mutex<usize>,
        }

        #[async_trait]
        impl StructuredExtractor for AlternatingExtractor {
            async fn request_summary(
                &self,
                _text: &str,
                _credential: &str,
            ) -> SummaryResult<String> {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                if *calls == 1 {
                    Ok("no json here".to_string())
                } else {
                    Ok(REPLY.to_string())
                }
            }
        }

        let processor = BatchProcessor::new(Arc::new(AlternatingExtractor {
            calls: std::sync::Mutex::new(0),
        }));
        let bytes = build_zip(&[
            ("first.docx", docx_bytes("First").as_slice()),
            ("second.docx", docx_bytes("Second").as_slice()),
        ]);

        let result = processor
            .process(
                BatchInput::Archive {
                    name: "batch.zip".into(),
                    bytes,
                },
                "key",
            )
            .await
            .unwrap();

        assert_eq!(result.success_count(), 1);
        assert_eq!(result.failure_count(), 1);
        assert_eq!(result.failures[0].entry_name, "first.docx");
        assert_eq!(result.failures[0].kind(), ErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_isolated() {
        let processor = BatchProcessor::new(Arc::new(FailingExtractor {
            error: || SummaryError::Upstream("service unavailable".into()),
        }));
        let input = BatchInput::Document {
            name: "cv.docx".into(),
            format: DocumentFormat::Docx,
            bytes: docx_bytes("Jane"),
        };

        let result = processor.process(input, "key").await.unwrap();

        assert_eq!(result.failure_count(), 1);
        assert_eq!(result.failures[0].kind(), ErrorKind::UpstreamFailure);
    }

    #[tokio::test]
    async fn test_auth_failure_aborts_the_request() {
        let processor = BatchProcessor::new(Arc::new(FailingExtractor {
            error: || SummaryError::Auth("bad key".into()),
        }));
        let bytes = build_zip(&[("jane.docx", docx_bytes("Jane").as_slice())]);

        let result = processor
            .process(
                BatchInput::Archive {
                    name: "batch.zip".into(),
                    bytes,
                },
                "bad-key",
            )
            .await;

        assert!(matches!(result, Err(BatchError::Auth(_))));
    }

    #[tokio::test]
    async fn test_hung_upstream_call_times_out_per_entry() {
        let processor = BatchProcessor::new(Arc::new(SlowExtractor {
            delay: Duration::from_millis(500),
        }))
        .with_entry_timeout(Duration::from_millis(20));
        let input = BatchInput::Document {
            name: "cv.docx".into(),
            format: DocumentFormat::Docx,
            bytes: docx_bytes("Jane"),
        };

        let result = processor.process(input, "key").await.unwrap();

        assert_eq!(result.failure_count(), 1);
        assert_eq!(result.failures[0].kind(), ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_unreadable_container_fails_the_batch() {
        let processor = BatchProcessor::new(StubExtractor::with_reply(REPLY));

        let result = processor
            .process(
                BatchInput::Archive {
                    name: "batch.zip".into(),
                    bytes: b"not a zip".to_vec(),
                },
                "key",
            )
            .await;

        assert!(matches!(result, Err(BatchError::Unreadable(_))));
    }

    #[tokio::test]
    async fn test_empty_archive_is_an_empty_batch() {
        let processor = BatchProcessor::new(StubExtractor::with_reply(REPLY));
        let bytes = build_zip(&[]);

        let result = processor
            .process(
                BatchInput::Archive {
                    name: "batch.zip".into(),
                    bytes,
                },
                "key",
            )
            .await
            .unwrap();

        assert_eq!(result.success_count(), 0);
        assert_eq!(result.failure_count(), 0);
    }
}
