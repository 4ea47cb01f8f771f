use std::io::Read;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Corrupt document: {0}")]
    CorruptDocument(String),
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// Document formats the pipeline accepts. Anything else is rejected
/// before extraction is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "application/pdf" => Some(Self::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Docx)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait TextExtractor: Send + Sync {
    fn supported_formats(&self) -> &[DocumentFormat];

    fn supports(&self, format: DocumentFormat) -> bool {
        self.supported_formats().contains(&format)
    }

    /// Extract the plain text content of one document. An empty but
    /// parseable document yields an empty string, not an error.
    fn extract(&self, bytes: &[u8], format: DocumentFormat) -> ExtractionResult<String>;
}

pub struct PdfTextExtractor;

impl PdfTextExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor for PdfTextExtractor {
    fn supported_formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::Pdf]
    }

    fn extract(&self, bytes: &[u8], _format: DocumentFormat) -> ExtractionResult<String> {
        pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ExtractionError::CorruptDocument(e.to_string()))
    }
}

/// Pulls paragraph text out of the `word/document.xml` part of a DOCX
/// package, discarding all styling and structure.
pub struct DocxTextExtractor {
    text_run: regex::Regex,
}

impl DocxTextExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            text_run: regex::Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>")?,
        })
    }

    fn document_text(&self, xml: &str) -> String {
        let mut lines = Vec::new();

        for paragraph in xml.split("</w:p>") {
            let mut line = String::new();
            for run in self.text_run.captures_iter(paragraph) {
                line.push_str(&unescape_xml(&run[1]));
            }
            if !line.is_empty() {
                lines.push(line);
            }
        }

        lines.join("\n")
    }
}

impl TextExtractor for DocxTextExtractor {
    fn supported_formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::Docx]
    }

    fn extract(&self, bytes: &[u8], _format: DocumentFormat) -> ExtractionResult<String> {
        let cursor = std::io::Cursor::new(bytes);
        let mut package = zip::ZipArchive::new(cursor)
            .map_err(|e| ExtractionError::CorruptDocument(format!("not a DOCX package: {e}")))?;

        let mut part = package.by_name("word/document.xml").map_err(|e| {
            ExtractionError::CorruptDocument(format!("missing word/document.xml: {e}"))
        })?;

        let mut xml = String::new();
        part.read_to_string(&mut xml)
            .map_err(|e| ExtractionError::CorruptDocument(e.to_string()))?;

        Ok(self.document_text(&xml))
    }
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Dispatches to the extractor that handles a given format; declared
/// formats nothing handles fail fast without touching the bytes.
pub struct CompositeTextExtractor {
    extractors: Vec<Box<dyn TextExtractor>>,
}

impl CompositeTextExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Box<dyn TextExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    fn find_extractor(&self, format: DocumentFormat) -> Option<&dyn TextExtractor> {
        self.extractors
            .iter()
            .find(|e| e.supports(format))
            .map(|e| e.as_ref())
    }
}

impl Default for CompositeTextExtractor {
    fn default() -> Self {
        let mut composite = Self::new().with_extractor(Box::new(PdfTextExtractor::new()));
        if let Ok(docx) = DocxTextExtractor::new() {
            composite.extractors.push(Box::new(docx));
        }
        composite
    }
}

impl TextExtractor for CompositeTextExtractor {
    fn supported_formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::Pdf, DocumentFormat::Docx]
    }

    fn supports(&self, format: DocumentFormat) -> bool {
        self.find_extractor(format).is_some()
    }

    fn extract(&self, bytes: &[u8], format: DocumentFormat) -> ExtractionResult<String> {
        let extractor = self
            .find_extractor(format)
            .ok_or_else(|| ExtractionError::UnsupportedFormat(format.to_string()))?;

        extractor.extract(bytes, format)
    }
}
