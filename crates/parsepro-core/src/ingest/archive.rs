use std::io::{Cursor, Read};
use std::path::Path;

use thiserror::Error;
use zip::ZipArchive;

use super::extractor::DocumentFormat;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Unreadable archive: {0}")]
    Unreadable(String),
    #[error("Failed to read archive entry {name}: {reason}")]
    Entry { name: String, reason: String },
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// One document-bearing unit of a batch: a standalone upload, or one
/// file inside an archive. Bytes live only for the entry's own run.
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub name: String,
    pub bytes: Vec<u8>,
    pub format: DocumentFormat,
}

/// Open an in-memory zip for expansion. The returned sequence is finite,
/// single-pass and not restartable; re-expanding requires a fresh call.
pub fn expand(bytes: Vec<u8>) -> ArchiveResult<ArchiveEntries> {
    let archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ArchiveError::Unreadable(e.to_string()))?;

    Ok(ArchiveEntries {
        archive,
        next_index: 0,
    })
}

/// Lazy walk over an archive's supported entries in stored order.
///
/// Directories, `__MACOSX` metadata and hidden files are skipped, as are
/// entries whose extension is not a supported document format. A corrupt
/// member yields an `Err` item without ending the walk.
pub struct ArchiveEntries {
    archive: ZipArchive<Cursor<Vec<u8>>>,
    next_index: usize,
}

impl Iterator for ArchiveEntries {
    type Item = ArchiveResult<RawEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_index < self.archive.len() {
            let index = self.next_index;
            self.next_index += 1;

            let mut entry = match self.archive.by_index(index) {
                Ok(entry) => entry,
                Err(e) => {
                    return Some(Err(ArchiveError::Entry {
                        name: format!("entry #{index}"),
                        reason: e.to_string(),
                    }))
                }
            };

            let path = entry.name().to_string();

            if entry.is_dir() || path.starts_with("__MACOSX") {
                continue;
            }

            let file_name = path.rsplit('/').next().unwrap_or(&path).to_string();
            if file_name.starts_with('.') {
                continue;
            }

            let Some(format) = format_from_name(&file_name) else {
                tracing::debug!(entry = %path, "skipping unsupported archive entry");
                continue;
            };

            let mut bytes = Vec::with_capacity(entry.size() as usize);
            if let Err(e) = entry.read_to_end(&mut bytes) {
                return Some(Err(ArchiveError::Entry {
                    name: path,
                    reason: e.to_string(),
                }));
            }

            return Some(Ok(RawEntry {
                name: path,
                bytes,
                format,
            }));
        }

        None
    }
}

fn format_from_name(name: &str) -> Option<DocumentFormat> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(DocumentFormat::from_extension)
}
