use serde::Serialize;

/// Classification of every failure the pipeline can report, whether it
/// aborts a whole request or only one entry of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedFormat,
    CorruptDocument,
    BatchUnreadable,
    AuthFailure,
    UpstreamFailure,
    Timeout,
    MalformedResponse,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat => "unsupported_format",
            Self::CorruptDocument => "corrupt_document",
            Self::BatchUnreadable => "batch_unreadable",
            Self::AuthFailure => "auth_failure",
            Self::UpstreamFailure => "upstream_failure",
            Self::Timeout => "timeout",
            Self::MalformedResponse => "malformed_response",
        }
    }

    /// Whether this kind aborts the whole request rather than a single entry.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat | Self::BatchUnreadable | Self::AuthFailure
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
