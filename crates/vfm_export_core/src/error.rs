use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedInput,
    Encoding,
    Archive,
    Publish,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MalformedInput => "malformed_input",
            Self::Encoding => "encoding_error",
            Self::Archive => "archive_error",
            Self::Publish => "publish_error",
        }
    }
}

/// Failure of one export pipeline stage.
///
/// The message is what ends up in the `error` field of the failure body, so it
/// should read well on its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("shapefile encoding failed: {0}")]
    EncodingError(String),
    #[error("archive creation failed: {0}")]
    ArchiveError(String),
    #[error("publish failed: {0}")]
    PublishError(String),
}

impl ExportError {
    pub fn malformed_input(message: impl Into<String>) -> Self {
        Self::MalformedInput(message.into())
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        Self::EncodingError(message.into())
    }

    pub fn archive(message: impl Into<String>) -> Self {
        Self::ArchiveError(message.into())
    }

    pub fn publish(message: impl Into<String>) -> Self {
        Self::PublishError(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedInput(_) => ErrorKind::MalformedInput,
            Self::EncodingError(_) => ErrorKind::Encoding,
            Self::ArchiveError(_) => ErrorKind::Archive,
            Self::PublishError(_) => ErrorKind::Publish,
        }
    }

    /// HTTP status reported for this failure.
    ///
    /// Every kind currently collapses to 500; callers tell causes apart by
    /// `kind()` rather than by status.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::MalformedInput
            | ErrorKind::Encoding
            | ErrorKind::Archive
            | ErrorKind::Publish => 500,
        }
    }
}
