//! Error types for MIME operations.

use std::io;
use std::path::PathBuf;
use std::string::FromUtf8Error;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid MIME header.
    #[error("Invalid MIME header: {0}")]
    InvalidHeader(String),

    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Invalid encoding.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Character set label not known to the encoder.
    #[error("Unsupported character set: {0}")]
    UnsupportedCharset(String),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// UTF-8 decode error.
    #[error("UTF-8 decode error: {0}")]
    Utf8Decode(#[from] FromUtf8Error),

    /// File-backed content is missing or unreadable.
    #[error("Cannot read '{}': {source}", path.display())]
    FileRead {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// I/O error while reading streamed content.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Returns true if this is a missing or unreadable file.
    ///
    /// Callers may collect these and continue; every other variant means the
    /// content itself could not be encoded.
    #[must_use]
    pub const fn is_read_failure(&self) -> bool {
        matches!(self, Self::FileRead { .. })
    }

    pub(crate) fn file_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_failure_classification() {
        let missing = Error::file_read(
            "/nope/report.pdf",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(missing.is_read_failure());
        assert!(missing.to_string().contains("/nope/report.pdf"));

        let stream = Error::Io(io::Error::other("broken pipe"));
        assert!(!stream.is_read_failure());
        assert!(!Error::UnsupportedCharset("x-klingon".into()).is_read_failure());
    }
}
