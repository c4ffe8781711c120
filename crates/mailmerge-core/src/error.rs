//! Error types for message assembly.

use crate::diagnostic::Diagnostic;
use crate::merge::MergedMessage;
use std::fmt;
use thiserror::Error;

/// Aggregate failure of one assembly.
///
/// Carries every diagnostic found across all stages and the message as far
/// as it was built. The message is for inspection only and must not be sent.
#[derive(Debug, Clone)]
pub struct MergeFailure {
    /// Every problem found, one entry per kind.
    pub diagnostics: Vec<Diagnostic>,
    /// The partially assembled message.
    pub partial: MergedMessage,
}

impl fmt::Display for MergeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.diagnostics.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

/// Errors that can occur while assembling a message.
#[derive(Debug, Error)]
pub enum Error {
    /// Validation found one or more problems.
    #[error("Mail merge failed: {0}")]
    Merge(Box<MergeFailure>),

    /// Content could not be encoded; assembly was aborted.
    #[error("Encoding error: {0}")]
    Encoding(#[from] mailmerge_mime::Error),

    /// Template definition could not be loaded.
    #[error("Template error: {0}")]
    Template(#[from] serde_json::Error),

    /// HTML could not be converted to plain text.
    #[error("HTML conversion error: {0}")]
    HtmlConversion(String),
}

impl Error {
    /// Returns the diagnostics of an aggregate failure.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Merge(failure) => &failure.diagnostics,
            _ => &[],
        }
    }

    /// Returns the partially assembled message of an aggregate failure.
    #[must_use]
    pub fn partial_message(&self) -> Option<&MergedMessage> {
        match self {
            Self::Merge(failure) => Some(&failure.partial),
            _ => None,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
