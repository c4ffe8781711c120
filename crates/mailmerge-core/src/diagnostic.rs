//! Problems collected while assembling a message.

use crate::placeholder::Resolution;
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

/// Kind of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// One or more addresses could not be built.
    BadAddress,
    /// One or more attachment files are missing or unreadable.
    BadAttachmentFile,
    /// One or more inline resources are missing or unreadable.
    BadInlineFile,
    /// One or more placeholders could not be resolved.
    BadVariable,
    /// Subject, bodies and attachments are all empty.
    EmptyContent,
    /// No To, Cc or Bcc recipient.
    NoRecipients,
    /// No From address.
    NoFrom,
}

/// A single problem found by the validator, listing every offending value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Addresses that could not be built.
    BadAddress(Vec<String>),
    /// Attachment files that are missing or unreadable.
    BadAttachmentFile(Vec<PathBuf>),
    /// Inline resources that are missing or unreadable.
    BadInlineFile(Vec<PathBuf>),
    /// Placeholder names that could not be resolved.
    BadVariable(Vec<String>),
    /// Subject, bodies and attachments are all empty.
    EmptyContent,
    /// No To, Cc or Bcc recipient.
    NoRecipients,
    /// No From address.
    NoFrom,
}

impl Diagnostic {
    /// Returns the kind of this diagnostic.
    #[must_use]
    pub const fn kind(&self) -> DiagnosticKind {
        match self {
            Self::BadAddress(_) => DiagnosticKind::BadAddress,
            Self::BadAttachmentFile(_) => DiagnosticKind::BadAttachmentFile,
            Self::BadInlineFile(_) => DiagnosticKind::BadInlineFile,
            Self::BadVariable(_) => DiagnosticKind::BadVariable,
            Self::EmptyContent => DiagnosticKind::EmptyContent,
            Self::NoRecipients => DiagnosticKind::NoRecipients,
            Self::NoFrom => DiagnosticKind::NoFrom,
        }
    }

    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::BadAddress(_) => "Bad email address",
            Self::BadAttachmentFile(_) => "Attachment file missing or unreadable",
            Self::BadInlineFile(_) => "Inline file missing or unreadable",
            Self::BadVariable(_) => "Unresolved placeholder",
            Self::EmptyContent => "Message has no subject, body or attachment",
            Self::NoRecipients => "Message has no recipient",
            Self::NoFrom => "Message has no From address",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())?;
        match self {
            Self::BadAddress(values) | Self::BadVariable(values) => {
                write!(f, ": {}", values.join(", "))
            }
            Self::BadAttachmentFile(paths) | Self::BadInlineFile(paths) => {
                let paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                write!(f, ": {}", paths.join(", "))
            }
            Self::EmptyContent | Self::NoRecipients | Self::NoFrom => Ok(()),
        }
    }
}

impl std::error::Error for Diagnostic {}

/// Per-call scratch lists filled by the assembly stages.
///
/// A fresh value is created for every assembly; stages only append.
/// Duplicate entries are dropped, keeping first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Findings {
    /// Addresses that failed to parse.
    pub bad_addresses: Vec<String>,
    /// Attachment files that could not be read.
    pub bad_attachment_files: Vec<PathBuf>,
    /// Inline resources that could not be read.
    pub bad_inline_files: Vec<PathBuf>,
    /// Placeholder names that did not resolve.
    pub bad_variables: Vec<String>,
}

impl Findings {
    /// Records an address that could not be built.
    pub fn bad_address(&mut self, value: impl Into<String>) {
        let value = value.into();
        warn!(address = %value, "bad address");
        push_unique(&mut self.bad_addresses, value);
    }

    /// Records a missing or unreadable attachment file.
    pub fn bad_attachment_file(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        warn!(path = %path.display(), "attachment file missing or unreadable");
        push_unique(&mut self.bad_attachment_files, path);
    }

    /// Records a missing or unreadable inline resource.
    pub fn bad_inline_file(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        warn!(path = %path.display(), "inline file missing or unreadable");
        push_unique(&mut self.bad_inline_files, path);
    }

    /// Folds the diagnostics of a placeholder resolution into the lists.
    ///
    /// Unresolved names count as bad variables; files the resolver could
    /// not include count as bad inline files.
    pub fn record(&mut self, resolution: &Resolution) {
        for name in &resolution.unresolved {
            warn!(placeholder = %name, "unresolved placeholder");
            push_unique(&mut self.bad_variables, name.clone());
        }
        for path in &resolution.unreadable_files {
            self.bad_inline_file(path.clone());
        }
    }

    /// Returns true if no stage reported a problem.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bad_addresses.is_empty()
            && self.bad_attachment_files.is_empty()
            && self.bad_inline_files.is_empty()
            && self.bad_variables.is_empty()
    }

    /// Summarizes every non-empty list as one diagnostic each.
    #[must_use]
    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        if !self.bad_addresses.is_empty() {
            diagnostics.push(Diagnostic::BadAddress(self.bad_addresses.clone()));
        }
        if !self.bad_attachment_files.is_empty() {
            diagnostics.push(Diagnostic::BadAttachmentFile(
                self.bad_attachment_files.clone(),
            ));
        }
        if !self.bad_inline_files.is_empty() {
            diagnostics.push(Diagnostic::BadInlineFile(self.bad_inline_files.clone()));
        }
        if !self.bad_variables.is_empty() {
            diagnostics.push(Diagnostic::BadVariable(self.bad_variables.clone()));
        }
        diagnostics
    }
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, value: T) {
    if !list.contains(&value) {
        list.push(value);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_findings_deduplicate() {
        let mut findings = Findings::default();
        findings.bad_address("nobody");
        findings.bad_address("nobody");
        findings.bad_address("other");
        assert_eq!(findings.bad_addresses, vec!["nobody", "other"]);
    }

    #[test]
    fn test_record_resolution() {
        let mut findings = Findings::default();
        findings.record(&Resolution {
            text: String::new(),
            unresolved: vec!["Name".into(), "Name".into()],
            unreadable_files: vec![PathBuf::from("/tmp/missing.txt")],
        });
        assert_eq!(findings.bad_variables, vec!["Name"]);
        assert_eq!(findings.bad_inline_files, vec![PathBuf::from("/tmp/missing.txt")]);
        assert!(!findings.is_empty());
    }

    #[test]
    fn test_to_diagnostics_one_per_list() {
        let mut findings = Findings::default();
        assert!(findings.to_diagnostics().is_empty());

        findings.bad_attachment_file("/a.pdf");
        findings.bad_attachment_file("/b.pdf");
        findings.bad_address("x");
        let diagnostics = findings.to_diagnostics();
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0], Diagnostic::BadAddress(vec!["x".into()]));
        assert_eq!(
            diagnostics[1],
            Diagnostic::BadAttachmentFile(vec!["/a.pdf".into(), "/b.pdf".into()])
        );
    }

    #[test]
    fn test_display_lists_values() {
        let diagnostic = Diagnostic::BadVariable(vec!["First".into(), "Last".into()]);
        assert_eq!(diagnostic.to_string(), "Unresolved placeholder: First, Last");
        assert_eq!(diagnostic.kind(), DiagnosticKind::BadVariable);
        assert_eq!(Diagnostic::NoFrom.to_string(), "Message has no From address");
    }
}
