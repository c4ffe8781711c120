//! Composing the document tree and validating the outcome.

use crate::address::HeaderFields;
use crate::diagnostic::{Diagnostic, Findings};
use crate::template::{MergeSettings, Template};
use mailmerge_mime::{Leaf, MultipartKind, Part, PartContent, PartEncoder};
use tracing::debug;

/// Combines the body subtree and attachment leaves into the document root.
pub struct TreeComposer<'a, E: ?Sized> {
    encoder: &'a E,
}

impl<'a, E: PartEncoder + ?Sized> TreeComposer<'a, E> {
    /// Creates a composer using `encoder` for the empty fallback leaf.
    #[must_use]
    pub const fn new(encoder: &'a E) -> Self {
        Self { encoder }
    }

    /// Builds the root part.
    ///
    /// With attachments the root is `mixed` [body?, attachments...];
    /// otherwise it is the body, or an empty `text/plain` leaf.
    ///
    /// # Errors
    ///
    /// Returns an error if the empty fallback leaf cannot be encoded.
    pub fn compose(
        &self,
        body: Option<Part>,
        attachments: Vec<Leaf>,
        settings: &MergeSettings,
    ) -> mailmerge_mime::Result<Part> {
        if !attachments.is_empty() {
            let mut children = Vec::with_capacity(attachments.len() + 1);
            children.extend(body);
            children.extend(attachments.into_iter().map(Part::Leaf));
            debug!(children = children.len(), "composed mixed root");
            return Ok(Part::multipart(MultipartKind::Mixed, children));
        }

        match body {
            Some(body) => Ok(body),
            None => {
                debug!("composed empty fallback root");
                let leaf = self.encoder.encode_part(
                    PartContent::Text(""),
                    "",
                    "text/plain",
                    &settings.character_encoding,
                    settings.text_transfer_encoding,
                )?;
                Ok(Part::Leaf(leaf))
            }
        }
    }
}

/// Checks the assembled fields against the template and folds in the
/// problems collected by every stage.
///
/// Order: `NoRecipients`, `NoFrom`, `EmptyContent`, then one entry per
/// non-empty findings list.
#[must_use]
pub fn validate(template: &Template, fields: &HeaderFields, findings: &Findings) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    if fields.has_no_recipients() {
        diagnostics.push(Diagnostic::NoRecipients);
    }
    if fields.from.is_empty() {
        diagnostics.push(Diagnostic::NoFrom);
    }
    if template.is_empty() {
        diagnostics.push(Diagnostic::EmptyContent);
    }
    diagnostics.extend(findings.to_diagnostics());
    diagnostics
}
