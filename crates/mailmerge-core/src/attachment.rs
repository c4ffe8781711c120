//! Building attachment parts.

use crate::context::DataContext;
use crate::diagnostic::Findings;
use crate::placeholder::{PlaceholderResolver, ResolveOptions};
use crate::template::Template;
use mailmerge_mime::{Leaf, PartContent, PartEncoder};
use tracing::debug;

/// Turns the file, stream and string attachments of a template into leaves.
///
/// Output order is all file attachments, then all stream attachments,
/// then all string attachments, each in template order.
pub struct AttachmentPartBuilder<'a, R: ?Sized, E: ?Sized> {
    resolver: &'a R,
    encoder: &'a E,
    options: ResolveOptions<'a>,
}

impl<'a, R, E> AttachmentPartBuilder<'a, R, E>
where
    R: PlaceholderResolver + ?Sized,
    E: PartEncoder + ?Sized,
{
    /// Creates a builder.
    #[must_use]
    pub const fn new(resolver: &'a R, encoder: &'a E, options: ResolveOptions<'a>) -> Self {
        Self {
            resolver,
            encoder,
            options,
        }
    }

    /// Builds the attachment leaves of `template`.
    ///
    /// # Errors
    ///
    /// Returns an error if content cannot be encoded or a stream cannot be
    /// read. Missing or unreadable files are recorded in `findings` and
    /// skipped.
    pub fn build(
        &self,
        template: &Template,
        context: &dyn DataContext,
        findings: &mut Findings,
    ) -> mailmerge_mime::Result<Vec<Leaf>> {
        let settings = &template.settings;
        let mut parts = Vec::new();

        for attachment in &template.file_attachments {
            let path = self.resolve(&attachment.path, context, findings);
            let path = settings.resolve_path(path);
            let mut display_name = self.resolve(&attachment.display_name, context, findings);
            if display_name.is_empty() {
                display_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
            }

            match self.encoder.encode_part(
                PartContent::File(&path),
                &display_name,
                &attachment.mime_type,
                &settings.character_encoding,
                settings.binary_transfer_encoding,
            ) {
                Ok(leaf) => parts.push(leaf),
                Err(e) if e.is_read_failure() => findings.bad_attachment_file(path),
                Err(e) => return Err(e),
            }
        }

        for attachment in &template.stream_attachments {
            let display_name = self.resolve(&attachment.display_name, context, findings);
            let mut reader = attachment.source.open()?;
            parts.push(self.encoder.encode_part(
                PartContent::Reader(&mut reader),
                &display_name,
                &attachment.mime_type,
                &settings.character_encoding,
                settings.binary_transfer_encoding,
            )?);
        }

        for attachment in &template.string_attachments {
            let display_name = self.resolve(&attachment.display_name, context, findings);
            parts.push(self.encoder.encode_part(
                PartContent::Text(&attachment.content),
                &display_name,
                &attachment.mime_type,
                &settings.character_encoding,
                settings.text_transfer_encoding,
            )?);
        }

        debug!(count = parts.len(), "built attachments");
        Ok(parts)
    }

    fn resolve(&self, text: &str, context: &dyn DataContext, findings: &mut Findings) -> String {
        let resolution = self.resolver.resolve(text, context, &self.options);
        findings.record(&resolution);
        resolution.text
    }
}
