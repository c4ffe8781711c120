//! Building the body subtree from the plain text and HTML templates.

use crate::context::DataContext;
use crate::diagnostic::Findings;
use crate::html::{extract_inline_resources, set_title};
use crate::placeholder::{PlaceholderResolver, ResolveOptions};
use crate::template::Template;
use mailmerge_mime::{Leaf, MultipartKind, Part, PartContent, PartEncoder};
use tracing::debug;

/// Builds the body subtree of a message.
///
/// - plain text only: a `text/plain` leaf
/// - HTML only: a `text/html` leaf, or `related` [html, inline...] when
///   the HTML references local files
/// - both: `alternative` [plain, html]
/// - neither: no body
pub struct TextPartBuilder<'a, R: ?Sized, E: ?Sized> {
    resolver: &'a R,
    encoder: &'a E,
    options: ResolveOptions<'a>,
}

impl<'a, R, E> TextPartBuilder<'a, R, E>
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

    /// Builds the body for `template`, given its already resolved subject.
    ///
    /// # Errors
    ///
    /// Returns an error if text cannot be encoded. Missing inline files and
    /// unresolved placeholders are recorded in `findings` instead.
    pub fn build(
        &self,
        template: &Template,
        subject: &str,
        context: &dyn DataContext,
        findings: &mut Findings,
    ) -> mailmerge_mime::Result<Option<Part>> {
        let plain = if template.plain_text.is_empty() {
            None
        } else {
            Some(self.plain_part(template, context, findings)?)
        };
        let html = if template.html_text.is_empty() {
            None
        } else {
            Some(self.html_part(template, subject, context, findings)?)
        };

        let body = match (plain, html) {
            (None, None) => None,
            (Some(plain), None) => Some(Part::Leaf(plain)),
            (None, Some(html)) => Some(html),
            (Some(plain), Some(html)) => Some(Part::multipart(
                MultipartKind::Alternative,
                vec![Part::Leaf(plain), html],
            )),
        };
        debug!(kind = ?body.as_ref().map(Part::kind), "built body");
        Ok(body)
    }

    fn plain_part(
        &self,
        template: &Template,
        context: &dyn DataContext,
        findings: &mut Findings,
    ) -> mailmerge_mime::Result<Leaf> {
        let resolution = self
            .resolver
            .resolve(&template.plain_text, context, &self.options);
        findings.record(&resolution);
        self.text_leaf(&resolution.text, "text/plain", template)
    }

    fn html_part(
        &self,
        template: &Template,
        subject: &str,
        context: &dyn DataContext,
        findings: &mut Findings,
    ) -> mailmerge_mime::Result<Part> {
        let settings = &template.settings;
        let resolution = self
            .resolver
            .resolve(&template.html_text, context, &self.options);
        findings.record(&resolution);

        let html = set_title(&resolution.text, subject);
        let mut inline = extract_inline_resources(
            &html,
            &settings.base_dir,
            self.encoder,
            &settings.character_encoding,
            settings.binary_transfer_encoding,
            findings,
        )?;

        for registered in &template.inline_attachments {
            if inline.contains(&registered.content_id) {
                continue;
            }
            let path_resolution = self.resolver.resolve(&registered.path, context, &self.options);
            findings.record(&path_resolution);
            let path = settings.resolve_path(&path_resolution.text);
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            match self.encoder.encode_part(
                PartContent::File(&path),
                &file_name,
                &registered.mime_type,
                &settings.character_encoding,
                settings.binary_transfer_encoding,
            ) {
                Ok(mut leaf) => {
                    leaf.make_inline(&registered.content_id);
                    inline.parts.push(leaf);
                }
                Err(e) if e.is_read_failure() => findings.bad_inline_file(path),
                Err(e) => return Err(e),
            }
        }

        let html_leaf = self.text_leaf(&inline.html, "text/html", template)?;
        if inline.parts.is_empty() {
            return Ok(Part::Leaf(html_leaf));
        }

        let mut children = Vec::with_capacity(inline.parts.len() + 1);
        children.push(Part::Leaf(html_leaf));
        children.extend(inline.parts.into_iter().map(Part::Leaf));
        Ok(Part::multipart(MultipartKind::Related, children))
    }

    fn text_leaf(
        &self,
        text: &str,
        mime_type: &str,
        template: &Template,
    ) -> mailmerge_mime::Result<Leaf> {
        self.encoder.encode_part(
            PartContent::Text(text),
            "",
            mime_type,
            &template.settings.character_encoding,
            template.settings.text_transfer_encoding,
        )
    }
}
