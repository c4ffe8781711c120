//! Running the full assembly sequence for a template.

use crate::address::{AddressResolver, HeaderFields, RecipientOverride};
use crate::attachment::AttachmentPartBuilder;
use crate::compose::{TreeComposer, validate};
use crate::context::DataContext;
use crate::diagnostic::{Diagnostic, Findings};
use crate::error::{Error, MergeFailure, Result};
use crate::placeholder::{EmptyRender, PlaceholderResolver, ResolveOptions, TemplateResolver};
use crate::template::Template;
use crate::text::TextPartBuilder;
use chrono::{DateTime, FixedOffset, Local};
use mailmerge_mime::{Address, Headers, Mailbox, MimeEncoder, Part, PartEncoder};
use std::fmt::Write;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, error, info_span};

/// A message produced by one assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedMessage {
    subject: String,
    fields: HeaderFields,
    root: Part,
    charset: String,
}

impl MergedMessage {
    /// Resolved subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Address fields and extra headers.
    #[must_use]
    pub const fn fields(&self) -> &HeaderFields {
        &self.fields
    }

    /// Root of the document tree.
    #[must_use]
    pub const fn root(&self) -> &Part {
        &self.root
    }

    /// Character set used for encoded headers.
    #[must_use]
    pub fn charset(&self) -> &str {
        &self.charset
    }

    /// Addresses the message must be delivered to (To, Cc, Bcc).
    #[must_use]
    pub fn envelope_recipients(&self) -> Vec<&Address> {
        self.fields.recipients()
    }

    /// Renders the message with the current local time as `Date`.
    ///
    /// # Errors
    ///
    /// Returns an error if a header cannot be encoded.
    pub fn to_bytes(&self) -> mailmerge_mime::Result<Vec<u8>> {
        self.to_bytes_at(Local::now().fixed_offset())
    }

    /// Renders the message with the given `Date`.
    ///
    /// Bcc recipients are not rendered.
    ///
    /// # Errors
    ///
    /// Returns an error if a header cannot be encoded.
    pub fn to_bytes_at(&self, date: DateTime<FixedOffset>) -> mailmerge_mime::Result<Vec<u8>> {
        let mut head = String::new();

        let _ = write!(head, "Date: {}\r\n", date.to_rfc2822());
        if !self.fields.from.is_empty() {
            let _ = write!(head, "From: {}\r\n", mailbox_list(&self.fields.from)?);
        }
        if let Some(sender) = &self.fields.sender {
            let _ = write!(head, "Sender: {}\r\n", sender.to_header_value()?);
        }
        if !self.fields.to.is_empty() {
            let _ = write!(head, "To: {}\r\n", mailbox_list(&self.fields.to)?);
        }
        if !self.fields.cc.is_empty() {
            let _ = write!(head, "Cc: {}\r\n", mailbox_list(&self.fields.cc)?);
        }
        if !self.fields.reply_to.is_empty() {
            let _ = write!(head, "Reply-To: {}\r\n", mailbox_list(&self.fields.reply_to)?);
        }
        let _ = write!(
            head,
            "Subject: {}\r\n",
            Headers::encode_value(&self.subject, &self.charset)?
        );
        head.push_str("MIME-Version: 1.0\r\n");
        head.push_str(&self.fields.headers.to_string());

        let mut out = head.into_bytes();
        self.root.write_to(&mut out);
        Ok(out)
    }

    /// Renders the message as RFC 5322 text.
    ///
    /// # Errors
    ///
    /// Returns an error if a header cannot be encoded or an 8bit body is
    /// not valid UTF-8.
    pub fn to_rfc5322(&self) -> Result<String> {
        let bytes = self.to_bytes()?;
        String::from_utf8(bytes).map_err(|e| Error::Encoding(e.into()))
    }
}

fn mailbox_list(mailboxes: &[Mailbox]) -> mailmerge_mime::Result<String> {
    let values = mailboxes
        .iter()
        .map(Mailbox::to_header_value)
        .collect::<mailmerge_mime::Result<Vec<_>>>()?;
    Ok(values.join(", "))
}

/// Assembles messages from one template.
///
/// Calls on the same instance run one at a time; separate instances run
/// independently.
///
/// # Example
///
/// ```ignore
/// use mailmerge_core::{AddressEntry, AddressRole, MailMerge, Template};
/// use serde_json::json;
///
/// let template = Template::new()
///     .subject("Hello {{Name}}")
///     .plain_text("Hello {{Name}}")
///     .address(AddressEntry::new(AddressRole::From, "news@example.com"))
///     .address(AddressEntry::new(AddressRole::To, "{{Email}}").with_display_name("{{Name}}"));
///
/// let merge = MailMerge::new(template);
/// let message = merge.assemble(&json!({"Name": "Ann", "Email": "ann@example.com"}))?;
/// println!("{}", message.to_rfc5322()?);
/// ```
#[derive(Debug)]
pub struct MailMerge<R = TemplateResolver, E = MimeEncoder> {
    template: Template,
    resolver: R,
    encoder: E,
    last_run: Mutex<Vec<Diagnostic>>,
}

impl MailMerge {
    /// Creates a merge with the default resolver and encoder.
    #[must_use]
    pub fn new(template: Template) -> Self {
        Self::with_collaborators(template, TemplateResolver, MimeEncoder)
    }
}

impl<R: PlaceholderResolver, E: PartEncoder> MailMerge<R, E> {
    /// Creates a merge with a custom placeholder resolver and part encoder.
    #[must_use]
    pub const fn with_collaborators(template: Template, resolver: R, encoder: E) -> Self {
        Self {
            template,
            resolver,
            encoder,
            last_run: Mutex::new(Vec::new()),
        }
    }

    /// The template being merged.
    #[must_use]
    pub const fn template(&self) -> &Template {
        &self.template
    }

    /// Diagnostics of the most recent assembly on this instance.
    #[must_use]
    pub fn last_diagnostics(&self) -> Vec<Diagnostic> {
        self.last_run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Assembles one message for `context`.
    ///
    /// Every stage runs even when an earlier one found problems; the
    /// outcome is decided once at the end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Merge`] with every diagnostic and the partial
    /// message if validation fails, or [`Error::Encoding`] if content could
    /// not be encoded at all.
    pub fn assemble<C: DataContext + ?Sized>(&self, context: &C) -> Result<MergedMessage> {
        let span = info_span!("assemble", subject = %self.template.subject);
        let _enter = span.enter();

        let mut last_run = self.last_run.lock().unwrap_or_else(PoisonError::into_inner);
        last_run.clear();

        let context: &dyn DataContext = &context;
        let mut findings = Findings::default();
        let message = match self.build(context, &mut findings) {
            Ok(message) => message,
            Err(e) => {
                *last_run = findings.to_diagnostics();
                error!(error = %e, "assembly aborted");
                return Err(e.into());
            }
        };

        let diagnostics = validate(&self.template, &message.fields, &findings);
        *last_run = diagnostics.clone();
        if diagnostics.is_empty() {
            debug!("assembly succeeded");
            return Ok(message);
        }

        let failure = MergeFailure {
            diagnostics,
            partial: message,
        };
        error!(problems = %failure, "assembly failed");
        Err(Error::Merge(Box::new(failure)))
    }

    fn build(
        &self,
        context: &dyn DataContext,
        findings: &mut Findings,
    ) -> mailmerge_mime::Result<MergedMessage> {
        let template = &self.template;
        let settings = &template.settings;
        let options = ResolveOptions {
            empty_render: EmptyRender::KeepPlaceholder,
            base_dir: &settings.base_dir,
            culture: &settings.culture,
        };

        let subject = self.resolver.resolve(&template.subject, context, &options);
        findings.record(&subject);
        let subject = subject.text;

        let mut fields = HeaderFields::with_headers(self.extra_headers()?);
        let recipient_override = RecipientOverride::from_entries(
            &template.addresses,
            &self.resolver,
            context,
            &options,
            findings,
        );
        AddressResolver::new(
            &self.resolver,
            options,
            recipient_override,
            settings.ignore_empty_recipients,
        )
        .resolve_into(&template.addresses, context, &mut fields, findings);

        let body = TextPartBuilder::new(&self.resolver, &self.encoder, options)
            .build(template, &subject, context, findings)?;
        let attachments = AttachmentPartBuilder::new(&self.resolver, &self.encoder, options)
            .build(template, context, findings)?;
        let root = TreeComposer::new(&self.encoder).compose(body, attachments, settings)?;

        Ok(MergedMessage {
            subject,
            fields,
            root,
            charset: settings.character_encoding.clone(),
        })
    }

    fn extra_headers(&self) -> mailmerge_mime::Result<Headers> {
        let settings = &self.template.settings;
        let charset = &settings.character_encoding;
        let mut headers = Headers::new();

        for header in &self.template.headers {
            Headers::validate_name(&header.name)?;
            headers.add(
                header.name.as_str(),
                Headers::encode_value(&header.value, charset)?,
            );
        }
        if let Some(organization) = &settings.organization {
            headers.set("Organization", Headers::encode_value(organization, charset)?);
        }
        if let Some(priority) = settings.priority {
            headers.set("X-Priority", priority.header_value());
        }
        if let Some(mailer) = &settings.x_mailer {
            headers.set("X-Mailer", Headers::encode_value(mailer, charset)?);
        }
        Ok(headers)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::address::{CONFIRM_READING_TO, DISPOSITION_NOTIFICATION_TO};
    use crate::diagnostic::DiagnosticKind;
    use crate::template::{AddressEntry, AddressRole, MergeSettings, Priority};
    use serde_json::json;

    fn basic() -> Template {
        Template::new()
            .subject("Hello {{Name}}")
            .plain_text("Hi {{Name}}")
            .address(AddressEntry::new(AddressRole::From, "news@example.com").with_display_name("News"))
            .address(AddressEntry::new(AddressRole::To, "{{Email}}").with_display_name("{{Name}}"))
    }

    #[test]
    fn test_assemble_basic() {
        let merge = MailMerge::new(basic());
        let message = merge
            .assemble(&json!({"Name": "Ann", "Email": "ann@example.com"}))
            .unwrap();

        assert_eq!(message.subject(), "Hello Ann");
        assert_eq!(message.fields().to[0].name.as_deref(), Some("Ann"));
        assert_eq!(
            message.root().as_leaf().unwrap().body_text().unwrap(),
            "Hi Ann"
        );
        assert!(merge.last_diagnostics().is_empty());
    }

    #[test]
    fn test_all_problems_reported_together() {
        let template = Template::new()
            .plain_text("Hi {{Name}}")
            .address(AddressEntry::new(AddressRole::Cc, "not an address"));
        let merge = MailMerge::new(template);

        let err = merge.assemble(&json!({})).unwrap_err();
        let kinds: Vec<_> = err.diagnostics().iter().map(Diagnostic::kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::NoRecipients,
                DiagnosticKind::NoFrom,
                DiagnosticKind::BadAddress,
                DiagnosticKind::BadVariable
            ]
        );
        assert!(err.partial_message().is_some());
        assert_eq!(merge.last_diagnostics(), err.diagnostics());
    }

    #[test]
    fn test_diagnostics_reset_between_calls() {
        let merge = MailMerge::new(basic());
        assert!(merge.assemble(&json!({"Name": "Ann"})).is_err());
        assert!(!merge.last_diagnostics().is_empty());

        merge
            .assemble(&json!({"Name": "Bob", "Email": "bob@example.com"}))
            .unwrap();
        assert!(merge.last_diagnostics().is_empty());
    }

    #[test]
    fn test_invalid_custom_header_is_fatal() {
        let merge = MailMerge::new(basic().header("Bad Name", "x"));
        let err = merge
            .assemble(&json!({"Name": "Ann", "Email": "ann@example.com"}))
            .unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
        assert!(err.partial_message().is_none());
    }

    #[test]
    fn test_confirm_reading_replaces_template_header() {
        let template = basic()
            .header(CONFIRM_READING_TO, "old@example.com")
            .address(AddressEntry::new(AddressRole::ConfirmReadingTo, "x@y.example"));
        let merge = MailMerge::new(template);
        let context = json!({"Name": "Ann", "Email": "ann@example.com"});

        for _ in 0..2 {
            let message = merge.assemble(&context).unwrap();
            let headers = &message.fields().headers;
            assert_eq!(headers.get_all(CONFIRM_READING_TO), vec!["x@y.example"]);
            assert_eq!(
                headers.get_all(DISPOSITION_NOTIFICATION_TO),
                vec!["x@y.example"]
            );
        }
    }

    #[test]
    fn test_render_headers() {
        let template = basic()
            .address(AddressEntry::new(AddressRole::Bcc, "audit@example.com"))
            .header("X-Campaign", "spring")
            .settings(MergeSettings {
                organization: Some("Example Ltd".into()),
                priority: Some(Priority::High),
                ..MergeSettings::default()
            });
        let message = MailMerge::new(template)
            .assemble(&json!({"Name": "Ann", "Email": "ann@example.com"}))
            .unwrap();

        let date = DateTime::parse_from_rfc2822("Tue, 1 Jul 2025 10:00:00 +0200").unwrap();
        let text = String::from_utf8(message.to_bytes_at(date).unwrap()).unwrap();

        assert!(text.starts_with("Date: Tue, 1 Jul 2025 10:00:00 +0200\r\n"));
        assert!(text.contains("From: \"News\" <news@example.com>\r\n"));
        assert!(text.contains("To: \"Ann\" <ann@example.com>\r\n"));
        assert!(text.contains("Subject: Hello Ann\r\n"));
        assert!(text.contains("MIME-Version: 1.0\r\n"));
        assert!(text.contains("X-Campaign: spring\r\n"));
        assert!(text.contains("Organization: Example Ltd\r\n"));
        assert!(text.contains("X-Priority: 1 (Highest)\r\n"));
        assert!(text.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(!text.contains("audit@example.com"));

        let envelope: Vec<_> = message
            .envelope_recipients()
            .iter()
            .map(|a| a.as_str())
            .collect();
        assert_eq!(envelope, vec!["ann@example.com", "audit@example.com"]);
    }

    #[test]
    fn test_non_ascii_subject_is_encoded() {
        let message = MailMerge::new(basic().subject("Grüße {{Name}}"))
            .assemble(&json!({"Name": "Ann", "Email": "ann@example.com"}))
            .unwrap();
        let text = message.to_rfc5322().unwrap();
        assert!(text.contains("Subject: =?utf-8?"));
        assert!(!text.contains("Grüße"));
    }

    #[test]
    fn test_long_non_ascii_subject_folds_into_short_words() {
        let subject = "Größte Auswahl für Ihre Bürogeräte, jetzt über 40 % günstiger, {{Name}}";
        let message = MailMerge::new(basic().subject(subject))
            .assemble(&json!({"Name": "Ann", "Email": "ann@example.com"}))
            .unwrap();
        let text = message.to_rfc5322().unwrap();

        let start = text.find("Subject: ").unwrap();
        let end = start + text[start..].find("\r\nMIME-Version").unwrap();
        let words: Vec<&str> = text[start + "Subject: ".len()..end].split("\r\n ").collect();
        assert!(words.len() > 1);
        assert!(words.iter().all(|w| w.starts_with("=?utf-8?B?") && w.len() <= 75));
    }
}
