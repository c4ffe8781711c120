//! Resolving template addresses into header fields.

use crate::context::DataContext;
use crate::diagnostic::Findings;
use crate::placeholder::{EmptyRender, PlaceholderResolver, ResolveOptions};
use crate::template::{AddressEntry, AddressRole};
use mailmerge_mime::{Address, Headers, Mailbox, encoding};
use tracing::debug;

/// Vendor header asking for a read confirmation.
pub const CONFIRM_READING_TO: &str = "X-Confirm-Reading-To";
/// Standard read-confirmation header (RFC 8098).
pub const DISPOSITION_NOTIFICATION_TO: &str = "Disposition-Notification-To";
/// Delivery receipt header.
pub const RETURN_RECEIPT_TO: &str = "Return-Receipt-To";

/// Address and header fields of a merged message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFields {
    /// Authors.
    pub from: Vec<Mailbox>,
    /// Sending agent.
    pub sender: Option<Mailbox>,
    /// Primary recipients.
    pub to: Vec<Mailbox>,
    /// Carbon copy recipients.
    pub cc: Vec<Mailbox>,
    /// Blind carbon copy recipients.
    pub bcc: Vec<Mailbox>,
    /// Reply addresses.
    pub reply_to: Vec<Mailbox>,
    /// Other headers (custom, notification and informational).
    pub headers: Headers,
}

impl HeaderFields {
    /// Creates fields carrying the given extra headers.
    #[must_use]
    pub fn with_headers(headers: Headers) -> Self {
        Self {
            headers,
            ..Self::default()
        }
    }

    /// Clears every address role, keeping the extra headers.
    pub fn clear_roles(&mut self) {
        self.from.clear();
        self.sender = None;
        self.to.clear();
        self.cc.clear();
        self.bcc.clear();
        self.reply_to.clear();
    }

    /// Returns true if there is no To, Cc or Bcc recipient.
    #[must_use]
    pub fn has_no_recipients(&self) -> bool {
        self.to.is_empty() && self.cc.is_empty() && self.bcc.is_empty()
    }

    /// Every recipient address (To, Cc, Bcc) in that order.
    #[must_use]
    pub fn recipients(&self) -> Vec<&Address> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(|m| &m.address)
            .collect()
    }
}

/// Replacement applied to every resolved address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RecipientOverride {
    /// Addresses are used as resolved.
    #[default]
    None,
    /// Every address is replaced by this one; display names are kept.
    TestAddress(String),
}

impl RecipientOverride {
    /// Builds the override from the first `TestAddress` entry, if any.
    ///
    /// The test address itself is resolved like any other address.
    #[must_use]
    pub fn from_entries<R: PlaceholderResolver + ?Sized>(
        entries: &[AddressEntry],
        resolver: &R,
        context: &dyn DataContext,
        options: &ResolveOptions<'_>,
        findings: &mut Findings,
    ) -> Self {
        entries
            .iter()
            .find(|e| e.role == AddressRole::TestAddress)
            .map_or(Self::None, |entry| {
                let resolution = resolver.resolve(
                    &entry.address,
                    context,
                    &options.with_empty_render(EmptyRender::Blank),
                );
                findings.record(&resolution);
                debug!(address = %resolution.text, "test address active");
                Self::TestAddress(resolution.text.trim().to_string())
            })
    }

    /// Returns the address to use in place of `resolved`.
    #[must_use]
    pub fn apply<'a>(&'a self, resolved: &'a str) -> &'a str {
        match self {
            Self::None => resolved,
            Self::TestAddress(address) => address,
        }
    }
}

/// Resolves typed address entries into [`HeaderFields`].
///
/// Never fails: bad addresses are recorded and skipped.
pub struct AddressResolver<'a, R: PlaceholderResolver + ?Sized> {
    resolver: &'a R,
    options: ResolveOptions<'a>,
    recipient_override: RecipientOverride,
    ignore_empty_recipients: bool,
}

impl<'a, R: PlaceholderResolver + ?Sized> AddressResolver<'a, R> {
    /// Creates a resolver. Placeholders always render blank when unresolved.
    #[must_use]
    pub fn new(
        resolver: &'a R,
        options: ResolveOptions<'a>,
        recipient_override: RecipientOverride,
        ignore_empty_recipients: bool,
    ) -> Self {
        Self {
            resolver,
            options: options.with_empty_render(EmptyRender::Blank),
            recipient_override,
            ignore_empty_recipients,
        }
    }

    /// Resolves `entries` in order into `fields`.
    ///
    /// Address roles of `fields` are cleared first; extra headers are kept
    /// and updated by the notification roles.
    pub fn resolve_into(
        &self,
        entries: &[AddressEntry],
        context: &dyn DataContext,
        fields: &mut HeaderFields,
        findings: &mut Findings,
    ) {
        fields.clear_roles();

        for entry in entries {
            if entry.role == AddressRole::TestAddress {
                continue;
            }

            let address = self.resolver.resolve(&entry.address, context, &self.options);
            let name = self.resolver.resolve(&entry.display_name, context, &self.options);
            findings.record(&address);
            findings.record(&name);

            let address_text = self.recipient_override.apply(address.text.trim());
            if address_text.is_empty() && self.ignore_empty_recipients {
                debug!(role = %entry.role, "skipping empty address");
                continue;
            }

            let Some(mailbox) = Self::build_mailbox(entry, address_text, &name.text, findings)
            else {
                continue;
            };
            Self::route(entry.role, mailbox, fields);
        }

        debug!(
            to = fields.to.len(),
            cc = fields.cc.len(),
            bcc = fields.bcc.len(),
            from = fields.from.len(),
            "resolved addresses"
        );
    }

    fn build_mailbox(
        entry: &AddressEntry,
        address: &str,
        name: &str,
        findings: &mut Findings,
    ) -> Option<Mailbox> {
        if encoding::charset(&entry.display_name_charset).is_err() {
            findings.bad_address(format!(
                "{address} (unknown charset {})",
                entry.display_name_charset
            ));
            return None;
        }

        match Mailbox::with_name(name.trim(), address) {
            Ok(mailbox) => Some(mailbox.with_name_charset(entry.display_name_charset.as_str())),
            Err(_) if address.is_empty() => {
                findings.bad_address(format!("{} (empty)", entry.address));
                None
            }
            Err(_) => {
                findings.bad_address(address);
                None
            }
        }
    }

    fn route(role: AddressRole, mailbox: Mailbox, fields: &mut HeaderFields) {
        match role {
            AddressRole::To => fields.to.push(mailbox),
            AddressRole::Cc => fields.cc.push(mailbox),
            AddressRole::Bcc => fields.bcc.push(mailbox),
            AddressRole::ReplyTo => fields.reply_to.push(mailbox),
            AddressRole::From => fields.from.push(mailbox),
            AddressRole::Sender => fields.sender = Some(mailbox),
            AddressRole::ConfirmReadingTo => {
                fields.headers.remove(CONFIRM_READING_TO);
                fields.headers.remove(DISPOSITION_NOTIFICATION_TO);
                fields
                    .headers
                    .add(CONFIRM_READING_TO, mailbox.address.as_str());
                fields
                    .headers
                    .add(DISPOSITION_NOTIFICATION_TO, mailbox.address.as_str());
            }
            AddressRole::ReturnReceiptTo => {
                fields.headers.set(RETURN_RECEIPT_TO, mailbox.address.as_str());
            }
            AddressRole::TestAddress => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::placeholder::TemplateResolver;
    use serde_json::json;
    use std::path::Path;

    fn options() -> ResolveOptions<'static> {
        ResolveOptions {
            empty_render: EmptyRender::KeepPlaceholder,
            base_dir: Path::new(""),
            culture: "en",
        }
    }

    fn resolve(
        entries: &[AddressEntry],
        context: &serde_json::Value,
        ignore_empty: bool,
    ) -> (HeaderFields, Findings) {
        let mut findings = Findings::default();
        let recipient_override = RecipientOverride::from_entries(
            entries,
            &TemplateResolver,
            context,
            &options(),
            &mut findings,
        );
        let mut fields = HeaderFields::default();
        AddressResolver::new(&TemplateResolver, options(), recipient_override, ignore_empty)
            .resolve_into(entries, context, &mut fields, &mut findings);
        (fields, findings)
    }

    #[test]
    fn test_routes_roles() {
        let entries = vec![
            AddressEntry::new(AddressRole::From, "news@example.com").with_display_name("News"),
            AddressEntry::new(AddressRole::To, "{{email}}").with_display_name("{{name}}"),
            AddressEntry::new(AddressRole::Cc, "cc@example.com"),
            AddressEntry::new(AddressRole::Bcc, "bcc@example.com"),
            AddressEntry::new(AddressRole::ReplyTo, "reply@example.com"),
            AddressEntry::new(AddressRole::Sender, "first@example.com"),
            AddressEntry::new(AddressRole::Sender, "second@example.com"),
        ];
        let ctx = json!({"email": "ann@example.com", "name": "Ann"});
        let (fields, findings) = resolve(&entries, &ctx, false);

        assert!(findings.is_empty());
        assert_eq!(fields.from[0].name.as_deref(), Some("News"));
        assert_eq!(fields.to[0].address.as_str(), "ann@example.com");
        assert_eq!(fields.to[0].name.as_deref(), Some("Ann"));
        assert_eq!(fields.cc.len(), 1);
        assert_eq!(fields.bcc.len(), 1);
        assert_eq!(fields.reply_to.len(), 1);
        assert_eq!(
            fields.sender.as_ref().unwrap().address.as_str(),
            "second@example.com"
        );
        assert_eq!(fields.recipients().len(), 3);
    }

    #[test]
    fn test_test_address_overrides_address_only() {
        let entries = vec![
            AddressEntry::new(AddressRole::To, "alice@real.example").with_display_name("Alice"),
            AddressEntry::new(AddressRole::TestAddress, "qa@test.example")
                .with_display_name("QA"),
            AddressEntry::new(AddressRole::From, "boss@real.example"),
        ];
        let (fields, findings) = resolve(&entries, &json!({}), false);

        assert!(findings.is_empty());
        assert_eq!(fields.to[0].address.as_str(), "qa@test.example");
        assert_eq!(fields.to[0].name.as_deref(), Some("Alice"));
        assert_eq!(fields.from[0].address.as_str(), "qa@test.example");
        assert!(fields.from[0].name.is_none());
    }

    #[test]
    fn test_empty_address_skipped_or_reported() {
        let entries = vec![
            AddressEntry::new(AddressRole::To, "ann@example.com"),
            AddressEntry::new(AddressRole::Cc, "{{manager}}"),
        ];
        let ctx = json!({"manager": null});

        let (fields, findings) = resolve(&entries, &ctx, true);
        assert_eq!(fields.to.len(), 1);
        assert!(fields.cc.is_empty());
        assert!(findings.is_empty());

        let (fields, findings) = resolve(&entries, &ctx, false);
        assert!(fields.cc.is_empty());
        assert_eq!(findings.bad_addresses, vec!["{{manager}} (empty)"]);
    }

    #[test]
    fn test_bad_addresses_accumulate() {
        let entries = vec![
            AddressEntry::new(AddressRole::To, "not-an-address"),
            AddressEntry::new(AddressRole::To, "ok@example.com"),
            AddressEntry::new(AddressRole::Cc, "also bad@example.com"),
        ];
        let (fields, findings) = resolve(&entries, &json!({}), false);
        assert_eq!(fields.to.len(), 1);
        assert_eq!(
            findings.bad_addresses,
            vec!["not-an-address", "also bad@example.com"]
        );
    }

    #[test]
    fn test_unresolved_address_placeholder_renders_blank() {
        let entries = vec![AddressEntry::new(AddressRole::To, "{{missing}}")];
        let (fields, findings) = resolve(&entries, &json!({}), true);
        assert!(fields.to.is_empty());
        assert_eq!(findings.bad_variables, vec!["missing"]);
        assert!(findings.bad_addresses.is_empty());
    }

    #[test]
    fn test_notification_headers_replace_prior_values() {
        let mut headers = Headers::new();
        headers.add(DISPOSITION_NOTIFICATION_TO, "old@example.com");
        headers.add(RETURN_RECEIPT_TO, "old@example.com");
        let mut fields = HeaderFields::with_headers(headers);

        let entries = vec![
            AddressEntry::new(AddressRole::ConfirmReadingTo, "x@y.example"),
            AddressEntry::new(AddressRole::ReturnReceiptTo, "r@y.example"),
        ];
        let mut findings = Findings::default();
        let resolver =
            AddressResolver::new(&TemplateResolver, options(), RecipientOverride::None, false);
        resolver.resolve_into(&entries, &(), &mut fields, &mut findings);
        resolver.resolve_into(&entries, &(), &mut fields, &mut findings);

        assert_eq!(fields.headers.get_all(CONFIRM_READING_TO), vec!["x@y.example"]);
        assert_eq!(
            fields.headers.get_all(DISPOSITION_NOTIFICATION_TO),
            vec!["x@y.example"]
        );
        assert_eq!(fields.headers.get_all(RETURN_RECEIPT_TO), vec!["r@y.example"]);
    }

    #[test]
    fn test_unknown_display_name_charset_is_bad_address() {
        let entries = vec![
            AddressEntry::new(AddressRole::To, "ann@example.com")
                .with_display_name("Ann")
                .with_display_name_charset("x-martian"),
        ];
        let (fields, findings) = resolve(&entries, &json!({}), false);
        assert!(fields.to.is_empty());
        assert_eq!(findings.bad_addresses.len(), 1);
    }

    #[test]
    fn test_decode_only_display_name_charset_is_bad_address() {
        let entries = vec![
            AddressEntry::new(AddressRole::To, "ann@example.com")
                .with_display_name("Ann")
                .with_display_name_charset("utf-16"),
        ];
        let (fields, findings) = resolve(&entries, &json!({}), false);
        assert!(fields.to.is_empty());
        assert_eq!(
            findings.bad_addresses,
            vec!["ann@example.com (unknown charset utf-16)".to_string()]
        );
    }
}
