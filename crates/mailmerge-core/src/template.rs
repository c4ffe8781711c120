//! Reusable message templates.

use crate::error::Result;
use crate::html::html_to_plain_text;
use crate::placeholder::join_path;
use mailmerge_mime::TransferEncoding;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn default_charset() -> String {
    "utf-8".to_string()
}

fn default_culture() -> String {
    "en".to_string()
}

const fn default_text_encoding() -> TransferEncoding {
    TransferEncoding::QuotedPrintable
}

const fn default_binary_encoding() -> TransferEncoding {
    TransferEncoding::Base64
}

/// Role an address plays in a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressRole {
    /// Primary recipient.
    To,
    /// Carbon copy recipient.
    Cc,
    /// Blind carbon copy recipient.
    Bcc,
    /// Address replies should go to.
    ReplyTo,
    /// Address that receives a read confirmation.
    ConfirmReadingTo,
    /// Address that receives a delivery receipt.
    ReturnReceiptTo,
    /// Agent that sent the message on behalf of From.
    Sender,
    /// Author.
    From,
    /// Replaces the address of every other entry, for test sends.
    TestAddress,
}

impl fmt::Display for AddressRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Typed address of a template. Address and display name may contain placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressEntry {
    /// Role of the address.
    pub role: AddressRole,
    /// Address text.
    pub address: String,
    /// Display name.
    #[serde(default)]
    pub display_name: String,
    /// Character set for encoding the display name.
    #[serde(default = "default_charset")]
    pub display_name_charset: String,
}

impl AddressEntry {
    /// Creates an entry without display name.
    #[must_use]
    pub fn new(role: AddressRole, address: impl Into<String>) -> Self {
        Self {
            role,
            address: address.into(),
            display_name: String::new(),
            display_name_charset: default_charset(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Sets the display name character set.
    #[must_use]
    pub fn with_display_name_charset(mut self, charset: impl Into<String>) -> Self {
        self.display_name_charset = charset.into();
        self
    }
}

/// Attachment read from a file. Path and display name may contain placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    /// Path, relative to the base directory unless absolute.
    pub path: String,
    /// Name shown to the recipient; defaults to the file name.
    #[serde(default)]
    pub display_name: String,
    /// MIME type; guessed from the name when empty.
    #[serde(default)]
    pub mime_type: String,
}

impl FileAttachment {
    /// Creates a file attachment.
    #[must_use]
    pub fn new(path: impl Into<String>, display_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            display_name: display_name.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// Attachment with literal text content. The display name may contain placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringAttachment {
    /// Attachment content, used as is.
    pub content: String,
    /// Name shown to the recipient.
    pub display_name: String,
    /// MIME type; guessed from the name when empty.
    #[serde(default)]
    pub mime_type: String,
}

impl StringAttachment {
    /// Creates a string attachment.
    #[must_use]
    pub fn new(content: impl Into<String>, display_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            display_name: display_name.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// Source of streamed attachment content.
///
/// Opened once per assembly, so the same template can be merged repeatedly.
pub trait StreamSource: Send + Sync {
    /// Opens a fresh reader over the content.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be opened.
    fn open(&self) -> io::Result<Box<dyn Read + Send + '_>>;
}

impl<F> StreamSource for F
where
    F: Fn() -> io::Result<Box<dyn Read + Send>> + Send + Sync,
{
    fn open(&self) -> io::Result<Box<dyn Read + Send + '_>> {
        self()
    }
}

impl StreamSource for Vec<u8> {
    fn open(&self) -> io::Result<Box<dyn Read + Send + '_>> {
        Ok(Box::new(self.as_slice()))
    }
}

/// Attachment read from a live byte source. The display name may contain placeholders.
#[derive(Clone)]
pub struct StreamAttachment {
    /// Content source.
    pub source: Arc<dyn StreamSource>,
    /// Name shown to the recipient.
    pub display_name: String,
    /// MIME type; guessed from the name when empty.
    pub mime_type: String,
}

impl StreamAttachment {
    /// Creates a stream attachment.
    #[must_use]
    pub fn new(
        source: impl StreamSource + 'static,
        display_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            source: Arc::new(source),
            display_name: display_name.into(),
            mime_type: mime_type.into(),
        }
    }
}

impl fmt::Debug for StreamAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamAttachment")
            .field("display_name", &self.display_name)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

/// Inline resource registered up front, referenced from HTML as `cid:<content_id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineAttachment {
    /// Path, relative to the base directory unless absolute. May contain placeholders.
    pub path: String,
    /// Content-ID the HTML refers to.
    pub content_id: String,
    /// MIME type; guessed from the path when empty.
    #[serde(default)]
    pub mime_type: String,
}

/// Extra header line copied onto every merged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomHeader {
    /// Header name.
    pub name: String,
    /// Header value; non-ASCII text is RFC 2047 encoded.
    pub value: String,
}

/// Message priority, sent as `X-Priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Urgent.
    High,
    /// Default.
    Normal,
    /// Can wait.
    Low,
}

impl Priority {
    /// Returns the `X-Priority` header value.
    #[must_use]
    pub const fn header_value(self) -> &'static str {
        match self {
            Self::High => "1 (Highest)",
            Self::Normal => "3 (Normal)",
            Self::Low => "5 (Lowest)",
        }
    }
}

/// Encoding and lookup settings of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSettings {
    /// Character set of text parts and encoded headers.
    #[serde(default = "default_charset")]
    pub character_encoding: String,
    /// Transfer encoding of text parts.
    #[serde(default = "default_text_encoding")]
    pub text_transfer_encoding: TransferEncoding,
    /// Transfer encoding of binary parts.
    #[serde(default = "default_binary_encoding")]
    pub binary_transfer_encoding: TransferEncoding,
    /// Directory relative paths are resolved against.
    #[serde(default)]
    pub base_dir: PathBuf,
    /// Culture used to format placeholder values.
    #[serde(default = "default_culture")]
    pub culture: String,
    /// Silently skip addresses that resolve to nothing.
    #[serde(default)]
    pub ignore_empty_recipients: bool,
    /// `Organization` header.
    #[serde(default)]
    pub organization: Option<String>,
    /// `X-Priority` header.
    #[serde(default)]
    pub priority: Option<Priority>,
    /// `X-Mailer` header.
    #[serde(default)]
    pub x_mailer: Option<String>,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            character_encoding: default_charset(),
            text_transfer_encoding: default_text_encoding(),
            binary_transfer_encoding: default_binary_encoding(),
            base_dir: PathBuf::new(),
            culture: default_culture(),
            ignore_empty_recipients: false,
            organization: None,
            priority: None,
            x_mailer: None,
        }
    }
}

impl MergeSettings {
    /// Resolves a possibly relative path against the base directory.
    #[must_use]
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        join_path(&self.base_dir, path)
    }
}

/// A message template merged against a data context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Template {
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub plain_text: String,
    /// HTML body.
    pub html_text: String,
    /// Typed addresses.
    pub addresses: Vec<AddressEntry>,
    /// Attachments read from files.
    pub file_attachments: Vec<FileAttachment>,
    /// Attachments read from live sources.
    #[serde(skip)]
    pub stream_attachments: Vec<StreamAttachment>,
    /// Attachments with literal content.
    pub string_attachments: Vec<StringAttachment>,
    /// Inline resources registered up front.
    pub inline_attachments: Vec<InlineAttachment>,
    /// Extra headers.
    pub headers: Vec<CustomHeader>,
    /// Encoding and lookup settings.
    pub settings: MergeSettings,
}

impl Template {
    /// Creates an empty template.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a template definition from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a template.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Into::into)
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the plain text body.
    #[must_use]
    pub fn plain_text(mut self, text: impl Into<String>) -> Self {
        self.plain_text = text.into();
        self
    }

    /// Sets the HTML body.
    #[must_use]
    pub fn html_text(mut self, html: impl Into<String>) -> Self {
        self.html_text = html.into();
        self
    }

    /// Adds an address.
    #[must_use]
    pub fn address(mut self, entry: AddressEntry) -> Self {
        self.addresses.push(entry);
        self
    }

    /// Adds a file attachment.
    #[must_use]
    pub fn file_attachment(mut self, attachment: FileAttachment) -> Self {
        self.file_attachments.push(attachment);
        self
    }

    /// Adds a stream attachment.
    #[must_use]
    pub fn stream_attachment(mut self, attachment: StreamAttachment) -> Self {
        self.stream_attachments.push(attachment);
        self
    }

    /// Adds a string attachment.
    #[must_use]
    pub fn string_attachment(mut self, attachment: StringAttachment) -> Self {
        self.string_attachments.push(attachment);
        self
    }

    /// Adds an inline attachment.
    #[must_use]
    pub fn inline_attachment(mut self, attachment: InlineAttachment) -> Self {
        self.inline_attachments.push(attachment);
        self
    }

    /// Adds a custom header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(CustomHeader {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Replaces the settings.
    #[must_use]
    pub fn settings(mut self, settings: MergeSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Fills the plain text body from the HTML body.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTML cannot be converted.
    pub fn with_plain_text_from_html(mut self) -> Result<Self> {
        self.plain_text = html_to_plain_text(&self.html_text)?;
        Ok(self)
    }

    /// Returns true if there is no subject, body or attachment at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subject.is_empty()
            && self.plain_text.is_empty()
            && self.html_text.is_empty()
            && self.file_attachments.is_empty()
            && self.stream_attachments.is_empty()
            && self.string_attachments.is_empty()
    }
}
