//! Turning raw content into leaf parts.

use crate::content_type::ContentType;
use crate::encoding::{encode_rfc2047, encode_text};
use crate::error::{Error, Result};
use crate::part::{Leaf, TransferEncoding};
use std::fs;
use std::io::Read;
use std::path::Path;

/// Content handed to a [`PartEncoder`].
pub enum PartContent<'a> {
    /// Text, converted to the requested character set.
    Text(&'a str),
    /// Raw bytes.
    Bytes(&'a [u8]),
    /// Contents of a file, read when encoding.
    File(&'a Path),
    /// A live byte source, read to the end when encoding.
    Reader(&'a mut dyn Read),
}

impl std::fmt::Debug for PartContent<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

/// Builds leaf parts from content plus its declared encodings.
pub trait PartEncoder {
    /// Encodes `content` into a leaf part.
    ///
    /// A non-empty `display_name` makes the part an attachment with that
    /// file name. An empty `mime_type` is guessed from the display name or
    /// file path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileRead`] for missing or unreadable files; any
    /// other error means the content cannot be encoded as requested.
    fn encode_part(
        &self,
        content: PartContent<'_>,
        display_name: &str,
        mime_type: &str,
        charset: &str,
        transfer_encoding: TransferEncoding,
    ) -> Result<Leaf>;
}

/// Default encoder producing standard MIME leaves.
#[derive(Debug, Default, Clone, Copy)]
pub struct MimeEncoder;

impl MimeEncoder {
    /// Creates a new encoder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn resolve_content_type(
        content: &PartContent<'_>,
        display_name: &str,
        mime_type: &str,
    ) -> Result<ContentType> {
        let mime_type = mime_type.trim();
        if !mime_type.is_empty() {
            return ContentType::parse(mime_type);
        }

        let guessed = if !display_name.is_empty() {
            ContentType::guess_from_path(display_name)
        } else if let PartContent::File(path) = content {
            ContentType::guess_from_path(path)
        } else if matches!(content, PartContent::Text(_)) {
            "text/plain".to_string()
        } else {
            crate::content_type::OCTET_STREAM.to_string()
        };
        ContentType::parse(&guessed)
    }
}

impl PartEncoder for MimeEncoder {
    fn encode_part(
        &self,
        content: PartContent<'_>,
        display_name: &str,
        mime_type: &str,
        charset: &str,
        transfer_encoding: TransferEncoding,
    ) -> Result<Leaf> {
        let mut content_type = Self::resolve_content_type(&content, display_name, mime_type)?;

        let raw = match content {
            PartContent::Text(text) => {
                if content_type.is_text() {
                    content_type = content_type.with_parameter("charset", charset);
                }
                encode_text(text, charset)?
            }
            PartContent::Bytes(bytes) => bytes.to_vec(),
            PartContent::File(path) => fs::read(path).map_err(|e| Error::file_read(path, e))?,
            PartContent::Reader(reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                buf
            }
        };

        let file_name = if display_name.is_empty() {
            None
        } else {
            let encoded = encode_rfc2047(display_name, charset)?;
            Some(encoded.replace('\\', "\\\\").replace('"', "\\\""))
        };
        if let Some(name) = &file_name {
            content_type = content_type.with_parameter("name", name.as_str());
        }

        let mut leaf = Leaf::new(content_type, transfer_encoding, transfer_encoding.encode(&raw)?);
        if let Some(name) = file_name {
            leaf.headers_mut()
                .set("Content-Disposition", format!("attachment; filename=\"{name}\""));
        }
        Ok(leaf)
    }
}
