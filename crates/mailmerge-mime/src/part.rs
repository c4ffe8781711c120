//! MIME document tree and its RFC 5322 rendering.

use crate::content_type::ContentType;
use crate::encoding::{
    decode_base64, decode_quoted_printable, decode_text, encode_base64_lines,
    encode_quoted_printable,
};
use crate::error::{Error, Result};
use crate::header::Headers;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    #[cfg_attr(feature = "serde", serde(rename = "7bit"))]
    SevenBit,
    /// 8-bit text.
    #[cfg_attr(feature = "serde", serde(rename = "8bit"))]
    EightBit,
    /// Base64 encoding.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "base64"))]
    Base64,
    /// Quoted-Printable encoding.
    #[cfg_attr(feature = "serde", serde(rename = "quoted-printable"))]
    QuotedPrintable,
    /// Binary (no encoding).
    #[cfg_attr(feature = "serde", serde(rename = "binary"))]
    Binary,
}

impl TransferEncoding {
    /// Applies this transfer encoding to raw content.
    ///
    /// # Errors
    ///
    /// Returns an error if 7-bit encoding is requested for non-ASCII data.
    pub fn encode(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Base64 => Ok(encode_base64_lines(data).into_bytes()),
            Self::QuotedPrintable => Ok(encode_quoted_printable(data).into_bytes()),
            Self::SevenBit if !data.is_ascii() => Err(Error::InvalidEncoding(
                "7bit transfer encoding requires ASCII content".to_string(),
            )),
            Self::SevenBit | Self::EightBit | Self::Binary => Ok(data.to_vec()),
        }
    }

    /// Reverses this transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoded data is malformed.
    pub fn decode(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Base64 => decode_base64(&String::from_utf8_lossy(data)),
            Self::QuotedPrintable => decode_quoted_printable(&String::from_utf8_lossy(data)),
            Self::SevenBit | Self::EightBit | Self::Binary => Ok(data.to_vec()),
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Kind of multipart container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultipartKind {
    /// Equivalent renderings of the same content, simplest first.
    Alternative,
    /// Independent parts (body followed by attachments).
    Mixed,
    /// A root part followed by resources it references.
    Related,
}

impl MultipartKind {
    /// Returns the multipart subtype name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alternative => "alternative",
            Self::Mixed => "mixed",
            Self::Related => "related",
        }
    }
}

impl fmt::Display for MultipartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal part holding encoded content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    content_type: ContentType,
    transfer_encoding: TransferEncoding,
    headers: Headers,
    body: Vec<u8>,
}

impl Leaf {
    /// Creates a leaf from already transfer-encoded body bytes.
    #[must_use]
    pub fn new(
        content_type: ContentType,
        transfer_encoding: TransferEncoding,
        encoded_body: Vec<u8>,
    ) -> Self {
        Self {
            content_type,
            transfer_encoding,
            headers: Headers::new(),
            body: encoded_body,
        }
    }

    /// Gets the content type.
    #[must_use]
    pub const fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub const fn transfer_encoding(&self) -> TransferEncoding {
        self.transfer_encoding
    }

    /// Part headers other than Content-Type and Content-Transfer-Encoding.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable access to the part headers.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Gets the transfer-encoded body.
    #[must_use]
    pub fn encoded_body(&self) -> &[u8] {
        &self.body
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        self.transfer_encoding.decode(&self.body)
    }

    /// Gets the decoded body as text, honoring the charset parameter.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails or the charset is unknown.
    pub fn body_text(&self) -> Result<String> {
        let decoded = self.decode_body()?;
        decode_text(&decoded, self.content_type.charset().unwrap_or("utf-8"))
    }

    /// Gets the file name advertised for this part, if any.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.content_type.parameters.get("name").map(String::as_str)
    }

    /// Gets the Content-ID without angle brackets.
    #[must_use]
    pub fn content_id(&self) -> Option<&str> {
        self.headers
            .get("Content-ID")
            .map(|id| id.trim_start_matches('<').trim_end_matches('>'))
    }

    /// Marks this part as an inline resource addressable by `content_id`.
    pub fn make_inline(&mut self, content_id: &str) {
        self.headers.set("Content-ID", format!("<{content_id}>"));
        match self.file_name().map(str::to_string) {
            Some(name) => self
                .headers
                .set("Content-Disposition", format!("inline; filename=\"{name}\"")),
            None => self.headers.set("Content-Disposition", "inline"),
        }
    }

    /// Checks whether this part is displayed inline.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.headers
            .get("Content-Disposition")
            .is_some_and(|d| d.trim_start().to_ascii_lowercase().starts_with("inline"))
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(format!("Content-Type: {}\r\n", self.content_type).as_bytes());
        out.extend_from_slice(
            format!("Content-Transfer-Encoding: {}\r\n", self.transfer_encoding).as_bytes(),
        );
        out.extend_from_slice(self.headers.to_string().as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
    }
}

/// Node of a MIME document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// Terminal part with content.
    Leaf(Leaf),
    /// Container with ordered children.
    Multipart {
        /// Container kind.
        kind: MultipartKind,
        /// Child parts in rendering order.
        children: Vec<Part>,
    },
}

impl Part {
    /// Creates a container part.
    #[must_use]
    pub const fn multipart(kind: MultipartKind, children: Vec<Self>) -> Self {
        Self::Multipart { kind, children }
    }

    /// Returns the leaf if this is a terminal part.
    #[must_use]
    pub const fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            Self::Multipart { .. } => None,
        }
    }

    /// Returns the container kind, if this is a container.
    #[must_use]
    pub const fn kind(&self) -> Option<MultipartKind> {
        match self {
            Self::Leaf(_) => None,
            Self::Multipart { kind, .. } => Some(*kind),
        }
    }

    /// Returns the children of a container (empty for leaves).
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Leaf(_) => &[],
            Self::Multipart { children, .. } => children,
        }
    }

    /// Renders this part (its MIME headers, a blank line and its body).
    ///
    /// Boundaries are derived from the rendered children, so rendering the
    /// same tree twice yields identical output. They start with `=_`, which
    /// cannot occur in Base64 or Quoted-Printable bodies.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Self::Leaf(leaf) => leaf.write_to(out),
            Self::Multipart { kind, children } => {
                let rendered: Vec<Vec<u8>> = children
                    .iter()
                    .map(|child| {
                        let mut buf = Vec::new();
                        child.write_to(&mut buf);
                        buf
                    })
                    .collect();

                let mut hasher = DefaultHasher::new();
                kind.hash(&mut hasher);
                rendered.hash(&mut hasher);
                let boundary = format!("=_{kind}_{:016x}", hasher.finish());

                let content_type = ContentType::multipart(kind.as_str(), boundary.as_str());
                out.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
                for child in rendered {
                    out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
                    out.extend_from_slice(&child);
                    out.extend_from_slice(b"\r\n");
                }
                out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
            }
        }
    }
}
