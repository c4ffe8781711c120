//! # mailmerge-mime
//!
//! MIME building blocks for assembling merged email messages.
//!
//! ## Features
//!
//! - **Document tree**: leaf parts and `alternative` / `mixed` / `related` containers
//! - **Part encoder**: text, bytes, files and streams into encoded leaves
//! - **Encoding**: Base64, Quoted-Printable, RFC 2047 encoded-words
//! - **Character sets**: any charset label known to `encoding_rs`
//! - **Addresses**: basic syntax validation and header formatting
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailmerge_mime::{MimeEncoder, MultipartKind, Part, PartContent, PartEncoder, TransferEncoding};
//!
//! let plain = MimeEncoder.encode_part(
//!     PartContent::Text("Hello"),
//!     "",
//!     "text/plain",
//!     "utf-8",
//!     TransferEncoding::QuotedPrintable,
//! )?;
//! let html = MimeEncoder.encode_part(
//!     PartContent::Text("<p>Hello</p>"),
//!     "",
//!     "text/html",
//!     "utf-8",
//!     TransferEncoding::QuotedPrintable,
//! )?;
//!
//! let tree = Part::multipart(MultipartKind::Alternative, vec![Part::Leaf(plain), Part::Leaf(html)]);
//! let mut out = Vec::new();
//! tree.write_to(&mut out);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod content_type;
mod encoder;
mod error;
mod header;
mod part;

pub mod encoding;

pub use address::{Address, Mailbox};
pub use content_type::{ContentType, OCTET_STREAM};
pub use encoder::{MimeEncoder, PartContent, PartEncoder};
pub use error::{Error, Result};
pub use header::Headers;
pub use part::{Leaf, MultipartKind, Part, TransferEncoding};
