//! # mailmerge-core
//!
//! Template-driven assembly of personalized email messages.
//!
//! A [`Template`] holds a subject, plain text and HTML bodies, typed
//! addresses and attachments, all of which may contain `{{ placeholders }}`.
//! [`MailMerge::assemble`] resolves the template against a [`DataContext`]
//! and returns a [`MergedMessage`] ready to hand to a transmission layer.
//!
//! Assembly runs in fixed stages:
//! - subject resolution
//! - addresses ([`AddressResolver`])
//! - bodies ([`TextPartBuilder`])
//! - attachments ([`AttachmentPartBuilder`])
//! - tree composition ([`TreeComposer`])
//! - validation
//!
//! Recoverable problems (bad addresses, missing files, unresolved
//! placeholders, missing recipients) are collected across all stages and
//! reported together in one [`Error::Merge`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod address;
pub mod attachment;
pub mod compose;
pub mod context;
mod diagnostic;
mod error;
pub mod html;
mod merge;
pub mod placeholder;
pub mod template;
pub mod text;

pub use address::{AddressResolver, HeaderFields, RecipientOverride};
pub use attachment::AttachmentPartBuilder;
pub use compose::{TreeComposer, validate};
pub use context::{DataContext, Lookup, SerializedContext, Value};
pub use diagnostic::{Diagnostic, DiagnosticKind, Findings};
pub use error::{Error, MergeFailure, Result};
pub use html::html_to_plain_text;
pub use merge::{MailMerge, MergedMessage};
pub use placeholder::{EmptyRender, PlaceholderResolver, Resolution, ResolveOptions, TemplateResolver};
pub use template::{
    AddressEntry, AddressRole, CustomHeader, FileAttachment, InlineAttachment, MergeSettings,
    Priority, StreamAttachment, StreamSource, StringAttachment, Template,
};
pub use text::TextPartBuilder;

pub use mailmerge_mime as mime;
