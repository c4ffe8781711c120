//! HTML helpers: plain text conversion, `<title>` and inline resources.

use crate::diagnostic::Findings;
use crate::error::{Error, Result};
use crate::placeholder::join_path;
use mailmerge_mime::{Leaf, PartContent, PartEncoder, TransferEncoding};
use regex::{Captures, Regex};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

#[allow(clippy::expect_used)]
static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(<title\b[^>]*>)(.*?)(</title\s*>)").expect("title pattern is valid")
});

#[allow(clippy::expect_used)]
static RESOURCE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:img|body|table|td|th)\b[^>]*>").expect("tag pattern is valid")
});

#[allow(clippy::expect_used)]
static RESOURCE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)(\b(?:src|background)\s*=\s*)(?:"([^"]*)"|'([^']*)')"#)
        .expect("attribute pattern is valid")
});

/// URL schemes that never refer to local files.
const REMOTE_PREFIXES: &[&str] = &["http:", "https:", "cid:", "data:", "mailto:", "//", "#"];

/// Converts HTML into readable plain text (Markdown flavored).
///
/// # Errors
///
/// Returns an error if the HTML cannot be processed.
pub fn html_to_plain_text(html: &str) -> Result<String> {
    htmd::convert(html).map_err(|e| Error::HtmlConversion(e.to_string()))
}

/// Replaces the content of an existing `<title>` element with `subject`.
///
/// HTML without a `<title>` is returned unchanged.
#[must_use]
pub fn set_title(html: &str, subject: &str) -> String {
    let escaped = html_escape::encode_text(subject);
    TITLE
        .replace(html, |caps: &Captures<'_>| format!("{}{escaped}{}", &caps[1], &caps[3]))
        .into_owned()
}

/// Inline resources extracted from HTML.
#[derive(Debug, Default)]
pub struct InlineResources {
    /// HTML with local references rewritten to `cid:` URLs.
    pub html: String,
    /// One leaf per distinct referenced file, in order of first reference.
    pub parts: Vec<Leaf>,
}

impl InlineResources {
    /// Returns true if a part with this Content-ID was already extracted.
    #[must_use]
    pub fn contains(&self, content_id: &str) -> bool {
        self.parts.iter().any(|p| p.content_id() == Some(content_id))
    }
}

/// Finds local files referenced by `src` / `background` attributes, loads
/// them as inline parts and points the references at them.
///
/// Unreadable files are recorded as bad inline files and their references
/// left untouched.
///
/// # Errors
///
/// Returns an error if a readable file cannot be encoded.
pub fn extract_inline_resources<E: PartEncoder + ?Sized>(
    html: &str,
    base_dir: &Path,
    encoder: &E,
    charset: &str,
    transfer_encoding: TransferEncoding,
    findings: &mut Findings,
) -> mailmerge_mime::Result<InlineResources> {
    let mut extracted: Vec<(PathBuf, String)> = Vec::new();
    let mut parts = Vec::new();
    let mut fatal = None;

    let rewritten = RESOURCE_TAG.replace_all(html, |tag: &Captures<'_>| {
        RESOURCE_ATTR
            .replace_all(&tag[0], |attr: &Captures<'_>| {
                let whole = attr[0].to_string();
                let reference = attr.get(2).or_else(|| attr.get(3)).map_or("", |m| m.as_str());
                if fatal.is_some() || is_remote(reference) {
                    return whole;
                }

                let path = join_path(base_dir, reference.strip_prefix("file://").unwrap_or(reference));
                if let Some((_, cid)) = extracted.iter().find(|(p, _)| *p == path) {
                    return format!("{}\"cid:{cid}\"", &attr[1]);
                }

                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match encoder.encode_part(
                    PartContent::File(&path),
                    &file_name,
                    "",
                    charset,
                    transfer_encoding,
                ) {
                    Ok(mut leaf) => {
                        let cid = content_id_for(&path);
                        leaf.make_inline(&cid);
                        parts.push(leaf);
                        extracted.push((path, cid.clone()));
                        format!("{}\"cid:{cid}\"", &attr[1])
                    }
                    Err(e) if e.is_read_failure() => {
                        findings.bad_inline_file(path);
                        whole
                    }
                    Err(e) => {
                        fatal = Some(e);
                        whole
                    }
                }
            })
            .into_owned()
    });

    if let Some(e) = fatal {
        return Err(e);
    }

    debug!(count = parts.len(), "extracted inline resources");
    Ok(InlineResources {
        html: rewritten.into_owned(),
        parts,
    })
}

fn is_remote(reference: &str) -> bool {
    let reference = reference.trim();
    reference.is_empty()
        || REMOTE_PREFIXES.iter().any(|prefix| {
            reference
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        })
}

/// Derives a stable Content-ID from a file path.
fn content_id_for(path: &Path) -> String {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    format!("{:016x}@mailmerge", hasher.finish())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mailmerge_mime::MimeEncoder;

    #[test]
    fn test_set_title() {
        let html = "<html><head><TITLE>old</TITLE></head><body>x</body></html>";
        assert_eq!(
            set_title(html, "Sale: 50% <off>"),
            "<html><head><TITLE>Sale: 50% &lt;off&gt;</TITLE></head><body>x</body></html>"
        );
        assert_eq!(set_title("<p>no title</p>", "x"), "<p>no title</p>");
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://example.com/a.png"));
        assert!(is_remote("CID:logo"));
        assert!(is_remote("data:image/png;base64,AAAA"));
        assert!(is_remote(""));
        assert!(!is_remote("images/logo.png"));
        assert!(!is_remote("/abs/logo.png"));
    }

    #[test]
    fn test_extract_inline_resources() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("logo.png"), [137, 80, 78, 71]).unwrap();
        let html = concat!(
            r#"<body background='logo.png'><img alt="a" src="logo.png">"#,
            r#"<img src="https://example.com/x.png"><img src="gone.gif"></body>"#
        );

        let mut findings = Findings::default();
        let resources = extract_inline_resources(
            html,
            dir.path(),
            &MimeEncoder,
            "utf-8",
            TransferEncoding::Base64,
            &mut findings,
        )
        .unwrap();

        assert_eq!(resources.parts.len(), 1);
        let cid = resources.parts[0].content_id().unwrap().to_string();
        assert!(resources.contains(&cid));
        assert_eq!(resources.html.matches(&format!("\"cid:{cid}\"")).count(), 2);
        assert!(resources.html.contains(r#"src="https://example.com/x.png""#));
        assert!(resources.html.contains(r#"src="gone.gif""#));
        assert_eq!(resources.parts[0].content_type().essence(), "image/png");
        assert!(resources.parts[0].is_inline());
        assert_eq!(findings.bad_inline_files, vec![dir.path().join("gone.gif")]);
    }

    #[test]
    fn test_html_to_plain_text() {
        let text = html_to_plain_text("<p>Hello <b>Ann</b></p>").unwrap();
        assert!(text.contains("Hello"));
        assert!(text.contains("Ann"));
        assert!(!text.contains("<p>"));
    }
}
