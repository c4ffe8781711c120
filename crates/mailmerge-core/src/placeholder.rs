//! Placeholder resolution.
//!
//! Placeholders are written `{{ name }}`, where `name` may be a dotted path
//! into the data context. `{{ file:notes/footer.txt }}` includes the
//! contents of a file, relative to the base directory.

use crate::context::{DataContext, Lookup};
use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").expect("placeholder pattern is valid")
});

const FILE_PREFIX: &str = "file:";

/// How unresolved and null placeholders are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyRender {
    /// Leave unresolved placeholders in the text; null renders as empty.
    #[default]
    KeepPlaceholder,
    /// Render unresolved and null placeholders as the empty string.
    Blank,
}

/// Settings for one resolution.
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions<'a> {
    /// Rendering of unresolved or null values.
    pub empty_render: EmptyRender,
    /// Directory relative file includes are read from.
    pub base_dir: &'a Path,
    /// Culture used to format values.
    pub culture: &'a str,
}

impl ResolveOptions<'_> {
    /// Returns a copy with a different empty-render policy.
    #[must_use]
    pub const fn with_empty_render(mut self, empty_render: EmptyRender) -> Self {
        self.empty_render = empty_render;
        self
    }
}

/// Resolved text plus what went wrong while resolving it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Text with placeholders replaced.
    pub text: String,
    /// Placeholder names that were absent from the context.
    pub unresolved: Vec<String>,
    /// Included files that could not be read.
    pub unreadable_files: Vec<PathBuf>,
}

/// Replaces placeholders in text with values from a data context.
pub trait PlaceholderResolver {
    /// Resolves every placeholder in `text`.
    ///
    /// Never fails: problems are reported in the returned [`Resolution`].
    fn resolve(&self, text: &str, context: &dyn DataContext, options: &ResolveOptions<'_>)
    -> Resolution;
}

/// Default `{{ name }}` resolver.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateResolver;

impl TemplateResolver {
    /// Creates a new resolver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PlaceholderResolver for TemplateResolver {
    fn resolve(
        &self,
        text: &str,
        context: &dyn DataContext,
        options: &ResolveOptions<'_>,
    ) -> Resolution {
        let mut unresolved = Vec::new();
        let mut unreadable_files = Vec::new();

        let resolved = PLACEHOLDER.replace_all(text, |caps: &Captures<'_>| {
            let whole = &caps[0];
            let name = &caps[1];

            if let Some(file) = name.strip_prefix(FILE_PREFIX) {
                let path = join_path(options.base_dir, file.trim());
                return fs::read_to_string(&path).unwrap_or_else(|_| {
                    unreadable_files.push(path);
                    String::new()
                });
            }

            match context.lookup(name) {
                Lookup::Present(value) => value.format(options.culture),
                Lookup::Null => String::new(),
                Lookup::Absent => {
                    unresolved.push(name.to_string());
                    match options.empty_render {
                        EmptyRender::KeepPlaceholder => whole.to_string(),
                        EmptyRender::Blank => String::new(),
                    }
                }
            }
        });

        Resolution {
            text: resolved.into_owned(),
            unresolved,
            unreadable_files,
        }
    }
}

/// Joins `path` onto `base_dir` unless it is already absolute.
///
/// The result is made absolute against the working directory when
/// `base_dir` is itself relative or empty.
#[must_use]
pub fn join_path(base_dir: &Path, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    };
    std::path::absolute(&joined).unwrap_or(joined)
}
