//! Slugs and default titles.
//!
//! Every document gets a `metadata.slug` naming its output file and a
//! `metadata.title` used for navigation links. Both may be set explicitly in
//! the document; otherwise they come from the source file name:
//!
//! - `guide/Getting Started.toml` → slug `getting-started`, title `Getting Started.toml`
//! - `index.toml` → slug `index`, title `index.toml`

use std::path::Path;

/// Reduce text to a URL-safe slug.
///
/// ASCII letters, digits, `_` and `-` are kept, spaces become `-`, anything
/// else is dropped, and the result is lower-cased.
pub fn slugify(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            ' ' => Some('-'),
            c if c.is_ascii_alphanumeric() || c == '_' || c == '-' => Some(c.to_ascii_lowercase()),
            _ => None,
        })
        .collect()
}

/// Slug derived from a document's file stem.
pub fn default_slug(path: &Path) -> String {
    path.file_stem()
        .map(|stem| slugify(&stem.to_string_lossy()))
        .unwrap_or_default()
}

/// Title derived from a document's file name.
pub fn default_title(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
