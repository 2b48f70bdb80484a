//! Ancestor/index resolution.
//!
//! An index document (conventionally `index.toml`) supplies defaults for
//! every document in or below its directory. The resolver answers which
//! indexes enclose a path, outermost first:
//!
//! ```text
//! site/index.toml             ← ancestors(site/guide/install.toml)[0]
//! site/guide/index.toml       ← ancestors(site/guide/install.toml)[1]
//! site/guide/install.toml
//! ```
//!
//! An index is its own nearest ancestor.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct Resolver {
    index_name: String,
    indexes: Vec<PathBuf>,
}

impl Resolver {
    /// Build from every known document path, keeping those named `index_name`.
    pub fn new<I>(index_name: &str, paths: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut indexes: Vec<PathBuf> = paths
            .into_iter()
            .filter(|p| p.file_name().is_some_and(|name| name == index_name))
            .collect();
        indexes.sort_by(|a, b| {
            a.components()
                .count()
                .cmp(&b.components().count())
                .then_with(|| a.cmp(b))
        });
        indexes.dedup();
        Self {
            index_name: index_name.to_string(),
            indexes,
        }
    }

    pub fn is_index(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| name == self.index_name.as_str())
    }

    /// Known indexes, outermost first.
    pub fn indexes(&self) -> &[PathBuf] {
        &self.indexes
    }

    /// Indexes whose directory contains `path`, outermost first.
    pub fn ancestors(&self, path: &Path) -> Vec<PathBuf> {
        self.indexes
            .iter()
            .filter(|index| index.parent().is_some_and(|dir| path.starts_with(dir)))
            .cloned()
            .collect()
    }

    /// The innermost index enclosing `path`, possibly `path` itself.
    pub fn nearest(&self, path: &Path) -> Option<PathBuf> {
        self.ancestors(path).pop()
    }

    /// The innermost index enclosing `path`, never `path` itself.
    pub fn parent_index(&self, path: &Path) -> Option<PathBuf> {
        self.ancestors(path)
            .into_iter()
            .rev()
            .find(|index| index != path)
    }
}
