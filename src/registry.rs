//! Per-document bookkeeping.
//!
//! When a document is loaded it gains two top-level tables:
//!
//! ```toml
//! [registry]
//! path = "/site/guide/install.toml"
//! root = "/site"
//! parts = ["guide"]
//! time = "2026-10-16T09:30:00+00:00"
//! index = "/site/guide/index.toml"    # after enrichment
//!
//! [metadata]
//! slug = "install"
//! title = "install.toml"
//! ```
//!
//! Both are ordinary template sections, so leaf text can refer to them
//! (`"{metadata[title]}"`). An explicit `slug` or `title` in the source
//! document is kept.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

use crate::naming::{default_slug, default_title};
use crate::node::{METADATA, Node, REGISTRY, Value};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("{} is not below the build root {}", .path.display(), .root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },
    #[error("registry cannot be stored: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Where a document came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    pub path: PathBuf,
    pub root: PathBuf,
    pub parts: Vec<String>,
    pub time: String,
    /// Nearest enclosing index document. A lookup key, not an owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<PathBuf>,
}

impl Registry {
    pub fn new(path: &Path, root: &Path) -> Result<Self, RegistryError> {
        let relative = path
            .strip_prefix(root)
            .map_err(|_| RegistryError::OutsideRoot {
                path: path.to_path_buf(),
                root: root.to_path_buf(),
            })?;
        let parts = relative
            .parent()
            .map(|dir| {
                dir.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
            parts,
            time: chrono::Utc::now().to_rfc3339(),
            index: None,
        })
    }

    /// Source path relative to the build root.
    pub fn relative(&self) -> &Path {
        self.path.strip_prefix(&self.root).unwrap_or(&self.path)
    }
}

/// Slug and title of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub slug: String,
    pub title: String,
}

impl Metadata {
    /// Read from a node's `metadata` table.
    pub fn of(node: &Node) -> Option<Self> {
        let table = node.get(METADATA)?.as_table()?;
        Some(Self {
            slug: table.get("slug")?.as_str()?.to_string(),
            title: table.get("title")?.as_str()?.to_string(),
        })
    }
}

/// Record where `node` came from and fill in any missing slug or title.
pub fn attach(node: &mut Node, path: &Path, root: &Path) -> Result<Registry, RegistryError> {
    let registry = Registry::new(path, root)?;
    node.insert(REGISTRY.to_string(), Value::try_from(&registry)?);

    if !node.get(METADATA).is_some_and(Value::is_table) {
        if node.contains_key(METADATA) {
            tracing::warn!(path = %path.display(), "metadata is not a table; replaced");
        }
        node.insert(METADATA.to_string(), Value::Table(Node::new()));
    }
    if let Some(Value::Table(metadata)) = node.get_mut(METADATA) {
        if !metadata.get("slug").is_some_and(Value::is_str) {
            metadata.insert("slug".into(), Value::String(default_slug(path)));
        }
        if !metadata.get("title").is_some_and(Value::is_str) {
            metadata.insert("title".into(), Value::String(default_title(path)));
        }
    }
    Ok(registry)
}

/// Read back the registry of a loaded node.
pub fn registry_of(node: &Node) -> Option<Registry> {
    node.get(REGISTRY)?.clone().try_into().ok()
}

/// Record the nearest enclosing index of a loaded node.
pub fn set_index(node: &mut Node, index: &Path) {
    if let Some(Value::Table(registry)) = node.get_mut(REGISTRY) {
        registry.insert(
            "index".into(),
            Value::String(index.to_string_lossy().into_owned()),
        );
    }
}

/// Site-relative URL of a document: its source directory below the root,
/// then `<slug>.html`, with `/` separators.
pub fn url_of(registry: &Registry, slug: &str) -> String {
    let mut parts: Vec<String> = registry
        .relative()
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    parts.push(format!("{slug}.html"));
    parts.join("/")
}

/// URL of a loaded node, if it has a registry and metadata.
pub fn document_url(node: &Node) -> Option<String> {
    let registry = registry_of(node)?;
    let metadata = Metadata::of(node)?;
    Some(url_of(&registry, &metadata.slug))
}

/// Deepest directory containing every path.
pub fn common_root(paths: &[PathBuf]) -> Option<PathBuf> {
    let (first, rest) = paths.split_first()?;
    let mut root: Vec<Component> = first.components().collect();
    for path in rest {
        let shared = root
            .iter()
            .zip(path.components())
            .take_while(|(a, b)| **a == *b)
            .count();
        root.truncate(shared);
    }
    if root.is_empty() {
        return None;
    }
    Some(root.iter().collect())
}
