//! Template trees and their reserved keys.
//!
//! A [`Node`] is one parsed TOML document or a subtree of one. Tables keep
//! their source key order (the `preserve_order` feature of `toml`), and that
//! order is the order in which elements are emitted.
//!
//! ## Reserved Keys
//!
//! | Key | Level | Meaning |
//! |-----|-------|---------|
//! | `config` | any | Rendering options for this subtree and its descendants |
//! | `attrib` | any | HTML attributes for the tag generated for this subtree |
//! | `blocks` | any | Raw markup strings expanded by a [`BlockExpander`](crate::markup::BlockExpander) |
//! | `base` | top | Inherited defaults merged in before `doc` |
//! | `doc` | top | The page's own content, root of the render walk |
//! | `registry` | top | Discovery bookkeeping (see [`registry`](crate::registry)) |
//! | `metadata` | top | `slug` and `title` |

use std::fmt;

pub use toml::Value;

/// An ordered key/value tree.
pub type Node = toml::Table;

pub const CONFIG: &str = "config";
pub const ATTRIB: &str = "attrib";
pub const BLOCKS: &str = "blocks";
pub const BASE: &str = "base";
pub const DOC: &str = "doc";
pub const REGISTRY: &str = "registry";
pub const METADATA: &str = "metadata";

/// Keys the renderer handles itself instead of emitting them as elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reserved {
    Config,
    Attrib,
    Blocks,
}

impl Reserved {
    /// Handling order within one node.
    pub const ALL: [Reserved; 3] = [Reserved::Config, Reserved::Attrib, Reserved::Blocks];

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.key() == key)
    }

    pub fn key(self) -> &'static str {
        match self {
            Reserved::Config => CONFIG,
            Reserved::Attrib => ATTRIB,
            Reserved::Blocks => BLOCKS,
        }
    }
}

/// One step of the path from the root of a render walk to a subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{key}"),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Render a walk path as `a.b.0.c` for diagnostics.
pub fn display_path(path: &[PathSegment]) -> String {
    path.iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Text of a scalar value as it appears in output.
///
/// Strings are returned verbatim; other scalars use their TOML form.
/// Tables and arrays have no text.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(float_text(*f)),
        Value::Boolean(b) => Some(b.to_string()),
        Value::Datetime(d) => Some(d.to_string()),
        Value::Array(_) | Value::Table(_) => None,
    }
}

/// A float as TOML writes it: whole numbers keep their `.0`.
fn float_text(f: f64) -> String {
    if f.is_nan() {
        "nan".into()
    } else if f.is_infinite() {
        if f > 0.0 { "inf".into() } else { "-inf".into() }
    } else if f.fract() == 0.0 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

/// Follow `keys` through nested tables.
pub fn table_at<'a>(node: &'a Node, keys: &[&str]) -> Option<&'a Node> {
    keys.iter()
        .try_fold(node, |table, key| table.get(*key)?.as_table())
}

/// Follow `keys` through nested tables, creating missing ones at the end.
///
/// Returns `None` when a key on the way holds something other than a table.
pub fn ensure_table<'a>(node: &'a mut Node, keys: &[&str]) -> Option<&'a mut Node> {
    let Some((first, rest)) = keys.split_first() else {
        return Some(node);
    };
    match node.entry(*first).or_insert(Value::Table(Node::new())) {
        Value::Table(table) => ensure_table(table, rest),
        _ => None,
    }
}
