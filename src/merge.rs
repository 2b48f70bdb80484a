//! Tree merge engine.
//!
//! Composes an inherited (base) tree with a local (override) tree. Emitted
//! element order follows key order, so the merge is careful about where keys
//! land:
//!
//! - a key only the base has is appended to the override
//! - two tables are merged recursively, then re-stitched so that keys coming
//!   from the base keep the base order, followed by keys only the override has
//! - two arrays are concatenated (inherited entries first by default)
//! - anything else: the override wins
//!
//! [`merge`] layers the `base` section of every tree in a chain (root index,
//! section index, ..., page) under the last tree:
//!
//! ```text
//! merge([root, section, page])
//!   = combine(combine(combine({doc: root.base}, {doc: section.base}), {doc: page.base}), page)
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::node::{BASE, DOC, Node, Value};

/// Where inherited entries land when two arrays meet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListOrder {
    /// `base ++ local`
    #[default]
    InheritedFirst,
    /// `local ++ base`
    LocalFirst,
}

/// Combine `base` into `over` with the default list order.
pub fn combine(base: Node, over: Node) -> Node {
    combine_with(base, over, ListOrder::default())
}

/// Combine `base` into `over`, consuming both. The result is `over` with
/// the inherited content folded in.
pub fn combine_with(base: Node, mut over: Node, order: ListOrder) -> Node {
    for (key, inherited) in base {
        match over.get_mut(&key) {
            Some(local) => combine_value(inherited, local, order),
            None => {
                over.insert(key, inherited);
            }
        }
    }
    over
}

fn combine_value(inherited: Value, local: &mut Value, order: ListOrder) {
    match (inherited, local) {
        (Value::Table(inherited), Value::Table(local)) => {
            let base_keys: Vec<String> = inherited.keys().cloned().collect();
            let merged = combine_with(inherited, std::mem::take(local), order);
            *local = restitch(merged, &base_keys);
        }
        (Value::Array(inherited), Value::Array(local)) => {
            let own = std::mem::take(local);
            *local = match order {
                ListOrder::InheritedFirst => inherited.into_iter().chain(own).collect(),
                ListOrder::LocalFirst => own.into_iter().chain(inherited).collect(),
            };
        }
        // Scalars and mismatched shapes keep the local value.
        _ => {}
    }
}

/// Reorder `merged` so that `base_keys` come first in their own order.
fn restitch(merged: Node, base_keys: &[String]) -> Node {
    let rank: HashMap<&str, usize> = base_keys
        .iter()
        .enumerate()
        .map(|(i, k)| (k.as_str(), i))
        .collect();
    let (mut shared, local_only): (Vec<(String, Value)>, Vec<(String, Value)>) = merged
        .into_iter()
        .partition(|(key, _)| rank.contains_key(key.as_str()));
    shared.sort_by_key(|(key, _)| rank[key.as_str()]);
    shared.into_iter().chain(local_only).collect()
}

/// Merge a chain of trees with the default list order.
pub fn merge(trees: Vec<Node>) -> Node {
    merge_with(trees, ListOrder::default())
}

/// Fold every tree's `base` section, outermost first, under the last tree.
///
/// An empty chain yields an empty node.
pub fn merge_with(mut trees: Vec<Node>, order: ListOrder) -> Node {
    let Some(last) = trees.pop() else {
        return Node::new();
    };
    let mut layers: Vec<Node> = trees
        .into_iter()
        .filter_map(|mut tree| tree.remove(BASE))
        .chain(last.get(BASE).cloned())
        .map(|base| {
            let mut layer = Node::new();
            layer.insert(DOC.to_string(), base);
            layer
        })
        .collect();
    layers.push(last);
    layers
        .into_iter()
        .reduce(|acc, next| combine_with(acc, next, order))
        .unwrap_or_default()
}
