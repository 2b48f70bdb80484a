//! Parses documents and composes them with their enclosing indexes.

use std::collections::BTreeMap;
use std::path::Path;

use crate::merge::merge_with;
use crate::node::Node;
use crate::pipeline::{Change, Context, Phase, Plugin, PluginError, State};
use crate::registry::{attach, document_url, set_index};

const NAME: &str = "loader";

pub struct Loader;

impl Plugin for Loader {
    fn name(&self) -> &'static str {
        NAME
    }

    fn visit(
        &mut self,
        phase: Phase,
        path: &Path,
        state: &State,
        ctx: &Context<'_>,
    ) -> Result<Vec<Change>, PluginError> {
        if !state.is_live_document() {
            return Ok(Vec::new());
        }
        match (phase, &state.text, &state.node) {
            (Phase::Filter, Some(text), None) => Ok(vec![parse(path, text, ctx)?]),
            (Phase::Enrich, _, Some(node)) => Ok(vec![compose(path, node, ctx)]),
            _ => Ok(Vec::new()),
        }
    }

    fn finish(&mut self, phase: Phase, ctx: &Context<'_>) -> Result<Vec<Change>, PluginError> {
        match phase {
            Phase::Filter => Ok(claim_urls(ctx)),
            _ => Ok(Vec::new()),
        }
    }
}

/// Parse a document and attach its registry. Bad TOML skips the document.
fn parse(path: &Path, text: &str, ctx: &Context<'_>) -> Result<Change, PluginError> {
    let change = Change::new(NAME, Phase::Filter, path);
    let mut node: Node = match toml::from_str(text) {
        Ok(node) => node,
        Err(err) => {
            tracing::warn!(
                phase = %Phase::Filter,
                path = %path.display(),
                error = %err.message(),
                "cannot parse document; skipped"
            );
            return Ok(change.with_failure(format!("parse error: {}", err.message())));
        }
    };
    attach(&mut node, path, ctx.root)?;
    Ok(change.with_node(node))
}

/// Give every output URL to one document.
///
/// Documents are visited in path order; a later document whose slug lands on
/// a URL already taken is failed with a message naming the first one.
fn claim_urls(ctx: &Context<'_>) -> Vec<Change> {
    let mut claimed: BTreeMap<String, &Path> = BTreeMap::new();
    let mut changes = Vec::new();
    for (path, state) in ctx.states {
        if !state.is_live_document() {
            continue;
        }
        let Some(url) = state.node.as_ref().and_then(document_url) else {
            continue;
        };
        match claimed.get(&url) {
            Some(first) => {
                tracing::warn!(
                    phase = %Phase::Filter,
                    path = %path.display(),
                    first = %first.display(),
                    url = %url,
                    "output url already taken; skipped"
                );
                let message = format!(
                    "output '{url}' is already taken by {}",
                    ctx.relative(first).display()
                );
                changes.push(Change::new(NAME, Phase::Filter, path).with_failure(message));
            }
            None => {
                claimed.insert(url, path);
            }
        }
    }
    changes
}

/// Fold the `base` sections of every enclosing index into the document.
fn compose(path: &Path, node: &Node, ctx: &Context<'_>) -> Change {
    let resolver = ctx.resolver();
    let mut chain: Vec<Node> = resolver
        .ancestors(path)
        .iter()
        .filter(|index| index.as_path() != path)
        .filter_map(|index| ctx.node(index).cloned())
        .collect();
    chain.push(node.clone());

    let mut composed = merge_with(chain, ctx.config.merge.list_order);
    if let Some(index) = resolver.nearest(path) {
        set_index(&mut composed, &index);
    }
    Change::new(NAME, Phase::Enrich, path).with_node(composed)
}
