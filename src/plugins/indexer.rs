//! Links composed documents to each other and summarises the index tree.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::enrich::enrich;
use crate::node::{DOC, Node};
use crate::pipeline::{Change, Context, Phase, Plugin, PluginError};

const NAME: &str = "indexer";

pub struct Indexer;

impl Plugin for Indexer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn finish(&mut self, phase: Phase, ctx: &Context<'_>) -> Result<Vec<Change>, PluginError> {
        match phase {
            Phase::Enrich => Ok(link(ctx)),
            Phase::Report => {
                summarise(ctx);
                Ok(Vec::new())
            }
            _ => Ok(Vec::new()),
        }
    }
}

fn link(ctx: &Context<'_>) -> Vec<Change> {
    let mut templates: BTreeMap<PathBuf, Node> = ctx
        .states
        .iter()
        .filter(|(_, state)| state.is_live_document())
        .filter_map(|(path, state)| Some((path.clone(), state.node.clone()?)))
        .collect();
    let changed = enrich(&mut templates, &ctx.resolver());

    changed
        .into_iter()
        .filter_map(|path| {
            let doc = templates.get(&path)?.get(DOC)?.clone();
            let mut update = Node::new();
            update.insert(DOC.to_string(), doc);
            Some(Change::new(NAME, Phase::Enrich, path).with_node(update))
        })
        .collect()
}

fn summarise(ctx: &Context<'_>) {
    let resolver = ctx.resolver();
    for index in resolver.indexes() {
        let pages = ctx
            .states
            .iter()
            .filter(|(path, state)| {
                state.is_live_document()
                    && path.as_path() != index.as_path()
                    && resolver.nearest(path).as_ref() == Some(index)
            })
            .count();
        tracing::info!(
            phase = %Phase::Report,
            path = %ctx.relative(index).display(),
            pages,
            "index"
        );
    }
}
