use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::State;
use crate::config::SiteConfig;
use crate::node::Node;
use crate::resolver::Resolver;

/// Read-only view of a run handed to every plugin call.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    // === Configuration ===
    pub config: &'a SiteConfig,

    // === Locations ===
    /// Input directories as given, made absolute.
    pub roots: &'a [PathBuf],
    /// Deepest directory containing every root.
    pub root: &'a Path,
    /// Temporary staging directory, removed when the run ends.
    pub workspace: &'a Path,
    pub output: &'a Path,

    // === Accumulated state ===
    pub states: &'a BTreeMap<PathBuf, State>,
}

impl<'a> Context<'a> {
    /// Index resolver over every loaded document.
    pub fn resolver(&self) -> Resolver {
        Resolver::new(
            &self.config.build.index_name,
            self.states
                .iter()
                .filter(|(_, state)| state.is_live_document() && state.node.is_some())
                .map(|(path, _)| path.clone()),
        )
    }

    pub fn node(&self, path: &Path) -> Option<&'a Node> {
        self.states.get(path)?.node.as_ref()
    }

    /// `path` relative to the build root.
    pub fn relative<'p>(&self, path: &'p Path) -> &'p Path {
        path.strip_prefix(self.root).unwrap_or(path)
    }
}
