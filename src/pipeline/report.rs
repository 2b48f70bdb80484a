use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{Event, Phase, State};
use crate::registry::Metadata;

/// Outcome of a pipeline run, ready to print or serialize.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub root: PathBuf,
    pub output: PathBuf,
    pub documents: Vec<DocumentReport>,
    pub assets: Vec<AssetReport>,
    /// Plugin calls that aborted the rest of their phase.
    pub failures: Vec<PhaseFailure>,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    /// Relative to the build root.
    pub source: PathBuf,
    pub title: Option<String>,
    /// Relative to the output directory.
    pub output: Option<PathBuf>,
    pub failure: Option<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetReport {
    pub source: PathBuf,
    pub media_type: String,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseFailure {
    pub phase: Phase,
    pub path: PathBuf,
    pub plugin: &'static str,
    pub message: String,
}

impl RunReport {
    pub(super) fn new(
        root: &Path,
        output: &Path,
        states: &BTreeMap<PathBuf, State>,
        failures: Vec<PhaseFailure>,
        events: Vec<Event>,
    ) -> Self {
        let relative = |path: &Path, base: &Path| {
            path.strip_prefix(base).unwrap_or(path).to_path_buf()
        };

        let mut documents = Vec::new();
        let mut assets = Vec::new();
        for (path, state) in states {
            let Some(media_type) = &state.media_type else {
                continue;
            };
            if state.is_document() {
                documents.push(DocumentReport {
                    source: relative(path, root),
                    title: state
                        .node
                        .as_ref()
                        .and_then(Metadata::of)
                        .map(|m| m.title),
                    output: state.output.as_deref().map(|p| relative(p, output)),
                    failure: state.failure.clone(),
                    warnings: state.warnings.clone(),
                });
            } else {
                assets.push(AssetReport {
                    source: relative(path, root),
                    media_type: media_type.clone(),
                    output: state.output.as_deref().map(|p| relative(p, output)),
                });
            }
        }

        Self {
            root: root.to_path_buf(),
            output: output.to_path_buf(),
            documents,
            assets,
            failures,
            events,
        }
    }

    /// Documents that were skipped or failed to render.
    pub fn failed_documents(&self) -> impl Iterator<Item = &DocumentReport> {
        self.documents.iter().filter(|d| d.failure.is_some())
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.failed_documents().next().is_none()
    }

    pub fn document(&self, source: impl AsRef<Path>) -> Option<&DocumentReport> {
        self.documents.iter().find(|d| d.source == source.as_ref())
    }
}
