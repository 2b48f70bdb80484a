//! Phase-sequenced plugin pipeline.
//!
//! A run visits every known path once per plugin per phase, folding each
//! plugin's proposed [`Change`]s into a per-path [`State`] as soon as they are
//! returned, so later plugins in the same phase see them:
//!
//! ```text
//! CONFIG ─▶ SURVEY ─▶ FILTER ─▶ ENRICH ─▶ ASSETS ─▶ RENDER ─▶ EXPORT ─▶ REPORT
//!  roots     roots    ─────────────── every discovered path ───────────────
//! ```
//!
//! CONFIG and SURVEY visit the input roots; later phases visit the paths
//! collected so far, in sorted order. After the path loop each plugin's
//! [`Plugin::finish`] runs for the phase. A plugin error aborts the rest of
//! that phase's path loop; the end-of-phase calls still run.

mod context;
mod error;
mod report;
mod state;

pub use context::Context;
pub use error::{PipelineError, PluginError};
pub use report::{AssetReport, DocumentReport, PhaseFailure, RunReport};
pub use state::{Change, DOCUMENT_TYPE, Event, State};

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::SiteConfig;
use crate::registry::common_root;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Config,
    Survey,
    Filter,
    Enrich,
    Assets,
    Render,
    Export,
    Report,
}

impl Phase {
    pub const ALL: [Phase; 8] = [
        Phase::Config,
        Phase::Survey,
        Phase::Filter,
        Phase::Enrich,
        Phase::Assets,
        Phase::Render,
        Phase::Export,
        Phase::Report,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Config => "CONFIG",
            Phase::Survey => "SURVEY",
            Phase::Filter => "FILTER",
            Phase::Enrich => "ENRICH",
            Phase::Assets => "ASSETS",
            Phase::Render => "RENDER",
            Phase::Export => "EXPORT",
            Phase::Report => "REPORT",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Phase::Config => "checking input roots",
            Phase::Survey => "discovering files",
            Phase::Filter => "reading and parsing documents",
            Phase::Enrich => "composing templates and linking navigation",
            Phase::Assets => "staging assets",
            Phase::Render => "rendering documents",
            Phase::Export => "writing output",
            Phase::Report => "reporting",
        }
    }

    /// Phases whose path loop runs over the input roots.
    pub fn visits_roots(self) -> bool {
        matches!(self, Phase::Config | Phase::Survey)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A unit of pipeline work.
///
/// Every method has a no-op default; a plugin implements the phases it
/// cares about.
pub trait Plugin {
    fn name(&self) -> &'static str;

    /// Called once before the first phase.
    fn enter(&mut self, _ctx: &Context<'_>) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called once after the last phase, also when the run stops early.
    fn exit(&mut self) {}

    /// Propose changes for one path.
    fn visit(
        &mut self,
        _phase: Phase,
        _path: &Path,
        _state: &State,
        _ctx: &Context<'_>,
    ) -> Result<Vec<Change>, PluginError> {
        Ok(Vec::new())
    }

    /// Propose changes after every path of a phase was visited.
    fn finish(&mut self, _phase: Phase, _ctx: &Context<'_>) -> Result<Vec<Change>, PluginError> {
        Ok(Vec::new())
    }
}

/// Directories of the current run.
struct Dirs<'a> {
    roots: &'a [PathBuf],
    root: &'a Path,
    workspace: &'a Path,
    output: &'a Path,
}

fn context<'a>(
    config: &'a SiteConfig,
    states: &'a BTreeMap<PathBuf, State>,
    dirs: &Dirs<'a>,
) -> Context<'a> {
    Context {
        config,
        roots: dirs.roots,
        root: dirs.root,
        workspace: dirs.workspace,
        output: dirs.output,
        states,
    }
}

pub struct Pipeline {
    config: SiteConfig,
    plugins: Vec<Box<dyn Plugin>>,
    states: BTreeMap<PathBuf, State>,
    failures: Vec<PhaseFailure>,
    events: Vec<Event>,
}

impl Pipeline {
    pub fn new(config: SiteConfig) -> Self {
        Self {
            config,
            plugins: Vec::new(),
            states: BTreeMap::new(),
            failures: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn add_plugin<P: Plugin + 'static>(&mut self, plugin: P) -> &mut Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn add_boxed(&mut self, plugin: Box<dyn Plugin>) -> &mut Self {
        self.plugins.push(plugin);
        self
    }

    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// State of the last run, keyed by absolute path.
    pub fn states(&self) -> &BTreeMap<PathBuf, State> {
        &self.states
    }

    /// Run every phase over `roots`, exporting to `output`.
    ///
    /// State from a previous run is discarded first.
    pub fn run(&mut self, roots: &[PathBuf], output: &Path) -> Result<RunReport, PipelineError> {
        if roots.is_empty() {
            return Err(PipelineError::NoRoots);
        }
        let roots = roots
            .iter()
            .map(std::path::absolute)
            .collect::<Result<Vec<_>, _>>()?;
        let root = common_root(&roots).ok_or(PipelineError::NoCommonRoot)?;
        let output = std::path::absolute(output)?;
        let workspace = tempfile::Builder::new().prefix("tomlsite-").tempdir()?;

        self.states.clear();
        self.failures.clear();
        self.events.clear();

        let dirs = Dirs {
            roots: &roots,
            root: &root,
            workspace: workspace.path(),
            output: &output,
        };
        tracing::debug!(
            root = %root.display(),
            workspace = %workspace.path().display(),
            plugins = ?self.plugin_names(),
            "starting run"
        );

        let mut entered = 0;
        let mut started = Ok(());
        for plugin in &mut self.plugins {
            let ctx = context(&self.config, &self.states, &dirs);
            if let Err(source) = plugin.enter(&ctx) {
                started = Err(PipelineError::Enter {
                    plugin: plugin.name(),
                    source,
                });
                break;
            }
            entered += 1;
        }

        if started.is_ok() {
            for phase in Phase::ALL {
                self.run_phase(phase, &dirs);
            }
        }

        for plugin in self.plugins[..entered].iter_mut().rev() {
            plugin.exit();
        }
        started?;

        Ok(RunReport::new(
            &root,
            &output,
            &self.states,
            std::mem::take(&mut self.failures),
            std::mem::take(&mut self.events),
        ))
    }

    fn run_phase(&mut self, phase: Phase, dirs: &Dirs<'_>) {
        tracing::info!(phase = %phase, "{}", phase.description());

        let targets: Vec<PathBuf> = if phase.visits_roots() {
            dirs.roots.to_vec()
        } else {
            self.states.keys().cloned().collect()
        };
        let fresh = State::default();

        'paths: for path in &targets {
            for index in 0..self.plugins.len() {
                let outcome = {
                    let ctx = context(&self.config, &self.states, dirs);
                    let state = self.states.get(path).unwrap_or(&fresh);
                    self.plugins[index].visit(phase, path, state, &ctx)
                };
                match outcome {
                    Ok(changes) => self.fold(phase, changes),
                    Err(err) => {
                        let plugin = self.plugins[index].name();
                        tracing::error!(
                            phase = %phase,
                            path = %path.display(),
                            plugin,
                            error = %err,
                            "plugin failed; skipping rest of phase"
                        );
                        self.failures.push(PhaseFailure {
                            phase,
                            path: path.clone(),
                            plugin,
                            message: err.to_string(),
                        });
                        break 'paths;
                    }
                }
            }
        }

        for index in 0..self.plugins.len() {
            let outcome = {
                let ctx = context(&self.config, &self.states, dirs);
                self.plugins[index].finish(phase, &ctx)
            };
            match outcome {
                Ok(changes) => self.fold(phase, changes),
                Err(err) => {
                    let plugin = self.plugins[index].name();
                    tracing::error!(phase = %phase, plugin, error = %err, "end of phase failed");
                    self.failures.push(PhaseFailure {
                        phase,
                        path: dirs.root.to_path_buf(),
                        plugin,
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    fn fold(&mut self, phase: Phase, changes: Vec<Change>) {
        for mut change in changes {
            if change.is_empty() {
                continue;
            }
            change.phase = phase;
            let event = change.event();
            tracing::debug!(
                phase = %phase,
                path = %event.path.display(),
                plugin = event.plugin,
                fields = ?event.fields,
                "state updated"
            );
            self.events.push(event);
            self.states
                .entry(change.path.clone())
                .or_default()
                .apply(change);
        }
    }
}
