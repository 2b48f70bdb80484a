use thiserror::Error;

use crate::registry::RegistryError;

/// Failure of one plugin call. Aborts the remaining paths of the phase.
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("{0}")]
    Failed(String),
}

impl PluginError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Failure that prevents a run from starting or finishing.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no input paths given")]
    NoRoots,
    #[error("input paths share no common directory")]
    NoCommonRoot,
    #[error("plugin '{plugin}' failed to start: {source}")]
    Enter {
        plugin: &'static str,
        source: PluginError,
    },
}
