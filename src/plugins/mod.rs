//! The shipped plugins and their lookup by name.
//!
//! | Plugin | Phases |
//! |--------|--------|
//! | `finder` | CONFIG root checks, SURVEY discovery, FILTER text reading |
//! | `loader` | FILTER parsing, ENRICH template composition |
//! | `indexer` | end of ENRICH navigation links, end of REPORT summary |
//! | `writer` | ASSETS staging, RENDER, EXPORT |

mod finder;
mod indexer;
mod loader;
mod writer;

pub use finder::{Finder, media_type_of};
pub use indexer::Indexer;
pub use loader::Loader;
pub use writer::Writer;
#[cfg(test)]
pub(crate) use writer::copy_dir_recursive;

use crate::config::SiteConfig;
use crate::pipeline::{Pipeline, Plugin};

/// Whether the run writes output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Build,
    /// Everything but the export.
    Check,
}

/// Look up a plugin by its configured name.
pub fn resolve(name: &str, mode: Mode) -> Option<Box<dyn Plugin>> {
    match name {
        "finder" => Some(Box::new(Finder)),
        "loader" => Some(Box::new(Loader)),
        "indexer" => Some(Box::new(Indexer)),
        "writer" => Some(Box::new(match mode {
            Mode::Build => Writer::new(),
            Mode::Check => Writer::dry_run(),
        })),
        _ => None,
    }
}

/// Pipeline with the plugins named in `config.build.plugins`.
pub fn pipeline(config: SiteConfig, mode: Mode) -> Pipeline {
    let names = config.build.plugins.clone();
    let mut pipeline = Pipeline::new(config);
    for name in &names {
        match resolve(name, mode) {
            Some(plugin) => {
                pipeline.add_boxed(plugin);
            }
            None => tracing::warn!("'{name}' not resolved. Plugin not loaded."),
        }
    }
    pipeline
}
