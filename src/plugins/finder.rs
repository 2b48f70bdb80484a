//! Discovers files below the input roots and reads document text.

use std::fs;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

use crate::config::CONFIG_FILE;
use crate::pipeline::{Change, Context, DOCUMENT_TYPE, Phase, Plugin, PluginError, State};

const NAME: &str = "finder";

pub struct Finder;

impl Plugin for Finder {
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
        match phase {
            Phase::Config => {
                if !path.is_dir() {
                    return Err(PluginError::failed(format!(
                        "{} is not a directory",
                        path.display()
                    )));
                }
                Ok(Vec::new())
            }
            Phase::Survey => survey(path, ctx),
            Phase::Filter if state.is_live_document() && state.text.is_none() => {
                Ok(vec![read_text(path)])
            }
            _ => Ok(Vec::new()),
        }
    }
}

/// `application/toml` for `.toml` files, otherwise guessed from the extension.
pub fn media_type_of(path: &Path) -> String {
    if path.extension().is_some_and(|ext| ext == "toml") {
        return DOCUMENT_TYPE.to_string();
    }
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn survey(root: &Path, ctx: &Context<'_>) -> Result<Vec<Change>, PluginError> {
    let mut changes = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !(is_hidden(e) || e.path() == ctx.output));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        // Only the build root's config is special.
        if entry.file_name() == CONFIG_FILE && entry.path().parent() == Some(ctx.root) {
            continue;
        }
        let path = entry.path();
        let media_type = media_type_of(path);
        tracing::debug!(phase = %Phase::Survey, path = %path.display(), media_type = %media_type, "found");
        changes.push(Change::new(NAME, Phase::Survey, path).with_media_type(media_type));
    }
    Ok(changes)
}

/// Read a document as UTF-8. Unreadable documents are skipped, not fatal.
fn read_text(path: &Path) -> Change {
    let change = Change::new(NAME, Phase::Filter, path);
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(phase = %Phase::Filter, path = %path.display(), error = %err, "cannot read document; skipped");
            return change.with_failure(format!("read error: {err}"));
        }
    };
    match String::from_utf8(bytes) {
        Ok(text) => change.with_text(text),
        Err(err) => {
            tracing::warn!(phase = %Phase::Filter, path = %path.display(), error = %err, "document is not UTF-8; skipped");
            change.with_failure(format!("encoding error: {err}"))
        }
    }
}
