//! Renders documents and writes them, with the assets, to the output directory.
//!
//! Files are staged in the run's workspace and copied into the output
//! directory once the EXPORT phase has finished.

use std::fs;
use std::path::Path;

use crate::node::Node;
use crate::pipeline::{Change, Context, Phase, Plugin, PluginError, State};
use crate::registry::document_url;
use crate::render::Renderer;

const NAME: &str = "writer";

pub struct Writer {
    export: bool,
}

impl Writer {
    pub fn new() -> Self {
        Self { export: true }
    }

    /// Render but write nothing.
    pub fn dry_run() -> Self {
        Self { export: false }
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for Writer {
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
            Phase::Assets if self.export && state.media_type.is_some() && !state.is_document() => {
                Ok(vec![stage_asset(path, ctx)?])
            }
            Phase::Render if state.is_live_document() => match &state.node {
                Some(node) => Ok(vec![render(path, node, ctx)]),
                None => Ok(Vec::new()),
            },
            Phase::Export if self.export && state.is_live_document() => {
                match (&state.node, &state.doc) {
                    (Some(node), Some(doc)) => Ok(export(path, node, doc, ctx)?.into_iter().collect()),
                    _ => Ok(Vec::new()),
                }
            }
            _ => Ok(Vec::new()),
        }
    }

    fn finish(&mut self, phase: Phase, ctx: &Context<'_>) -> Result<Vec<Change>, PluginError> {
        if phase == Phase::Export && self.export {
            fs::create_dir_all(ctx.output)?;
            copy_dir_recursive(ctx.workspace, ctx.output)?;
            tracing::info!(phase = %phase, path = %ctx.output.display(), "output written");
        }
        Ok(Vec::new())
    }
}

fn stage_asset(path: &Path, ctx: &Context<'_>) -> Result<Change, PluginError> {
    let relative = ctx.relative(path);
    let staged = ctx.workspace.join(relative);
    if let Some(parent) = staged.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(path, &staged)?;
    Ok(Change::new(NAME, Phase::Assets, path).with_output(ctx.output.join(relative)))
}

/// Render one composed document. Failures stay with the document.
fn render(path: &Path, node: &Node, ctx: &Context<'_>) -> Change {
    let render_config = &ctx.config.render;
    let mut renderer = Renderer::new(node.clone())
        .with_config(render_config.base_scope())
        .with_separator(render_config.attrib_separator.clone());
    let result = renderer.serialize(None);

    let warnings: Vec<String> = renderer
        .diagnostics()
        .iter()
        .map(ToString::to_string)
        .collect();
    let change = Change::new(NAME, Phase::Render, path).with_warnings(warnings);
    match result {
        Ok(doc) => change.with_doc(doc),
        Err(err) => {
            tracing::error!(phase = %Phase::Render, path = %path.display(), error = %err, "render failed");
            change.with_failure(err.to_string())
        }
    }
}

fn export(path: &Path, node: &Node, doc: &str, ctx: &Context<'_>) -> Result<Option<Change>, PluginError> {
    let Some(url) = document_url(node) else {
        tracing::warn!(phase = %Phase::Export, path = %path.display(), "document has no url; not written");
        return Ok(None);
    };
    let staged = ctx.workspace.join(&url);
    if let Some(parent) = staged.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&staged, format!("{doc}\n"))?;
    tracing::debug!(phase = %Phase::Export, path = %path.display(), url = %url, "staged");
    Ok(Some(
        Change::new(NAME, Phase::Export, path).with_output(ctx.output.join(url)),
    ))
}

/// Copy every file below `src` into `dst`, creating directories as needed.
pub(crate) fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            fs::create_dir_all(&target)?;
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::pipeline::DOCUMENT_TYPE;
    use crate::registry::attach;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Dirs {
        _tmp: TempDir,
        root: PathBuf,
        workspace: PathBuf,
        output: PathBuf,
    }

    fn dirs() -> Dirs {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("site");
        let workspace = tmp.path().join("ws");
        let output = tmp.path().join("out");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&workspace).unwrap();
        Dirs {
            _tmp: tmp,
            root,
            workspace,
            output,
        }
    }

    fn with_context<T>(dirs: &Dirs, f: impl FnOnce(&Context<'_>) -> T) -> T {
        let config = SiteConfig::default();
        let states = BTreeMap::new();
        let roots = [dirs.root.clone()];
        let ctx = Context {
            config: &config,
            roots: &roots,
            root: &dirs.root,
            workspace: &dirs.workspace,
            output: &dirs.output,
            states: &states,
        };
        f(&ctx)
    }

    fn loaded(dirs: &Dirs, file: &str, source: &str) -> (PathBuf, Node) {
        let path = dirs.root.join(file);
        let mut node: Node = toml::from_str(source).unwrap();
        attach(&mut node, &path, &dirs.root).unwrap();
        (path, node)
    }

    #[test]
    fn render_produces_doc() {
        let dirs = dirs();
        let (path, node) = loaded(&dirs, "a.toml", "[doc.p]\nspan = \"{metadata[title]}\"");
        let change = with_context(&dirs, |ctx| render(&path, &node, ctx));
        assert_eq!(change.doc.as_deref(), Some("<p>\n<span>a.toml</span>\n</p>"));
        assert!(change.failure.is_none());
    }

    #[test]
    fn render_failure_is_recorded() {
        let dirs = dirs();
        let (path, node) = loaded(&dirs, "a.toml", "[doc]\np = \"{missing}\"");
        let change = with_context(&dirs, |ctx| render(&path, &node, ctx));
        assert!(change.doc.is_none());
        assert!(change.failure.unwrap().contains("missing"));
    }

    #[test]
    fn render_collects_option_warnings() {
        let dirs = dirs();
        let (path, node) = loaded(&dirs, "a.toml", "[doc.p]\nconfig = {tag_mode = \"bogus\"}\nb = \"x\"");
        let change = with_context(&dirs, |ctx| render(&path, &node, ctx));
        assert!(change.doc.is_some());
        assert_eq!(change.warnings.len(), 1);
        assert!(change.warnings[0].contains("bogus"));
    }

    #[test]
    fn export_stages_by_url() {
        let dirs = dirs();
        let (path, node) = loaded(&dirs, "guide/Install Notes.toml", "");
        let change = with_context(&dirs, |ctx| export(&path, &node, "<p>x</p>", ctx))
            .unwrap()
            .unwrap();
        let staged = dirs.workspace.join("guide/install-notes.html");
        assert_eq!(fs::read_to_string(staged).unwrap(), "<p>x</p>\n");
        assert_eq!(change.output, Some(dirs.output.join("guide/install-notes.html")));
    }

    #[test]
    fn assets_are_staged_then_copied() {
        let dirs = dirs();
        let asset = dirs.root.join("css/site.css");
        fs::create_dir_all(asset.parent().unwrap()).unwrap();
        fs::write(&asset, "body {}").unwrap();

        let mut writer = Writer::new();
        let state = State {
            media_type: Some("text/css".into()),
            ..State::default()
        };
        with_context(&dirs, |ctx| {
            writer.visit(Phase::Assets, &asset, &state, ctx).unwrap();
            writer.finish(Phase::Export, ctx).unwrap();
        });
        assert_eq!(
            fs::read_to_string(dirs.output.join("css/site.css")).unwrap(),
            "body {}"
        );
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dirs = dirs();
        let (path, node) = loaded(&dirs, "a.toml", "[doc]\np = \"x\"");
        let state = State {
            media_type: Some(DOCUMENT_TYPE.into()),
            node: Some(node),
            doc: Some("<p>x</p>".into()),
            ..State::default()
        };
        let mut writer = Writer::dry_run();
        with_context(&dirs, |ctx| {
            assert!(writer.visit(Phase::Export, &path, &state, ctx).unwrap().is_empty());
            writer.finish(Phase::Export, ctx).unwrap();
        });
        assert!(!dirs.output.exists());
    }
}
