//! Per-path state and the changes plugins propose to it.

use serde::Serialize;
use std::path::PathBuf;

use super::Phase;
use crate::node::Node;

/// Media type of TOML template documents.
pub const DOCUMENT_TYPE: &str = "application/toml";

/// Everything known about one discovered path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    pub media_type: Option<String>,
    /// Raw document text.
    pub text: Option<String>,
    /// Parsed, later composed, template.
    pub node: Option<Node>,
    /// Rendered HTML.
    pub doc: Option<String>,
    /// Final destination below the output directory.
    pub output: Option<PathBuf>,
    /// Why the document was skipped.
    pub failure: Option<String>,
    pub warnings: Vec<String>,
}

impl State {
    pub fn is_document(&self) -> bool {
        self.media_type.as_deref() == Some(DOCUMENT_TYPE)
    }

    /// Documents still in play: discovered as TOML and not failed.
    pub fn is_live_document(&self) -> bool {
        self.is_document() && self.failure.is_none()
    }

    /// Fold a change into this state.
    ///
    /// `node` updates top-level keys; warnings accumulate; every other field
    /// is replaced when the change carries it.
    pub fn apply(&mut self, change: Change) {
        if let Some(media_type) = change.media_type {
            self.media_type = Some(media_type);
        }
        if let Some(text) = change.text {
            self.text = Some(text);
        }
        if let Some(update) = change.node {
            match &mut self.node {
                Some(node) => {
                    for (key, value) in update {
                        node.insert(key, value);
                    }
                }
                None => self.node = Some(update),
            }
        }
        if let Some(doc) = change.doc {
            self.doc = Some(doc);
        }
        if let Some(output) = change.output {
            self.output = Some(output);
        }
        if let Some(failure) = change.failure {
            self.failure = Some(failure);
        }
        self.warnings.extend(change.warnings);
    }
}

/// A plugin's proposed update to one path.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub plugin: &'static str,
    pub phase: Phase,
    pub path: PathBuf,
    pub media_type: Option<String>,
    pub text: Option<String>,
    pub node: Option<Node>,
    pub doc: Option<String>,
    pub output: Option<PathBuf>,
    pub failure: Option<String>,
    pub warnings: Vec<String>,
}

impl Change {
    pub fn new(plugin: &'static str, phase: Phase, path: impl Into<PathBuf>) -> Self {
        Self {
            plugin,
            phase,
            path: path.into(),
            media_type: None,
            text: None,
            node: None,
            doc: None,
            output: None,
            failure: None,
            warnings: Vec::new(),
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.node = Some(node);
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_failure(mut self, failure: impl Into<String>) -> Self {
        self.failure = Some(failure.into());
        self
    }

    pub fn with_warnings(mut self, warnings: impl IntoIterator<Item = String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    /// Names of the fields this change updates.
    pub fn fields(&self) -> Vec<&'static str> {
        [
            ("media_type", self.media_type.is_some()),
            ("text", self.text.is_some()),
            ("node", self.node.is_some()),
            ("doc", self.doc.is_some()),
            ("output", self.output.is_some()),
            ("failure", self.failure.is_some()),
            ("warnings", !self.warnings.is_empty()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    pub fn event(&self) -> Event {
        Event {
            plugin: self.plugin,
            phase: self.phase,
            path: self.path.clone(),
            fields: self.fields(),
        }
    }
}

/// Record of one folded change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub plugin: &'static str,
    pub phase: Phase,
    pub path: PathBuf,
    pub fields: Vec<&'static str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(source: &str) -> Node {
        toml::from_str(source).unwrap()
    }

    #[test]
    fn document_by_media_type() {
        let mut state = State::default();
        assert!(!state.is_document());
        state.media_type = Some(DOCUMENT_TYPE.into());
        assert!(state.is_live_document());
        state.failure = Some("parse error".into());
        assert!(state.is_document());
        assert!(!state.is_live_document());
    }

    #[test]
    fn apply_updates_node_at_top_level() {
        let mut state = State {
            node: Some(table("a = 1\n[doc]\nx = 1")),
            ..State::default()
        };
        let change = Change::new("t", Phase::Enrich, "/p").with_node(table("[doc]\ny = 2"));
        state.apply(change);

        let node = state.node.unwrap();
        assert_eq!(node["a"].as_integer(), Some(1));
        assert!(node["doc"].get("x").is_none());
        assert_eq!(node["doc"]["y"].as_integer(), Some(2));
    }

    #[test]
    fn apply_overwrites_text_and_appends_warnings() {
        let mut state = State {
            text: Some("old".into()),
            warnings: vec!["first".into()],
            ..State::default()
        };
        state.apply(
            Change::new("t", Phase::Filter, "/p")
                .with_text("new")
                .with_warnings(["second".to_string()]),
        );
        assert_eq!(state.text.as_deref(), Some("new"));
        assert_eq!(state.warnings, ["first", "second"]);
    }

    #[test]
    fn apply_empty_change_is_noop() {
        let mut state = State {
            doc: Some("<p>".into()),
            ..State::default()
        };
        let before = state.clone();
        state.apply(Change::new("t", Phase::Render, "/p"));
        assert_eq!(state, before);
    }

    #[test]
    fn fields_name_what_changed() {
        let change = Change::new("t", Phase::Export, "/p")
            .with_doc("x")
            .with_output("/out/p.html");
        assert_eq!(change.fields(), ["doc", "output"]);
        assert!(!change.is_empty());
        assert!(Change::new("t", Phase::Export, "/p").is_empty());
    }

    #[test]
    fn event_mirrors_change() {
        let event = Change::new("finder", Phase::Survey, "/site/a.toml")
            .with_media_type(DOCUMENT_TYPE)
            .event();
        assert_eq!(event.plugin, "finder");
        assert_eq!(event.phase, Phase::Survey);
        assert_eq!(event.fields, ["media_type"]);
    }
}
