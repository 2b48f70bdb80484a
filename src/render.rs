//! Document renderer.
//!
//! Walks the `doc` subtree of a composed template and produces HTML one line
//! at a time. Rendering options cascade through a [`ConfigCascade`]: every
//! node entered pushes its `config` table (an empty overlay when it has
//! none) and pops it when the node is finished.
//!
//! ## Emission Order
//!
//! For a node reached through key `k`:
//!
//! ```text
//! <k attrs>            opening tag (open, pair) or <k attrs /> (void)
//! ...blocks            expanded by the BlockExpander, spliced verbatim
//! <leaf>text</leaf>    one per scalar value, honouring the tag mode
//! ...list elements     one walk per table element, no wrapper tag
//! ...child tables      one walk per table value
//! </k>                 closing tag (pair only)
//! ```
//!
//! The root of the walk and list elements emit no tag of their own.
//! `attrib` applies to the tags emitted for this node only and is not
//! inherited by child tables.
//!
//! ## Laziness and Cleanup
//!
//! [`Walk`] is an iterator driven by an explicit frame stack, so a caller
//! can stop early. Whatever scopes are still pushed are popped when the
//! walk is dropped, and a failing walk unwinds before yielding its error,
//! so the cascade depth after a walk always equals the depth before it.

use maud::html;
use std::collections::VecDeque;
use thiserror::Error;

use crate::cascade::{ConfigCascade, InvalidOption, TagMode, validate};
use crate::interpolate::{InterpolateError, interpolate};
use crate::markup::{BlockExpander, ExpandError, MarkdownExpander};
use crate::node::{DOC, Node, PathSegment, Reserved, Value, display_path, scalar_text};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("cannot interpolate text at '{path}': {source}")]
    Interpolate {
        path: String,
        source: InterpolateError,
    },
    #[error("cannot expand block at '{path}': {source}")]
    Expand { path: String, source: ExpandError },
    #[error("'doc' must be a table, found {found}")]
    DocNotTable { found: &'static str },
}

/// HTML-escape text for element content and attribute values.
pub fn escape(text: &str) -> String {
    html! { (text) }.into_string()
}

/// Render an `attrib` table as ` k="v"` pairs joined by `separator`.
pub fn render_attrs(attrib: &Node, separator: &str) -> String {
    let pairs: Vec<String> = attrib
        .iter()
        .filter_map(|(key, value)| {
            scalar_text(value).map(|text| format!("{key}=\"{}\"", escape(&text)))
        })
        .collect();
    if pairs.is_empty() {
        String::new()
    } else {
        format!(" {}", pairs.join(separator))
    }
}

/// Renders one template.
pub struct Renderer {
    template: Node,
    cascade: ConfigCascade,
    expander: Box<dyn BlockExpander>,
    separator: String,
    diagnostics: Vec<InvalidOption>,
}

impl Renderer {
    pub fn new(template: Node) -> Self {
        Self {
            template,
            cascade: ConfigCascade::default(),
            expander: Box::new(MarkdownExpander),
            separator: " ".to_string(),
            diagnostics: Vec::new(),
        }
    }

    /// Base configuration under every pushed scope.
    pub fn with_config(mut self, base: Node) -> Self {
        self.cascade = ConfigCascade::new(base);
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_expander(mut self, expander: impl BlockExpander + 'static) -> Self {
        self.expander = Box::new(expander);
        self
    }

    /// Scopes currently pushed on the cascade.
    pub fn depth(&self) -> usize {
        self.cascade.depth()
    }

    /// Invalid option values seen so far, one per offending `config` table.
    pub fn diagnostics(&self) -> &[InvalidOption] {
        &self.diagnostics
    }

    /// Start a lazy walk of `tree`, interpolating leaves from `context`.
    pub fn walk<'a>(&'a mut self, tree: &'a Node, context: &'a Node) -> Walk<'a> {
        let mut walk = Walk {
            renderer: self,
            context,
            frames: Vec::new(),
        };
        walk.enter(tree, Vec::new());
        walk
    }

    /// Render the whole template to a string.
    ///
    /// `overrides` replace top-level sections of the template before
    /// rendering. The `doc` section is walked; every other section is the
    /// interpolation context.
    pub fn serialize(&mut self, overrides: Option<Node>) -> Result<String, RenderError> {
        for (key, value) in overrides.unwrap_or_default() {
            self.template.insert(key, value);
        }
        let mut context = self.template.clone();
        let tree = match context.remove(DOC) {
            Some(Value::Table(tree)) => tree,
            Some(other) => {
                return Err(RenderError::DocNotTable {
                    found: other.type_str(),
                });
            }
            None => Node::new(),
        };
        let lines = self.walk(&tree, &context).collect::<Result<Vec<_>, _>>()?;
        Ok(lines
            .into_iter()
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

enum Task<'a> {
    Line(String),
    Block(&'a str),
    Leaf(&'a str, &'a Value),
    Enter(&'a Node, Vec<PathSegment>),
}

struct Frame<'a> {
    path: Vec<PathSegment>,
    mode: TagMode,
    attrs: String,
    tasks: VecDeque<Task<'a>>,
}

enum Step<'a> {
    Emit(Result<String, RenderError>),
    Enter(&'a Node, Vec<PathSegment>),
}

/// A lazy render walk. See the module docs.
pub struct Walk<'a> {
    renderer: &'a mut Renderer,
    context: &'a Node,
    frames: Vec<Frame<'a>>,
}

impl<'a> Walk<'a> {
    fn enter(&mut self, node: &'a Node, path: Vec<PathSegment>) {
        let mut attrib: Option<&Node> = None;
        let mut blocks: Vec<&'a str> = Vec::new();
        let mut overlay = Node::new();

        for reserved in Reserved::ALL {
            let Some(value) = node.get(reserved.key()) else {
                continue;
            };
            match reserved {
                Reserved::Config => {
                    if let Some(config) = value.as_table() {
                        overlay = config.clone();
                    }
                    for invalid in validate(&overlay) {
                        tracing::warn!(path = %display_path(&path), "invalid {}", invalid);
                        self.renderer.diagnostics.push(invalid);
                    }
                }
                Reserved::Attrib => attrib = value.as_table(),
                Reserved::Blocks => match value {
                    Value::Array(items) => blocks.extend(items.iter().filter_map(Value::as_str)),
                    Value::String(text) => blocks.push(text),
                    _ => {}
                },
            }
        }

        self.renderer.cascade.push(overlay);
        let mode = self.renderer.cascade.tag_mode();
        let attrs = attrib
            .map(|a| render_attrs(a, &self.renderer.separator))
            .unwrap_or_default();

        let tag = match path.last() {
            Some(PathSegment::Key(key)) => Some(key.clone()),
            _ => None,
        };
        let mut tasks = VecDeque::new();
        if let Some(tag) = &tag {
            tasks.push_back(Task::Line(match mode {
                TagMode::Open | TagMode::Pair => format!("<{tag}{attrs}>"),
                TagMode::Void => format!("<{tag}{attrs} />"),
            }));
        }
        tasks.extend(blocks.into_iter().map(Task::Block));

        let children = node
            .iter()
            .filter(|(key, _)| Reserved::from_key(key).is_none());
        let mut lists = Vec::new();
        let mut tables = Vec::new();
        for (key, value) in children {
            match value {
                Value::Table(child) => {
                    tables.push(Task::Enter(child, vec![PathSegment::Key(key.clone())]));
                }
                Value::Array(items) => {
                    for (index, item) in items.iter().enumerate() {
                        match item {
                            Value::Table(child) => lists.push(Task::Enter(
                                child,
                                vec![PathSegment::Key(key.clone()), PathSegment::Index(index)],
                            )),
                            Value::Array(_) => {
                                tracing::debug!(
                                    path = %display_path(&path),
                                    key = %key,
                                    "nested array skipped"
                                );
                            }
                            scalar => tasks.push_back(Task::Leaf(key, scalar)),
                        }
                    }
                }
                scalar => tasks.push_back(Task::Leaf(key, scalar)),
            }
        }
        tasks.extend(lists);
        tasks.extend(tables);

        if let (Some(tag), TagMode::Pair) = (&tag, mode) {
            tasks.push_back(Task::Line(format!("</{tag}>")));
        }

        self.frames.push(Frame {
            path,
            mode,
            attrs,
            tasks,
        });
    }

    /// Pop every remaining frame along with its scope.
    fn unwind(&mut self) {
        while self.frames.pop().is_some() {
            self.renderer.cascade.pop();
        }
    }
}

fn leaf(
    tag: &str,
    value: &Value,
    frame: &Frame<'_>,
    context: &Node,
) -> Result<String, RenderError> {
    let attrs = &frame.attrs;
    match frame.mode {
        TagMode::Open => Ok(format!("<{tag}{attrs}>")),
        TagMode::Void => Ok(format!("<{tag}{attrs} />")),
        TagMode::Pair => {
            let text = match value {
                Value::String(text) => {
                    interpolate(text, context).map_err(|source| RenderError::Interpolate {
                        path: leaf_path(&frame.path, tag),
                        source,
                    })?
                }
                other => scalar_text(other).unwrap_or_default(),
            };
            Ok(format!("<{tag}{attrs}>{}</{tag}>", escape(&text)))
        }
    }
}

fn leaf_path(path: &[PathSegment], tag: &str) -> String {
    let mut full = path.to_vec();
    full.push(PathSegment::Key(tag.to_string()));
    display_path(&full)
}

impl Iterator for Walk<'_> {
    type Item = Result<String, RenderError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.frames.last_mut()?;
            let Some(task) = frame.tasks.pop_front() else {
                self.frames.pop();
                self.renderer.cascade.pop();
                continue;
            };
            let step = match task {
                Task::Line(line) => Step::Emit(Ok(line)),
                Task::Block(text) => Step::Emit(
                    self.renderer
                        .expander
                        .expand(text, &frame.path)
                        .map_err(|source| RenderError::Expand {
                            path: display_path(&frame.path),
                            source,
                        }),
                ),
                Task::Leaf(tag, value) => Step::Emit(leaf(tag, value, frame, self.context)),
                Task::Enter(child, suffix) => {
                    let mut path = frame.path.clone();
                    path.extend(suffix);
                    Step::Enter(child, path)
                }
            };
            match step {
                Step::Enter(child, path) => self.enter(child, path),
                Step::Emit(Ok(line)) => return Some(Ok(line)),
                Step::Emit(Err(err)) => {
                    self.unwind();
                    return Some(Err(err));
                }
            }
        }
    }
}

impl Drop for Walk<'_> {
    fn drop(&mut self) {
        self.unwind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Node {
        toml::from_str(text).unwrap()
    }

    fn render(text: &str) -> String {
        Renderer::new(parse(text)).serialize(None).unwrap()
    }

    struct FailingExpander;

    impl BlockExpander for FailingExpander {
        fn expand(&self, text: &str, _path: &[PathSegment]) -> Result<String, ExpandError> {
            Err(ExpandError::new(format!("cannot expand {text:?}")))
        }
    }

    struct PathExpander;

    impl BlockExpander for PathExpander {
        fn expand(&self, text: &str, path: &[PathSegment]) -> Result<String, ExpandError> {
            Ok(format!("<!-- {} -->{text}", display_path(path)))
        }
    }

    // =========================================================================
    // Escaping
    // =========================================================================

    #[test]
    fn escape_handles_markup_characters() {
        assert_eq!(escape("a&b"), "a&amp;b");
        assert_eq!(escape("<\"x\">"), "&lt;&quot;x&quot;&gt;");
    }

    #[test]
    fn attribute_values_are_escaped_once() {
        let html = render("[doc.p]\nattrib = {q = \"a&b\"}\ntext = \"x\"");
        assert!(html.contains("q=\"a&amp;b\""), "{html}");
        assert!(!html.contains("&amp;amp;"), "{html}");
    }

    #[test]
    fn render_attrs_uses_separator_in_mapping_order() {
        let attrib = parse("b = \"2\"\na = \"1\"");
        assert_eq!(render_attrs(&attrib, " "), " b=\"2\" a=\"1\"");
        assert_eq!(render_attrs(&attrib, "\n  "), " b=\"2\"\n  a=\"1\"");
        assert_eq!(render_attrs(&Node::new(), " "), "");
    }

    // =========================================================================
    // Tag modes
    // =========================================================================

    #[test]
    fn pair_mode_wraps_leaf_text() {
        let html = render("[doc.head]\ntitle = \"X\"");
        assert_eq!(html, "<head>\n<title>X</title>\n</head>");
    }

    #[test]
    fn void_mode_emits_single_self_closing_tag() {
        let html = render("[doc.head.meta]\nconfig = {tag_mode = \"void\"}\nattrib = {a = \"1\"}");
        assert_eq!(html.matches("<meta").count(), 1, "{html}");
        assert!(html.contains("<meta a=\"1\" />"), "{html}");
        assert!(!html.contains("</meta>"), "{html}");
        assert!(html.contains("</head>"), "{html}");
    }

    #[test]
    fn void_mode_drops_leaf_text() {
        let html = render("[doc.div]\nconfig = {tag_mode = \"void\"}\nbr = \"ignored\"");
        assert_eq!(html, "<div />\n<br />");
    }

    #[test]
    fn open_mode_emits_start_tags_only() {
        let html = render("[doc.ul]\nconfig = {tag_mode = \"open\"}\nli = [\"a\", \"b\"]");
        assert_eq!(html, "<ul>\n<li>\n<li>");
    }

    #[test]
    fn tag_mode_cascades_to_descendants() {
        let html = render(
            r#"
[doc.html]
config = {tag_mode = "open"}

[doc.html.body.main]
config = {tag_mode = "pair"}
p = "text"
"#,
        );
        assert_eq!(html, "<html>\n<body>\n<main>\n<p>text</p>\n</main>");
    }

    #[test]
    fn base_configuration_sets_default_mode() {
        let mut renderer = Renderer::new(parse("[doc.div]\nbr = \"x\""))
            .with_config(parse("tag_mode = \"void\""));
        assert_eq!(renderer.serialize(None).unwrap(), "<div />\n<br />");
    }

    #[test]
    fn invalid_tag_mode_warns_once_and_uses_pair() {
        let mut renderer = Renderer::new(parse(
            "[doc.div]\nconfig = {tag_mode = \"bogus\"}\np = \"X\"\n[doc.div.span]\nq = \"Y\"",
        ));
        let html = renderer.serialize(None).unwrap();
        assert_eq!(html, "<div>\n<p>X</p>\n<span>\n<q>Y</q>\n</span>\n</div>");
        assert_eq!(renderer.diagnostics().len(), 1);
        assert!(renderer.diagnostics()[0].to_string().contains("\"bogus\""));
    }

    // =========================================================================
    // Structure
    // =========================================================================

    #[test]
    fn attrib_applies_to_own_tags_only() {
        let html = render(
            r#"
[doc.section]
attrib = {class = "outer"}
h2 = "Title"

[doc.section.div]
p = "inner"
"#,
        );
        assert_eq!(
            html,
            "<section class=\"outer\">\n<h2 class=\"outer\">Title</h2>\n<div>\n<p>inner</p>\n</div>\n</section>"
        );
    }

    #[test]
    fn list_elements_have_no_wrapper_tag() {
        let html = render(
            r#"
[[doc.ul.li]]
attrib = {href = "/a.html"}
a = "A"

[[doc.ul.li]]
attrib = {href = "/b.html"}
a = "B"
"#,
        );
        assert_eq!(
            html,
            "<ul>\n<a href=\"/a.html\">A</a>\n<a href=\"/b.html\">B</a>\n</ul>"
        );
    }

    #[test]
    fn leaves_precede_lists_and_tables() {
        let html = render(
            r#"
[doc.body]
h1 = "h"
main = {p = "m"}
li = [{b = "l"}]
"#,
        );
        assert_eq!(
            html,
            "<body>\n<h1>h</h1>\n<b>l</b>\n<main>\n<p>m</p>\n</main>\n</body>"
        );
    }

    #[test]
    fn non_string_scalars_render_as_text() {
        assert_eq!(render("[doc]\ncount = 3\nflag = true"), "<count>3</count>\n<flag>true</flag>");
    }

    #[test]
    fn empty_doc_renders_nothing() {
        assert_eq!(render("[metadata]\ntitle = \"x\""), "");
    }

    // =========================================================================
    // Interpolation
    // =========================================================================

    #[test]
    fn leaves_are_interpolated_then_escaped() {
        let html = render(
            r#"
[metadata]
title = "Tom & Jerry"

[doc.head]
title = "{metadata[title]}"
"#,
        );
        assert!(html.contains("<title>Tom &amp; Jerry</title>"), "{html}");
    }

    #[test]
    fn missing_interpolation_key_fails_the_render() {
        let mut renderer = Renderer::new(parse("[doc.head]\ntitle = \"{metadata[title]}\""));
        let err = renderer.serialize(None).unwrap_err();
        assert!(matches!(err, RenderError::Interpolate { .. }));
        assert!(err.to_string().contains("head.title"), "{err}");
        assert_eq!(renderer.depth(), 0);
    }

    #[test]
    fn overrides_replace_top_level_sections() {
        let mut renderer = Renderer::new(parse(
            "[metadata]\ntitle = \"old\"\n[doc]\nh1 = \"{metadata[title]}\"",
        ));
        let html = renderer
            .serialize(Some(parse("[metadata]\ntitle = \"new\"")))
            .unwrap();
        assert_eq!(html, "<h1>new</h1>");
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    #[test]
    fn blocks_follow_the_opening_tag() {
        let html = render(
            r#"
[doc.main]
h1 = "Heading"
blocks = ["Some *text*"]
"#,
        );
        assert_eq!(
            html,
            "<main>\n<p>Some <em>text</em></p>\n<h1>Heading</h1>\n</main>"
        );
    }

    #[test]
    fn block_expander_sees_the_walk_path() {
        let mut renderer = Renderer::new(parse(
            "[[doc.ol.li]]\nblocks = [\"one\"]\n[[doc.ol.li]]\nblocks = [\"two\"]",
        ))
        .with_expander(PathExpander);
        let html = renderer.serialize(None).unwrap();
        assert!(html.contains("<!-- ol.li.1 -->two"), "{html}");
    }

    // =========================================================================
    // Scope cleanup
    // =========================================================================

    #[test]
    fn complete_walk_restores_depth() {
        let tree = parse("[a]\nconfig = {tag_mode = \"open\"}\n[a.b.c]\nd = \"e\"");
        let context = Node::new();
        let mut renderer = Renderer::new(Node::new());
        let lines: Vec<String> = renderer
            .walk(&tree, &context)
            .collect::<Result<_, _>>()
            .unwrap();
        assert!(!lines.is_empty());
        assert_eq!(renderer.depth(), 0);
    }

    #[test]
    fn failed_block_expansion_restores_depth() {
        let tree = parse(
            r#"
[outer]
config = {tag_mode = "pair"}

[outer.inner]
config = {tag_mode = "open"}
blocks = ["boom"]
"#,
        );
        let context = Node::new();
        let mut renderer = Renderer::new(Node::new()).with_expander(FailingExpander);
        let before = renderer.depth();

        let mut walk = renderer.walk(&tree, &context);
        assert_eq!(walk.next().unwrap().unwrap(), "<outer>");
        assert_eq!(walk.next().unwrap().unwrap(), "<inner>");
        let err = walk.next().unwrap().unwrap_err();
        assert!(matches!(err, RenderError::Expand { .. }));
        assert!(walk.next().is_none());
        drop(walk);

        assert_eq!(renderer.depth(), before);
    }

    #[test]
    fn abandoned_walk_restores_depth() {
        let tree = parse("[a.b.c]\nd = \"e\"");
        let context = Node::new();
        let mut renderer = Renderer::new(Node::new());
        {
            let mut walk = renderer.walk(&tree, &context);
            assert_eq!(walk.next().unwrap().unwrap(), "<a>");
            assert_eq!(walk.next().unwrap().unwrap(), "<b>");
        }
        assert_eq!(renderer.depth(), 0);
    }

    #[test]
    fn handled_keys_are_never_emitted() {
        let html = render("[doc.div]\nconfig = {}\nattrib = {}\nblocks = []");
        for reserved in Reserved::ALL {
            assert!(!html.contains(reserved.key()), "{html}");
        }
        assert_eq!(html, "<div>\n</div>");
    }

    #[test]
    fn doc_that_is_not_a_table_fails() {
        let err = Renderer::new(parse("doc = \"x\""))
            .serialize(None)
            .unwrap_err();
        assert!(matches!(err, RenderError::DocNotTable { found: "string" }));
        assert!(err.to_string().contains("'doc' must be a table"));
    }

    #[test]
    fn missing_doc_renders_nothing() {
        assert_eq!(render("[metadata]\ntitle = \"t\""), "");
    }
}
