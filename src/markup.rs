//! Expansion of `blocks` entries into HTML fragments.
//!
//! The renderer hands each string in a `blocks` list to a [`BlockExpander`]
//! and splices the returned fragment into its output unchanged. The default
//! expander treats blocks as Markdown.

use pulldown_cmark::{Options, Parser, html};
use thiserror::Error;

use crate::node::PathSegment;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ExpandError {
    message: String,
}

impl ExpandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Turns raw block text into an HTML fragment.
///
/// `path` locates the block within the render walk; list indexes on it can
/// be used to build stable element ids.
pub trait BlockExpander {
    fn expand(&self, text: &str, path: &[PathSegment]) -> Result<String, ExpandError>;
}

/// Renders blocks as CommonMark with tables and strikethrough.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownExpander;

impl BlockExpander for MarkdownExpander {
    fn expand(&self, text: &str, _path: &[PathSegment]) -> Result<String, ExpandError> {
        let source = dedent(text);
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        let mut out = String::new();
        html::push_html(&mut out, Parser::new_ext(&source, options));
        Ok(out.trim_end().to_string())
    }
}

/// Remove the indentation shared by every non-blank line.
///
/// Multi-line TOML strings are usually indented to match the surrounding
/// document; Markdown would read that as a code block.
pub fn dedent(text: &str) -> String {
    let margin = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);
    text.lines()
        .map(|line| {
            line.char_indices()
                .nth(margin)
                .map_or("", |(start, _)| &line[start..])
                .trim_end()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedent_removes_common_margin() {
        let text = "    first\n      nested\n\n    last";
        assert_eq!(dedent(text), "first\n  nested\n\nlast");
    }

    #[test]
    fn dedent_leaves_flush_text_alone() {
        assert_eq!(dedent("a\n  b"), "a\n  b");
        assert_eq!(dedent(""), "");
    }

    #[test]
    fn dedent_counts_wide_whitespace_as_one_column() {
        assert_eq!(dedent("\u{3000}wide\n keep"), "wide\nkeep");
        assert_eq!(dedent("\u{3000}\u{3000}deep\n\u{3000}less"), "\u{3000}deep\nless");
        let html = MarkdownExpander.expand("\u{3000}first line\n keep", &[]).unwrap();
        assert_eq!(html, "<p>first line\nkeep</p>");
    }

    #[test]
    fn markdown_paragraphs() {
        let html = MarkdownExpander.expand("Hello *world*", &[]).unwrap();
        assert_eq!(html, "<p>Hello <em>world</em></p>");
    }

    #[test]
    fn markdown_indented_block_is_not_code() {
        let html = MarkdownExpander
            .expand("\n    - one\n    - two\n    ", &[])
            .unwrap();
        assert!(html.starts_with("<ul>"), "{html}");
        assert!(html.contains("<li>two</li>"), "{html}");
        assert!(!html.contains("<pre>"), "{html}");
    }
}
