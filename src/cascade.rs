//! Scoped rendering options.
//!
//! The renderer pushes one overlay per subtree it enters (the subtree's
//! `config` table, possibly empty) and pops it on the way out. Lookups walk
//! the stack from the most recent overlay down to the base configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::node::{Node, Value, scalar_text};

/// Option name controlling how tags are emitted.
pub const TAG_MODE: &str = "tag_mode";

/// How the renderer emits the tag for an element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagMode {
    /// Start tag only.
    Open,
    /// Start tag, content, end tag.
    #[default]
    Pair,
    /// A single self-closing tag. Text content is dropped.
    Void,
}

impl TagMode {
    pub const NAMES: &'static [&'static str] = &["open", "pair", "void"];

    pub fn as_str(self) -> &'static str {
        match self {
            TagMode::Open => "open",
            TagMode::Pair => "pair",
            TagMode::Void => "void",
        }
    }
}

impl fmt::Display for TagMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagMode {
    type Err = InvalidOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TagMode::Open),
            "pair" => Ok(TagMode::Pair),
            "void" => Ok(TagMode::Void),
            other => Err(InvalidOption::new(TAG_MODE, other, TagMode::NAMES)),
        }
    }
}

/// A recognised option holding a value outside its allowed set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{option}: {value:?} is not one of {}", .allowed.join(", "))]
pub struct InvalidOption {
    pub option: String,
    pub value: String,
    pub allowed: &'static [&'static str],
}

impl InvalidOption {
    fn new(option: &str, value: &str, allowed: &'static [&'static str]) -> Self {
        Self {
            option: option.to_string(),
            value: value.to_string(),
            allowed,
        }
    }
}

/// Check the options of one overlay. Unknown options are ignored.
pub fn validate(overlay: &Node) -> Vec<InvalidOption> {
    let mut invalid = Vec::new();
    if let Some(value) = overlay.get(TAG_MODE) {
        let text = match value {
            Value::String(s) => s.clone(),
            other => scalar_text(other).unwrap_or_else(|| other.type_str().to_string()),
        };
        if let Err(e) = text.parse::<TagMode>() {
            invalid.push(e);
        }
    }
    invalid
}

/// A stack of option overlays on top of a base configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigCascade {
    base: Node,
    scopes: Vec<Node>,
}

impl ConfigCascade {
    pub fn new(base: Node) -> Self {
        Self {
            base,
            scopes: Vec::new(),
        }
    }

    /// Number of overlays currently pushed.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push(&mut self, overlay: Node) {
        self.scopes.push(overlay);
    }

    /// Pop the most recent overlay. The base configuration is never popped.
    pub fn pop(&mut self) -> Option<Node> {
        self.scopes.pop()
    }

    /// Resolve an option from the most recent overlay that sets it.
    pub fn get(&self, option: &str) -> Option<&Value> {
        self.scopes
            .iter()
            .rev()
            .chain(std::iter::once(&self.base))
            .find_map(|scope| scope.get(option))
    }

    /// Active tag mode; an unset or unrecognised value means [`TagMode::Pair`].
    pub fn tag_mode(&self) -> TagMode {
        self.get(TAG_MODE)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay(text: &str) -> Node {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn empty_cascade_defaults_to_pair() {
        let cascade = ConfigCascade::default();
        assert_eq!(cascade.tag_mode(), TagMode::Pair);
        assert_eq!(cascade.depth(), 0);
    }

    #[test]
    fn base_configuration_applies_without_overlays() {
        let cascade = ConfigCascade::new(overlay("tag_mode = \"open\""));
        assert_eq!(cascade.tag_mode(), TagMode::Open);
    }

    #[test]
    fn most_recent_overlay_wins() {
        let mut cascade = ConfigCascade::new(overlay("tag_mode = \"open\""));
        cascade.push(overlay("tag_mode = \"void\""));
        cascade.push(Node::new());
        assert_eq!(cascade.tag_mode(), TagMode::Void);
        cascade.push(overlay("tag_mode = \"pair\""));
        assert_eq!(cascade.tag_mode(), TagMode::Pair);
        cascade.pop();
        cascade.pop();
        assert_eq!(cascade.tag_mode(), TagMode::Void);
        cascade.pop();
        assert_eq!(cascade.tag_mode(), TagMode::Open);
    }

    #[test]
    fn pop_never_removes_base() {
        let mut cascade = ConfigCascade::new(overlay("tag_mode = \"void\""));
        assert!(cascade.pop().is_none());
        assert_eq!(cascade.tag_mode(), TagMode::Void);
    }

    #[test]
    fn invalid_value_falls_back_to_pair() {
        let mut cascade = ConfigCascade::new(overlay("tag_mode = \"open\""));
        cascade.push(overlay("tag_mode = \"bogus\""));
        assert_eq!(cascade.tag_mode(), TagMode::Pair);
    }

    #[test]
    fn other_options_resolve_through_the_stack() {
        let mut cascade = ConfigCascade::new(overlay("lang = \"en\""));
        cascade.push(overlay("tag_mode = \"void\""));
        assert_eq!(cascade.get("lang").and_then(Value::as_str), Some("en"));
        assert!(cascade.get("missing").is_none());
    }

    #[test]
    fn validate_names_the_offending_value() {
        let invalid = validate(&overlay("tag_mode = \"bogus\""));
        assert_eq!(invalid.len(), 1);
        let message = invalid[0].to_string();
        assert!(message.contains("\"bogus\""), "{message}");
        assert!(message.contains("open, pair, void"), "{message}");
    }

    #[test]
    fn validate_rejects_non_string_values() {
        let invalid = validate(&overlay("tag_mode = 3"));
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].value, "3");
    }

    #[test]
    fn validate_accepts_known_values_and_ignores_unknown_options() {
        assert!(validate(&overlay("tag_mode = \"void\"\nlang = \"en\"")).is_empty());
        assert!(validate(&Node::new()).is_empty());
    }

    #[test]
    fn tag_mode_round_trips_names() {
        for name in TagMode::NAMES {
            let mode: TagMode = name.parse().unwrap();
            assert_eq!(mode.to_string(), *name);
        }
    }
}
