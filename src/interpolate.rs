//! Field substitution in leaf strings.
//!
//! Leaf text may reference the template's top-level sections:
//!
//! | Syntax | Resolves to |
//! |--------|-------------|
//! | `{metadata[title]}` | key `title` of table `metadata` |
//! | `{registry.parts[0]}` | first element of `registry.parts` |
//! | `{{` / `}}` | literal brace |
//!
//! A conversion or format suffix (`{name!r}`, `{name:>10}`) is accepted and
//! ignored. A reference that does not resolve to a scalar is an error; text
//! is never silently dropped.

use thiserror::Error;

use crate::node::{Node, Value, scalar_text};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterpolateError {
    #[error("missing key '{0}'")]
    MissingKey(String),
    #[error("'{0}' is not a scalar value")]
    NotScalar(String),
    #[error("unbalanced braces in {0:?}")]
    Unbalanced(String),
}

/// Substitute every `{field}` in `text` from `context`.
pub fn interpolate(text: &str, context: &Node) -> Result<String, InterpolateError> {
    if !text.contains(['{', '}']) {
        return Ok(text.to_string());
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                let mut depth = 0usize;
                loop {
                    match chars.next() {
                        Some('[') => {
                            depth += 1;
                            field.push('[');
                        }
                        Some(']') => {
                            depth = depth.saturating_sub(1);
                            field.push(']');
                        }
                        Some('}') if depth == 0 => break,
                        Some(other) => field.push(other),
                        None => return Err(InterpolateError::Unbalanced(text.to_string())),
                    }
                }
                out.push_str(&resolve(&field, context)?);
            }
            '}' => return Err(InterpolateError::Unbalanced(text.to_string())),
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Resolve one field reference such as `metadata[title]`.
fn resolve(field: &str, context: &Node) -> Result<String, InterpolateError> {
    let field = strip_suffix(field);
    let steps = parse_field(field).ok_or_else(|| InterpolateError::Unbalanced(field.to_string()))?;
    let Some((first, rest)) = steps.split_first() else {
        return Err(InterpolateError::MissingKey(field.to_string()));
    };

    let missing = || InterpolateError::MissingKey(field.to_string());
    let mut value = context.get(first.as_str()).ok_or_else(missing)?;
    for step in rest {
        value = match value {
            Value::Table(table) => table.get(step.as_str()),
            Value::Array(items) => step.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
        .ok_or_else(missing)?;
    }
    scalar_text(value).ok_or_else(|| InterpolateError::NotScalar(field.to_string()))
}

/// Drop a `!conversion` or `:format` suffix outside brackets.
fn strip_suffix(field: &str) -> &str {
    let mut depth = 0usize;
    for (i, c) in field.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '!' | ':' if depth == 0 => return &field[..i],
            _ => {}
        }
    }
    field
}

/// Split `a[b].c[0]` into `["a", "b", "c", "0"]`.
fn parse_field(field: &str) -> Option<Vec<String>> {
    let mut steps = Vec::new();
    let mut current = String::new();
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        match c {
            '.' => steps.push(std::mem::take(&mut current)),
            '[' => {
                if !current.is_empty() {
                    steps.push(std::mem::take(&mut current));
                }
                let key: String = chars.by_ref().take_while(|&c| c != ']').collect();
                steps.push(key);
            }
            ']' => return None,
            other => current.push(other),
        }
    }
    if !current.is_empty() {
        steps.push(current);
    }
    if steps.iter().any(String::is_empty) {
        return None;
    }
    Some(steps)
}
