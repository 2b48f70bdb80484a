//! CLI output formatting for a pipeline run.
//!
//! Output is information-centric: every document is listed by position and
//! title, with its source and any diagnostics as indented context lines.
//!
//! ```text
//! Documents
//! 001 Home → index.html
//!     Source: index.toml
//! 002 Install → guide/install.html
//!     Source: guide/install.toml
//!     Warning: "bogus" is not one of open, pair, void
//! 003 broken.toml (failed)
//!     Source: broken.toml
//!     Error: parse error: expected `]`
//!
//! Assets
//! 001 style.css → style.css
//!     Type: text/css
//!
//! Built 3 documents, 1 asset, 1 failed
//! ```
//!
//! `format_*` functions return lines and do no I/O; `print_*` wrappers write
//! them to stdout.

use std::path::Path;

use crate::pipeline::{DocumentReport, RunReport};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Forward-slash display of a relative path.
fn posix(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}

/// Header line of a document: title, then where it went.
fn document_header(index: usize, doc: &DocumentReport) -> String {
    let title = doc
        .title
        .clone()
        .unwrap_or_else(|| posix(&doc.source));
    match (&doc.failure, &doc.output) {
        (Some(_), _) => format!("{} {} (failed)", format_index(index), title),
        (None, Some(output)) => format!("{} {} → {}", format_index(index), title, posix(output)),
        (None, None) => format!("{} {}", format_index(index), title),
    }
}

// ============================================================================
// Build / check output
// ============================================================================

/// Format a run report for display.
pub fn format_run_output(report: &RunReport) -> Vec<String> {
    let mut lines = Vec::new();

    if !report.documents.is_empty() {
        lines.push("Documents".to_string());
        for (i, doc) in report.documents.iter().enumerate() {
            lines.push(document_header(i + 1, doc));
            lines.push(format!("{}Source: {}", indent(1), posix(&doc.source)));
            for warning in &doc.warnings {
                lines.push(format!("{}Warning: {}", indent(1), warning));
            }
            if let Some(failure) = &doc.failure {
                // Parser messages can span lines; keep the first.
                let first = failure.lines().next().unwrap_or_default();
                lines.push(format!("{}Error: {}", indent(1), first));
            }
        }
    }

    if !report.assets.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("Assets".to_string());
        for (i, asset) in report.assets.iter().enumerate() {
            let source = posix(&asset.source);
            match &asset.output {
                Some(output) => lines.push(format!(
                    "{} {} → {}",
                    format_index(i + 1),
                    source,
                    posix(output)
                )),
                None => lines.push(format!("{} {}", format_index(i + 1), source)),
            }
            lines.push(format!("{}Type: {}", indent(1), asset.media_type));
        }
    }

    if !report.failures.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("Aborted phases".to_string());
        for failure in &report.failures {
            lines.push(format!("{} {}: {}", failure.phase, failure.plugin, failure.message));
            lines.push(format!("{}Path: {}", indent(1), failure.path.display()));
        }
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    let failed = report.failed_documents().count();
    let mut summary = format!(
        "Built {}, {}",
        plural(report.documents.len(), "document", "documents"),
        plural(report.assets.len(), "asset", "assets"),
    );
    if failed > 0 {
        summary.push_str(&format!(", {failed} failed"));
    }
    lines.push(summary);
    lines
}

pub fn print_run_output(report: &RunReport) {
    for line in format_run_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
