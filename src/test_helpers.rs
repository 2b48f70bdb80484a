//! Shared test utilities for the tomlsite test suite.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let (report, out) = build_fixtures(&tmp);
//!
//! let install = find_document(&report, "guide/install.toml");
//! assert_eq!(install.title.as_deref(), Some("Install"));
//!
//! let html = read_page(&out, "guide/install.html");
//! assert_eq!(hrefs(&html, "nav root"), ["/index.html"]);
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::SiteConfig;
use crate::pipeline::{DocumentReport, RunReport};
use crate::plugins::{self, Mode};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to `<tmp>/site` and return the temp dir.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    let site = tmp.path().join("site");
    std::fs::create_dir_all(&site).unwrap();
    crate::plugins::copy_dir_recursive(&fixtures, &site).unwrap();
    tmp
}

/// Build `<tmp>/site` into `<tmp>/out` with the default plugins.
pub fn build_fixtures(tmp: &TempDir) -> (RunReport, PathBuf) {
    let out = tmp.path().join("out");
    let mut pipeline = plugins::pipeline(SiteConfig::default(), Mode::Build);
    let report = pipeline.run(&[tmp.path().join("site")], &out).unwrap();
    (report, out)
}

// =========================================================================
// Report lookups — panics with a clear message on miss
// =========================================================================

/// Find a document by source path relative to the build root. Panics if not found.
pub fn find_document<'a>(report: &'a RunReport, source: &str) -> &'a DocumentReport {
    report.document(source).unwrap_or_else(|| {
        let sources: Vec<String> = report
            .documents
            .iter()
            .map(|d| d.source.display().to_string())
            .collect();
        panic!("document '{source}' not found. Available: {sources:?}")
    })
}

/// Read a written page. Panics with the files present if missing.
pub fn read_page(out: &Path, url: &str) -> String {
    std::fs::read_to_string(out.join(url)).unwrap_or_else(|err| {
        let files: Vec<String> = walkdir::WalkDir::new(out)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().strip_prefix(out).unwrap().display().to_string())
            .collect();
        panic!("cannot read page '{url}': {err}. Available: {files:?}")
    })
}

// =========================================================================
// HTML helpers
// =========================================================================

/// `href`s of every navigation link with the given class, in page order.
pub fn hrefs(html: &str, class: &str) -> Vec<String> {
    let marker = format!("class=\"{class}\" href=\"");
    html.lines()
        .filter_map(|line| {
            let start = line.find(&marker)? + marker.len();
            let end = line[start..].find('"')?;
            Some(line[start..start + end].to_string())
        })
        .collect()
}

/// Number of times `href="<target>"` occurs in a page.
pub fn count_href(html: &str, target: &str) -> usize {
    html.matches(&format!("href=\"{target}\"")).count()
}
