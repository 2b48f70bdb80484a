//! # tomlsite
//!
//! A static HTML builder for trees of TOML template documents. Every `.toml`
//! file is a document whose `doc` table is rendered to HTML: keys become
//! elements, strings become text, and the reserved keys `config`, `attrib` and
//! `blocks` steer how a subtree is emitted.
//!
//! ```toml
//! [doc.html.body]
//! attrib = { class = "page" }
//! h1 = "{metadata[title]}"
//! blocks = ["Some *markdown* text."]
//! ```
//!
//! # Architecture: Phase-Sequenced Plugins
//!
//! A build is a single [`pipeline::Pipeline`] run. Plugins visit every
//! discovered path in each phase, proposing changes that are folded into a
//! per-path state:
//!
//! ```text
//! CONFIG → SURVEY → FILTER → ENRICH → ASSETS → RENDER → EXPORT → REPORT
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`node`] | Template tree type, reserved keys, path segments |
//! | [`merge`] | Order-preserving recursive merge and `base` composition |
//! | [`cascade`] | Scoped render options (`tag_mode`) with validation |
//! | [`interpolate`] | `{name[key]}` substitution in leaf text |
//! | [`markup`] | Block expansion, Markdown by default |
//! | [`render`] | Lazy tree walk emitting HTML lines |
//! | [`naming`] | Slugs and default titles |
//! | [`registry`] | Per-document bookkeeping and output URLs |
//! | [`resolver`] | Enclosing index lookup |
//! | [`enrich`] | Navigation link injection |
//! | [`pipeline`] | Phases, state, plugin trait, run report |
//! | [`plugins`] | Finder, Loader, Indexer, Writer |
//! | [`config`] | `tomlsite.toml` loading and validation |
//! | [`output`] | CLI formatting of a run report |
//!
//! # Design Decisions
//!
//! ## Inheritance Through Index Documents
//!
//! An `index.toml` contributes its `base` table to every document in its
//! directory and below. Composition folds the bases outermost first, then the
//! document itself. Tables merge key by key, keeping the inherited key order;
//! lists concatenate; scalars in the document win.
//!
//! ## Navigation Is Data
//!
//! Links between documents are injected into the composed templates as
//! ordinary list entries under `doc.html.body.nav`, so they render through the
//! same path as hand-written content and a `base` section can style them.
//! Injection skips any `href` the document already has, so running it again
//! changes nothing.
//!
//! ## Failures Stay With Their Document
//!
//! A document that cannot be read, parsed or rendered is reported and skipped;
//! the rest of the site still builds.

pub mod cascade;
pub mod config;
pub mod enrich;
pub mod interpolate;
pub mod markup;
pub mod merge;
pub mod naming;
pub mod node;
pub mod output;
pub mod pipeline;
pub mod plugins;
pub mod registry;
pub mod render;
pub mod resolver;

#[cfg(test)]
pub(crate) mod test_helpers;
