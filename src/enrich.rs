//! Navigation link injection.
//!
//! After every document has been composed with its ancestors, links between
//! documents are added under `doc.html.body.nav`:
//!
//! | Slot | Links |
//! |------|-------|
//! | `nav.header.ul.li` | root index, then nearest enclosing index (breadcrumbs) |
//! | `nav.ul.li` | previous/next sibling in a page; the pages of a directory in its index |
//! | `nav.footer.ul.li` | child indexes, in their parent index |
//!
//! Each link is a list element `{attrib = {class, href}, a = title}` so it
//! concatenates with links a `base` section already declares. A link is only
//! added when no element of the document already carries its `href`, which
//! makes injection idempotent.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use crate::cascade::{TAG_MODE, TagMode};
use crate::merge::combine;
use crate::node::{ATTRIB, CONFIG, DOC, Node, Value, ensure_table};
use crate::registry::{Metadata, document_url};
use crate::resolver::Resolver;

const BODY: [&str; 3] = [DOC, "html", "body"];
const NAV: &str = "nav";

/// A document links can point at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub href: String,
    pub title: String,
}

impl Target {
    pub fn of(node: &Node) -> Option<Self> {
        let metadata = Metadata::of(node)?;
        Some(Self {
            href: format!("/{}", document_url(node)?),
            title: metadata.title,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Root,
    Home,
    Here,
    Prev,
    Next,
    Down,
}

impl LinkKind {
    pub fn class(self) -> &'static str {
        match self {
            LinkKind::Root => "nav root",
            LinkKind::Home => "nav home",
            LinkKind::Here => "nav here",
            LinkKind::Prev => "nav prev",
            LinkKind::Next => "nav next",
            LinkKind::Down => "nav down",
        }
    }
}

/// Where in the navigation node a link goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Header,
    Main,
    Footer,
}

impl Slot {
    fn keys(self) -> &'static [&'static str] {
        match self {
            Slot::Header => &["header", "ul", "li"],
            Slot::Main => &["ul", "li"],
            Slot::Footer => &["footer", "ul", "li"],
        }
    }
}

fn link_entry(kind: LinkKind, target: &Target) -> Value {
    let mut attrib = Node::new();
    attrib.insert("class".into(), Value::String(kind.class().into()));
    attrib.insert("href".into(), Value::String(target.href.clone()));
    let mut entry = Node::new();
    entry.insert(ATTRIB.into(), Value::Table(attrib));
    // Titles pass through interpolation when rendered.
    let title = target.title.replace('{', "{{").replace('}', "}}");
    entry.insert("a".into(), Value::String(title));
    Value::Table(entry)
}

/// Every `attrib.href` anywhere below `value`.
fn collect_hrefs(value: &Value, found: &mut HashSet<String>) {
    match value {
        Value::Table(table) => {
            if let Some(href) = table
                .get(ATTRIB)
                .and_then(|a| a.get("href"))
                .and_then(Value::as_str)
            {
                found.insert(href.to_string());
            }
            for child in table.values() {
                collect_hrefs(child, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_hrefs(item, found);
            }
        }
        _ => {}
    }
}

/// Navigation node with every slot present, in emission order.
fn skeleton() -> Node {
    let mut config = Node::new();
    config.insert(TAG_MODE.into(), Value::String(TagMode::Pair.to_string()));
    let mut nav = Node::new();
    nav.insert(CONFIG.into(), Value::Table(config));
    for slot in [Slot::Header, Slot::Main, Slot::Footer] {
        let keys = slot.keys();
        ensure_table(&mut nav, &keys[..keys.len() - 1]);
    }
    nav
}

/// Add `links` to one slot of a composed template.
///
/// Links whose `href` already occurs in the document, or earlier in
/// `links`, are skipped. Returns whether anything was added.
pub fn inject(template: &mut Node, slot: Slot, links: &[(LinkKind, &Target)]) -> bool {
    let mut seen = HashSet::new();
    if let Some(doc) = template.get(DOC) {
        collect_hrefs(doc, &mut seen);
    }
    let entries: Vec<Value> = links
        .iter()
        .filter(|(_, target)| seen.insert(target.href.clone()))
        .map(|(kind, target)| link_entry(*kind, target))
        .collect();
    if entries.is_empty() {
        return false;
    }

    let mut nav = skeleton();
    let Some((list_key, parents)) = slot.keys().split_last() else {
        return false;
    };
    let Some(holder) = ensure_table(&mut nav, parents) else {
        return false;
    };
    holder.insert(list_key.to_string(), Value::Array(entries));

    let Some(body) = ensure_table(template, &BODY) else {
        tracing::warn!("doc.html.body is not a table; navigation skipped");
        return false;
    };
    match body.get_mut(NAV) {
        Some(Value::Table(existing)) => {
            // Combined one level up so the slots keep their order.
            let mut inherited = Node::new();
            inherited.insert(NAV.into(), Value::Table(nav));
            let mut own = Node::new();
            own.insert(NAV.into(), Value::Table(std::mem::take(existing)));
            if let Some(Value::Table(merged)) = combine(inherited, own).remove(NAV) {
                *existing = merged;
            }
        }
        Some(_) => {
            tracing::warn!("doc.html.body.nav is not a table; navigation skipped");
            return false;
        }
        None => {
            body.insert(NAV.into(), Value::Table(nav));
        }
    }
    true
}

fn apply(
    templates: &mut BTreeMap<PathBuf, Node>,
    changed: &mut BTreeSet<PathBuf>,
    path: &Path,
    slot: Slot,
    links: &[(LinkKind, &Target)],
) {
    if let Some(template) = templates.get_mut(path)
        && inject(template, slot, links)
    {
        changed.insert(path.to_path_buf());
    }
}

/// Inject navigation into a set of composed templates keyed by source path.
///
/// Returns the paths whose templates changed. Running it again over its own
/// output changes nothing.
pub fn enrich(templates: &mut BTreeMap<PathBuf, Node>, resolver: &Resolver) -> BTreeSet<PathBuf> {
    let targets: BTreeMap<PathBuf, Target> = templates
        .iter()
        .filter_map(|(path, node)| Target::of(node).map(|t| (path.clone(), t)))
        .collect();
    let mut changed = BTreeSet::new();

    for path in targets.keys() {
        let root = resolver.ancestors(path).into_iter().next();
        let home = resolver.parent_index(path);
        let links: Vec<(LinkKind, &Target)> = [(LinkKind::Root, root), (LinkKind::Home, home)]
            .into_iter()
            .filter_map(|(kind, index)| Some((kind, targets.get(&index?)?)))
            .collect();
        apply(templates, &mut changed, path, Slot::Header, &links);
    }

    let mut groups: BTreeMap<&Path, Vec<&PathBuf>> = BTreeMap::new();
    for path in targets.keys().filter(|p| !resolver.is_index(p)) {
        if let Some(dir) = path.parent() {
            groups.entry(dir).or_default().push(path);
        }
    }
    for siblings in groups.values() {
        let n = siblings.len();
        for (i, path) in siblings.iter().enumerate() {
            let target = &targets[*path];
            if let Some(index) = resolver.nearest(path) {
                apply(templates, &mut changed, &index, Slot::Main, &[(LinkKind::Here, target)]);
            }
            if n > 1 {
                let left = &targets[siblings[(i + n - 1) % n]];
                let right = &targets[siblings[(i + 1) % n]];
                let links = [(LinkKind::Prev, left), (LinkKind::Next, right)];
                apply(templates, &mut changed, path, Slot::Main, &links);
            }
        }
    }

    for index in resolver.indexes() {
        if let (Some(parent), Some(target)) = (resolver.parent_index(index), targets.get(index)) {
            apply(templates, &mut changed, &parent, Slot::Footer, &[(LinkKind::Down, target)]);
        }
    }

    changed
}
