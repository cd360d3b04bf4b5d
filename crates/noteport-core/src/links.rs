//! Outbound links: the provider seam the reachability walk reads from,
//! and extraction of links from note text.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use crate::doc::DocId;

/// Read-only view of a link graph.
///
/// `outbound` lists the link paths a document references (empty when nothing is
/// registered). `resolve` turns a link path back into a document, or `None` for a
/// dangling link.
pub trait LinkIndexProvider {
    fn outbound(&self, doc: &DocId) -> &[String];
    fn resolve(&self, path: &str) -> Option<DocId>;
}

/// In-memory adjacency map. Link paths resolve only to documents registered here.
#[derive(Debug, Default, Clone)]
pub struct MemoryLinkIndex {
    links: HashMap<DocId, Vec<String>>,
    docs: HashSet<DocId>,
}

impl MemoryLinkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a document that can be resolved but has no outbound links yet.
    pub fn add_document(&mut self, id: DocId) {
        self.docs.insert(id);
    }

    /// Registers `from` and an outbound link path. The target is not registered;
    /// call [`add_document`](Self::add_document) for it or it stays dangling.
    pub fn add_link(&mut self, from: DocId, to: impl Into<String>) {
        self.docs.insert(from.clone());
        let targets = self.links.entry(from).or_default();
        let to = to.into();
        if !targets.contains(&to) {
            targets.push(to);
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl LinkIndexProvider for MemoryLinkIndex {
    fn outbound(&self, doc: &DocId) -> &[String] {
        self.links.get(doc).map(Vec::as_slice).unwrap_or(&[])
    }

    fn resolve(&self, path: &str) -> Option<DocId> {
        DocId::new(path).ok().filter(|id| self.docs.contains(id))
    }
}

/// How a link was written in the note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// `[[target]]`, resolved by name anywhere in the vault.
    Wiki,
    /// `[label](target)`, relative to the note's folder.
    Markdown,
}

/// A link target found in note text, with heading/block/alias parts removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub target: String,
    pub kind: LinkKind,
    pub embed: bool,
}

/// Extracts wikilinks, embeds and relative markdown links from a note body.
/// Fenced code blocks and inline code spans are ignored. Results keep first-seen order.
pub fn extract_links(body: &str) -> Vec<Link> {
    let mut out = Vec::new();
    let mut fence: Option<&str> = None;
    for line in body.lines() {
        let trimmed = line.trim_start();
        if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
            }
            continue;
        }
        if trimmed.starts_with("```") {
            fence = Some("```");
            continue;
        }
        if trimmed.starts_with("~~~") {
            fence = Some("~~~");
            continue;
        }
        let text = blank_inline_code(line);
        let rest = scan_wikilinks(&text, &mut out);
        scan_markdown_links(&rest, &mut out);
    }
    out
}

/// Wikilinks found in frontmatter string values (lists and maps are walked).
pub fn frontmatter_links(value: &serde_yaml::Value) -> Vec<Link> {
    let mut out = Vec::new();
    walk_yaml(value, &mut out);
    out
}

fn walk_yaml(value: &serde_yaml::Value, out: &mut Vec<Link>) {
    match value {
        serde_yaml::Value::String(s) => {
            scan_wikilinks(s, out);
        }
        serde_yaml::Value::Sequence(items) => items.iter().for_each(|v| walk_yaml(v, out)),
        serde_yaml::Value::Mapping(map) => map.values().for_each(|v| walk_yaml(v, out)),
        serde_yaml::Value::Tagged(tagged) => walk_yaml(&tagged.value, out),
        _ => {}
    }
}

/// Replaces `code` spans with spaces so links inside them are not picked up.
/// A backtick run only opens a span when a run of the same length closes it later
/// on the line; otherwise it is kept as literal text.
fn blank_inline_code(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(open) = rest.find('`') {
        out.push_str(&rest[..open]);
        let run = backtick_run(&rest[open..]);
        let after = &rest[open + run..];
        match find_closing_run(after, run) {
            Some(close) => {
                let span_end = close + run;
                let blanked = run + after[..span_end].chars().count();
                out.extend(std::iter::repeat(' ').take(blanked));
                rest = &after[span_end..];
            }
            None => {
                out.push_str(&rest[open..open + run]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn backtick_run(text: &str) -> usize {
    text.len() - text.trim_start_matches('`').len()
}

/// Byte offset of the next backtick run of exactly `run` backticks.
fn find_closing_run(text: &str, run: usize) -> Option<usize> {
    let mut offset = 0;
    while let Some(pos) = text[offset..].find('`') {
        let start = offset + pos;
        let len = backtick_run(&text[start..]);
        if len == run {
            return Some(start);
        }
        offset = start + len;
    }
    None
}

/// Pushes every `[[...]]` in `text` and returns the text with those links blanked out.
fn scan_wikilinks(text: &str, out: &mut Vec<Link>) -> String {
    let mut rest = String::with_capacity(text.len());
    let mut cursor = 0;
    while let Some(open) = text[cursor..].find("[[") {
        let start = cursor + open;
        let Some(close) = text[start + 2..].find("]]") else {
            break;
        };
        let inner = &text[start + 2..start + 2 + close];
        let end = start + 2 + close + 2;
        let embed = start > 0 && text.as_bytes()[start - 1] == b'!';
        let target = inner.split('|').next().unwrap_or("");
        if let Some(target) = clean_target(target) {
            out.push(Link {
                target,
                kind: LinkKind::Wiki,
                embed,
            });
        }
        rest.push_str(&text[cursor..start]);
        rest.push(' ');
        cursor = end;
    }
    rest.push_str(&text[cursor..]);
    rest
}

fn scan_markdown_links(text: &str, out: &mut Vec<Link>) {
    let mut cursor = 0;
    while let Some(pos) = text[cursor..].find("](") {
        let bracket = cursor + pos;
        let after = &text[bracket + 2..];
        cursor = bracket + 2;
        let Some(label_start) = text[..bracket].rfind('[') else {
            continue;
        };
        let embed = label_start > 0 && text.as_bytes()[label_start - 1] == b'!';
        let raw = if let Some(inner) = after.strip_prefix('<') {
            match inner.find('>') {
                Some(end) => &inner[..end],
                None => continue,
            }
        } else {
            let end = after
                .find(|c: char| c == ')' || c.is_whitespace())
                .unwrap_or(after.len());
            &after[..end]
        };
        if raw.is_empty() || raw.starts_with('#') || has_scheme(raw) {
            continue;
        }
        if let Some(target) = markdown_target(raw) {
            out.push(Link {
                target,
                kind: LinkKind::Markdown,
                embed,
            });
        }
    }
}

/// Strips the `#fragment` of a markdown link target, then percent-decodes the path,
/// so an encoded `%23` stays part of the file name.
fn markdown_target(raw: &str) -> Option<String> {
    let path = raw.split('#').next().unwrap_or("");
    let decoded = percent_decode(path);
    let target = decoded.trim();
    if target.is_empty() {
        None
    } else {
        Some(target.to_string())
    }
}

/// Drops `#heading` / `#^block` suffixes and surrounding whitespace.
fn clean_target(raw: &str) -> Option<String> {
    let target = raw.split('#').next().unwrap_or("").trim();
    if target.is_empty() {
        None
    } else {
        Some(target.to_string())
    }
}

/// `https://`, `mailto:`, `obsidian://` and similar; not vault paths.
fn has_scheme(target: &str) -> bool {
    let Some(colon) = target.find(':') else {
        return false;
    };
    let scheme = &target[..colon];
    scheme.len() > 1
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
}

fn percent_decode(s: &str) -> String {
    urlencoding::decode(s)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| s.to_string())
}
