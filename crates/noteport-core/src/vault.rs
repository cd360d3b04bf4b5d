//! A scanned vault: its documents, the link index built from note text, and
//! link resolution by path or by name.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::doc::{normalize_relative, DocId};
use crate::links::{extract_links, frontmatter_links, Link, LinkIndexProvider, LinkKind};
use crate::notes::{scan_vault, Document, ScanError};

/// Documents of one vault plus the outbound links of every note.
#[derive(Debug)]
pub struct Vault {
    root: PathBuf,
    docs: BTreeMap<DocId, Document>,
    links: HashMap<DocId, Vec<String>>,
    /// Lowercased file name (and stem, for notes) to candidate ids, shortest path first.
    by_name: HashMap<String, Vec<DocId>>,
}

impl Vault {
    /// Scans `root` and builds the link index.
    pub fn open(root: &Path) -> Result<Self, VaultError> {
        let root = root
            .canonicalize()
            .map_err(|e| VaultError::Canonicalize(root.to_path_buf(), e))?;
        let docs = scan_vault(&root)?;
        let vault = Self::from_documents(root, docs);
        tracing::info!(
            root = %vault.root.display(),
            documents = vault.docs.len(),
            notes = vault.links.len(),
            "opened vault"
        );
        Ok(vault)
    }

    /// Builds a vault from already scanned documents.
    pub fn from_documents(root: PathBuf, documents: Vec<Document>) -> Self {
        let mut by_name: HashMap<String, Vec<DocId>> = HashMap::new();
        let mut found_links: Vec<(DocId, Vec<Link>)> = Vec::new();
        let mut docs = BTreeMap::new();

        for doc in documents {
            by_name
                .entry(doc.id.file_name().to_lowercase())
                .or_default()
                .push(doc.id.clone());
            if doc.id.is_markdown() {
                by_name
                    .entry(doc.id.file_stem().to_lowercase())
                    .or_default()
                    .push(doc.id.clone());
            }
            if let Some(note) = &doc.note {
                let mut found = extract_links(&note.body);
                if let Some(fm) = &note.frontmatter {
                    found.extend(frontmatter_links(fm));
                }
                found_links.push((doc.id.clone(), found));
            }
            docs.insert(doc.id.clone(), doc);
        }

        for candidates in by_name.values_mut() {
            candidates.sort_by(|a, b| {
                a.as_str()
                    .len()
                    .cmp(&b.as_str().len())
                    .then_with(|| a.cmp(b))
            });
            candidates.dedup();
        }

        // Markdown links fall back to their written form, so the documents must be known first.
        let mut vault = Self {
            root,
            docs,
            links: HashMap::new(),
            by_name,
        };
        for (id, found) in found_links {
            let paths = vault.link_paths(&id, found);
            vault.links.insert(id, paths);
        }
        vault
    }

    /// Turns extracted links into stored link paths. A markdown link is first read
    /// relative to the note's folder; if that does not resolve, the target is kept as
    /// written, which covers vault-absolute links and ones that climb out of the vault.
    fn link_paths(&self, from: &DocId, links: Vec<Link>) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for link in links {
            let path = match link.kind {
                LinkKind::Wiki => link.target,
                LinkKind::Markdown => {
                    let joined = if from.parent().is_empty() {
                        link.target.clone()
                    } else {
                        format!("{}/{}", from.parent(), link.target)
                    };
                    normalize_relative(&joined)
                        .filter(|p| !p.is_empty() && self.resolve(p).is_some())
                        .unwrap_or(link.target)
                }
            };
            if !out.contains(&path) {
                out.push(path);
            }
        }
        out
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn get(&self, id: &DocId) -> Option<&Document> {
        self.docs.get(id)
    }

    /// All documents, ordered by id.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.docs.values()
    }

    /// Resolves a user-supplied note reference: a vault-relative path, an absolute
    /// path inside the vault, or a note name.
    pub fn resolve_note(&self, reference: &str) -> Option<DocId> {
        let path = Path::new(reference);
        if path.is_absolute() {
            let canonical = path.canonicalize().ok()?;
            let rel = canonical.strip_prefix(&self.root).ok()?;
            let id = DocId::from_relative_path(rel).ok()?;
            return self.docs.contains_key(&id).then_some(id);
        }
        self.resolve(reference)
    }
}

impl LinkIndexProvider for Vault {
    fn outbound(&self, doc: &DocId) -> &[String] {
        self.links.get(doc).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Exact path, then path plus `.md`, then shortest path with that file name.
    fn resolve(&self, path: &str) -> Option<DocId> {
        let id = DocId::new(path).ok()?;
        if self.docs.contains_key(&id) {
            return Some(id);
        }
        if !id.is_markdown() {
            if let Ok(with_md) = DocId::new(format!("{}.md", id.as_str())) {
                if self.docs.contains_key(&with_md) {
                    return Some(with_md);
                }
            }
        }

        let wanted_suffix = id.as_str().to_lowercase();
        let candidates = self.by_name.get(&id.file_name().to_lowercase())?;
        candidates
            .iter()
            .find(|c| path_ends_with(c, &wanted_suffix))
            .cloned()
    }
}

/// True when `id` equals `suffix` or ends with `/suffix` (case-insensitive), and also
/// when the suffix omits the `.md` extension of a note.
fn path_ends_with(id: &DocId, suffix: &str) -> bool {
    let full = id.as_str().to_lowercase();
    let matches = |candidate: &str| candidate == suffix || candidate.ends_with(&format!("/{suffix}"));
    if matches(&full) {
        return true;
    }
    id.is_markdown() && matches(&full[..full.len() - 3])
}

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("failed to resolve vault path {0}: {1}")]
    Canonicalize(PathBuf, std::io::Error),
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),
}
