//! Discovering documents in a user-chosen vault directory.
//!
//! Every regular file is a document. Markdown files are also read and parsed,
//! since only notes carry outbound links. The vault is never written to.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::doc::{DocId, DocIdError};

/// A file we found in the vault.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocId,
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Parsed note content; `None` for attachments.
    pub note: Option<NoteText>,
}

/// Text of a markdown note.
#[derive(Debug, Clone)]
pub struct NoteText {
    /// Raw file content.
    pub raw: String,
    /// Content without YAML frontmatter (the main markdown body).
    pub body: String,
    /// Parsed frontmatter, if present and valid YAML.
    pub frontmatter: Option<serde_yaml::Value>,
}

impl Document {
    pub fn is_note(&self) -> bool {
        self.note.is_some()
    }
}

/// Scans `root` for all files and returns them as documents, sorted by id.
/// Hidden entries (`.obsidian`, `.git`, dotfiles) are skipped and symlinks are not followed.
pub fn scan_vault(root: &Path) -> Result<Vec<Document>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    let mut docs = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
    {
        let entry = entry.map_err(|e| ScanError::Walk(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let rel = path
            .strip_prefix(root)
            .map_err(|_| ScanError::Walk(format!("{} is outside {}", path.display(), root.display())))?;
        let id = DocId::from_relative_path(rel).map_err(|e| ScanError::Id(path.to_path_buf(), e))?;
        let note = if id.is_markdown() {
            let bytes = std::fs::read(path).map_err(|e| ScanError::Read(path.to_path_buf(), e))?;
            Some(parse_note(decode_note(path, bytes)))
        } else {
            None
        };
        docs.push(Document {
            id,
            path: path.to_path_buf(),
            note,
        });
    }
    docs.sort_by(|a, b| a.id.cmp(&b.id));
    tracing::debug!(root = %root.display(), documents = docs.len(), "scanned vault");
    Ok(docs)
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

/// Note text as UTF-8. Invalid sequences are replaced so one badly encoded
/// note still gets scanned for links and exported.
fn decode_note(path: &Path, bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "note is not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}

pub(crate) fn parse_note(raw: String) -> NoteText {
    let (frontmatter, body) = match split_frontmatter(&raw) {
        Some((yaml, body)) => {
            let parsed = match serde_yaml::from_str::<serde_yaml::Value>(yaml) {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::debug!(error = %e, "ignoring invalid frontmatter");
                    None
                }
            };
            (parsed, body.to_string())
        }
        None => (None, raw.clone()),
    };
    NoteText {
        raw,
        body,
        frontmatter,
    }
}

/// Splits optional YAML frontmatter (lines between a leading `---` and the next `---`)
/// from the body. Returns `None` when the note has no closed frontmatter block.
fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let s = content.trim_start_matches('\u{feff}');
    let rest = s.strip_prefix("---")?;
    let rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))?;
    if let Some(body) = rest.strip_prefix("---") {
        return Some(("", body.trim_start()));
    }
    let end = rest.find("\n---")?;
    let yaml = &rest[..end];
    let after = &rest[end + 4..];
    let body = match after.find('\n') {
        Some(pos) => &after[pos + 1..],
        None => "",
    };
    Some((yaml, body.trim_start()))
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("walk error: {0}")]
    Walk(String),
    #[error("read error for {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("bad document path {0}: {1}")]
    Id(PathBuf, DocIdError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_without_frontmatter() {
        let n = parse_note("Hello world.".to_string());
        assert_eq!(n.body, "Hello world.");
        assert!(n.frontmatter.is_none());
    }

    #[test]
    fn note_with_yaml_frontmatter() {
        let n = parse_note("---\ntitle: Foo\ndate: 2024-01-01\n---\n\nActual content here.".to_string());
        assert_eq!(n.body, "Actual content here.");
        let fm = n.frontmatter.unwrap();
        assert_eq!(fm["title"].as_str(), Some("Foo"));
    }

    #[test]
    fn unclosed_frontmatter_is_body() {
        let raw = "---\ntitle: Foo\nno closing fence";
        let n = parse_note(raw.to_string());
        assert_eq!(n.body, raw);
        assert!(n.frontmatter.is_none());
    }

    #[test]
    fn scan_skips_hidden_and_reads_notes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join(".obsidian")).unwrap();
        std::fs::write(root.join(".obsidian/app.json"), "{}").unwrap();
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::write(root.join("a.md"), "links to [[b]]").unwrap();
        std::fs::write(root.join("sub/b.md"), "leaf").unwrap();
        std::fs::write(root.join("sub/pic.png"), [0u8, 1, 2]).unwrap();

        let docs = scan_vault(root).unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a.md", "sub/b.md", "sub/pic.png"]);
        assert!(docs[0].is_note());
        assert!(!docs[2].is_note());
        assert_eq!(docs[1].note.as_ref().unwrap().body, "leaf");
    }

    #[test]
    fn scan_keeps_non_utf8_note() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("Root.md"), "[[latin1]]").unwrap();
        std::fs::write(root.join("latin1.md"), b"caf\xe9 see [[Next]]").unwrap();
        std::fs::write(root.join("Next.md"), "end").unwrap();

        let docs = scan_vault(root).unwrap();
        assert_eq!(docs.len(), 3);
        let latin = docs.iter().find(|d| d.id.as_str() == "latin1.md").unwrap();
        let body = &latin.note.as_ref().unwrap().body;
        assert!(body.starts_with("caf\u{fffd}"));
        assert!(body.ends_with("[[Next]]"));
    }

    #[test]
    fn scan_rejects_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(scan_vault(&missing), Err(ScanError::NotADirectory(_))));
    }
}
