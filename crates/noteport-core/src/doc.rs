//! Document identity. A document is named by its path relative to the vault root,
//! with `/` separators, so the same file always maps to the same key.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Canonical vault-relative path of a document (note or attachment).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocId(String);

impl DocId {
    /// Builds an id from a `/` or `\` separated relative path.
    /// `.` segments are dropped and `..` collapses its parent; escaping the root is an error.
    pub fn new(path: impl AsRef<str>) -> Result<Self, DocIdError> {
        let raw = path.as_ref();
        let normalized = normalize_relative(raw).ok_or_else(|| DocIdError::Escapes(raw.to_string()))?;
        if normalized.is_empty() {
            return Err(DocIdError::Empty);
        }
        Ok(Self(normalized))
    }

    /// Builds an id from a filesystem path already relative to the vault root.
    pub fn from_relative_path(path: &Path) -> Result<Self, DocIdError> {
        let mut parts: Vec<String> = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(s) => parts.push(s.to_string_lossy().into_owned()),
                Component::CurDir => {}
                Component::ParentDir => {
                    if parts.pop().is_none() {
                        return Err(DocIdError::Escapes(path.display().to_string()));
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(DocIdError::Absolute(path.to_path_buf()));
                }
            }
        }
        if parts.is_empty() {
            return Err(DocIdError::Empty);
        }
        Ok(Self(parts.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, e.g. `Note.md`.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// File name without its extension, e.g. `Note`.
    pub fn file_stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => name,
            Some(pos) => &name[..pos],
        }
    }

    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(pos) => Some(&name[pos + 1..]),
        }
    }

    /// Folder part of the id; `""` for documents at the vault root.
    pub fn parent(&self) -> &str {
        match self.0.rfind('/') {
            Some(pos) => &self.0[..pos],
            None => "",
        }
    }

    pub fn is_markdown(&self) -> bool {
        self.extension().map_or(false, |e| e.eq_ignore_ascii_case("md"))
    }

    /// Relative filesystem path for joining onto a vault or export root.
    pub fn to_path(&self) -> PathBuf {
        self.0.split('/').collect()
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocId {
    type Error = DocIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DocId::new(value)
    }
}

impl From<DocId> for String {
    fn from(id: DocId) -> Self {
        id.0
    }
}

/// Collapses `.`/`..` segments of a `/` or `\` separated path.
/// Returns `None` when `..` would climb above the start.
pub(crate) fn normalize_relative(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for seg in path.split(['/', '\\']) {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            s => parts.push(s),
        }
    }
    Some(parts.join("/"))
}

#[derive(Debug, thiserror::Error)]
pub enum DocIdError {
    #[error("empty document path")]
    Empty,
    #[error("path escapes the vault root: {0}")]
    Escapes(String),
    #[error("expected a vault-relative path, got {0}")]
    Absolute(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_separators_and_dots() {
        let id = DocId::new("./projects\\alpha/./plan.md").unwrap();
        assert_eq!(id.as_str(), "projects/alpha/plan.md");
        assert_eq!(DocId::new("a/b/../c.md").unwrap().as_str(), "a/c.md");
    }

    #[test]
    fn rejects_empty_and_escaping_paths() {
        assert!(matches!(DocId::new(""), Err(DocIdError::Empty)));
        assert!(matches!(DocId::new("./"), Err(DocIdError::Empty)));
        assert!(matches!(DocId::new("../outside.md"), Err(DocIdError::Escapes(_))));
    }

    #[test]
    fn path_parts() {
        let id = DocId::new("notes/daily/2024-01-01.md").unwrap();
        assert_eq!(id.file_name(), "2024-01-01.md");
        assert_eq!(id.file_stem(), "2024-01-01");
        assert_eq!(id.extension(), Some("md"));
        assert_eq!(id.parent(), "notes/daily");
        assert!(id.is_markdown());

        let root = DocId::new("README").unwrap();
        assert_eq!(root.parent(), "");
        assert_eq!(root.extension(), None);
        assert_eq!(root.file_stem(), "README");
    }

    #[test]
    fn from_relative_path_matches_new() {
        let p: PathBuf = ["a", "b", "c.png"].iter().collect();
        assert_eq!(DocId::from_relative_path(&p).unwrap(), DocId::new("a/b/c.png").unwrap());
        assert_eq!(DocId::new("a/b/c.png").unwrap().to_path(), p);
    }

    #[test]
    fn deserialize_validates() {
        let id: DocId = serde_json::from_str("\"x/./y.md\"").unwrap();
        assert_eq!(id.as_str(), "x/y.md");
        assert!(serde_json::from_str::<DocId>("\"../y.md\"").is_err());
    }
}
