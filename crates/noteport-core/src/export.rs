//! Recursive export: copy a root note and everything it reaches into a fresh,
//! timestamped folder that mirrors the vault layout.
//!
//! Copies run on tokio with a concurrency cap. A failed copy is logged and
//! recorded in the [`ExportReport`]; it never cancels the other copies.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::doc::DocId;
use crate::reach::collect;
use crate::vault::Vault;

pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Maximum number of copies in flight. Values below 1 are treated as 1.
    pub concurrency: usize,
    /// Plan and stat sources only; nothing is written.
    pub dry_run: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            dry_run: false,
        }
    }
}

/// One document and where it goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedCopy {
    pub doc: DocId,
    pub source: PathBuf,
    pub destination: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct CopiedFile {
    pub doc: DocId,
    pub destination: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedCopy {
    pub doc: DocId,
    pub error: String,
}

/// Outcome of every planned copy.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub export_root: PathBuf,
    pub dry_run: bool,
    pub copied: Vec<CopiedFile>,
    pub failed: Vec<FailedCopy>,
}

impl ExportReport {
    /// True when every planned copy succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.copied.iter().map(|c| c.bytes).sum()
    }
}

/// Folder name for an export of `root` started at `at`, e.g. `Project-20240101-093000`.
pub fn export_folder_name(root: &DocId, at: &NaiveDateTime) -> String {
    format!("{}-{}", root.file_stem(), at.format("%Y%m%d-%H%M%S"))
}

/// `base/name`, or `base/name-2`, `base/name-3`, ... when that path is taken.
pub fn unique_export_root(base: &Path, name: &str) -> PathBuf {
    let first = base.join(name);
    if !first.exists() {
        return first;
    }
    (2u32..)
        .map(|n| base.join(format!("{name}-{n}")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

/// Maps each document to its mirrored destination under `export_root`.
pub fn plan_export<'a, I>(vault_root: &Path, export_root: &Path, docs: I) -> Vec<PlannedCopy>
where
    I: IntoIterator<Item = &'a DocId>,
{
    docs.into_iter()
        .map(|doc| {
            let rel = doc.to_path();
            PlannedCopy {
                doc: doc.clone(),
                source: vault_root.join(&rel),
                destination: export_root.join(rel),
            }
        })
        .collect()
}

/// Collects everything reachable from `root` in `vault` and copies it into a new
/// timestamped folder under `base`.
pub async fn export_reachable(
    vault: &Vault,
    root: &DocId,
    base: &Path,
    options: &ExportOptions,
) -> Result<ExportReport, ExportError> {
    let reachable = collect(Some(root), vault);
    let name = export_folder_name(root, &chrono::Local::now().naive_local());
    let export_root = unique_export_root(base, &name);
    tracing::info!(
        root = %root,
        documents = reachable.len(),
        export_root = %export_root.display(),
        "exporting"
    );
    let plan = plan_export(vault.root(), &export_root, &reachable);
    run_export(plan, export_root, options).await
}

/// Executes a plan. Only failing to create `export_root` itself is an error;
/// per-file failures end up in [`ExportReport::failed`].
pub async fn run_export(
    plan: Vec<PlannedCopy>,
    export_root: PathBuf,
    options: &ExportOptions,
) -> Result<ExportReport, ExportError> {
    if export_root.is_file() {
        return Err(ExportError::RootIsFile(export_root));
    }
    if !options.dry_run {
        tokio::fs::create_dir_all(&export_root)
            .await
            .map_err(|e| ExportError::CreateRoot(export_root.clone(), e))?;
    }

    let permits = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut tasks = JoinSet::new();
    for item in plan {
        let permits = Arc::clone(&permits);
        let dry_run = options.dry_run;
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let result = if dry_run {
                stat_one(&item).await
            } else {
                copy_one(&item).await
            };
            (item, result)
        });
    }

    let mut report = ExportReport {
        export_root,
        dry_run: options.dry_run,
        copied: Vec::new(),
        failed: Vec::new(),
    };
    while let Some(joined) = tasks.join_next().await {
        let (item, result) = joined.map_err(ExportError::Task)?;
        match result {
            Ok(bytes) => {
                tracing::debug!(doc = %item.doc, bytes, "copied");
                report.copied.push(CopiedFile {
                    doc: item.doc,
                    destination: item.destination,
                    bytes,
                });
            }
            Err(e) => {
                tracing::warn!(doc = %item.doc, error = %e, "copy failed");
                report.failed.push(FailedCopy {
                    doc: item.doc,
                    error: e.to_string(),
                });
            }
        }
    }
    report.copied.sort_by(|a, b| a.doc.cmp(&b.doc));
    report.failed.sort_by(|a, b| a.doc.cmp(&b.doc));

    tracing::info!(
        copied = report.copied.len(),
        failed = report.failed.len(),
        bytes = report.total_bytes(),
        dry_run = report.dry_run,
        "export finished"
    );
    Ok(report)
}

async fn copy_one(item: &PlannedCopy) -> Result<u64, CopyError> {
    if let Some(parent) = item.destination.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CopyError::CreateDir(parent.to_path_buf(), e))?;
    }
    tokio::fs::copy(&item.source, &item.destination)
        .await
        .map_err(|e| CopyError::Copy(item.source.clone(), e))
}

async fn stat_one(item: &PlannedCopy) -> Result<u64, CopyError> {
    let meta = tokio::fs::metadata(&item.source)
        .await
        .map_err(|e| CopyError::Stat(item.source.clone(), e))?;
    Ok(meta.len())
}

#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("failed to create directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),
    #[error("failed to copy {0}: {1}")]
    Copy(PathBuf, std::io::Error),
    #[error("failed to read metadata of {0}: {1}")]
    Stat(PathBuf, std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("export root {0} is an existing file")]
    RootIsFile(PathBuf),
    #[error("failed to create export root {0}: {1}")]
    CreateRoot(PathBuf, std::io::Error),
    #[error("copy task failed: {0}")]
    Task(tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn id(s: &str) -> DocId {
        DocId::new(s).unwrap()
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let p = root.join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(p, content).unwrap();
    }

    #[test]
    fn folder_name_uses_stem_and_timestamp() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 30)
            .unwrap();
        assert_eq!(export_folder_name(&id("projects/Plan.md"), &at), "Plan-20240309-070530");
    }

    #[test]
    fn unique_root_adds_suffix() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(unique_export_root(dir.path(), "x"), dir.path().join("x"));
        std::fs::create_dir(dir.path().join("x")).unwrap();
        std::fs::create_dir(dir.path().join("x-2")).unwrap();
        assert_eq!(unique_export_root(dir.path(), "x"), dir.path().join("x-3"));
    }

    #[test]
    fn plan_mirrors_relative_paths() {
        let docs = [id("a.md"), id("sub/dir/b.png")];
        let plan = plan_export(Path::new("/vault"), Path::new("/out/e"), &docs);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[1].source, Path::new("/vault/sub/dir/b.png"));
        assert_eq!(plan[1].destination, Path::new("/out/e/sub/dir/b.png"));
    }

    #[tokio::test]
    async fn export_copies_reachable_documents_only() {
        let vault_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        write(vault_dir.path(), "Root.md", "[[Child]] ![[pic.png]] [[Ghost]]");
        write(vault_dir.path(), "notes/Child.md", "back to [[Root]]");
        write(vault_dir.path(), "assets/pic.png", "PNG");
        write(vault_dir.path(), "Other.md", "not linked");

        let vault = Vault::open(vault_dir.path()).unwrap();
        let root = vault.resolve_note("Root").unwrap();
        let report = export_reachable(&vault, &root, out_dir.path(), &ExportOptions::default())
            .await
            .unwrap();

        assert!(report.is_complete());
        assert!(report.export_root.starts_with(out_dir.path()));
        let copied: Vec<&str> = report.copied.iter().map(|c| c.doc.as_str()).collect();
        assert_eq!(copied, vec!["Root.md", "assets/pic.png", "notes/Child.md"]);
        assert_eq!(
            std::fs::read_to_string(report.export_root.join("notes/Child.md")).unwrap(),
            "back to [[Root]]"
        );
        assert_eq!(std::fs::read(report.export_root.join("assets/pic.png")).unwrap(), b"PNG");
        assert!(!report.export_root.join("Other.md").exists());
        assert_eq!(report.total_bytes(), ("[[Child]] ![[pic.png]] [[Ghost]]".len() + "back to [[Root]]".len() + 3) as u64);
    }

    #[tokio::test]
    async fn failed_copy_does_not_stop_others() {
        let vault_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        write(vault_dir.path(), "a.md", "A");
        write(vault_dir.path(), "b.md", "B");
        let docs = [id("a.md"), id("missing.md"), id("b.md")];
        let export_root = out_dir.path().join("e");
        let plan = plan_export(vault_dir.path(), &export_root, &docs);
        let options = ExportOptions {
            concurrency: 1,
            dry_run: false,
        };

        let report = run_export(plan, export_root.clone(), &options).await.unwrap();
        assert!(!report.is_complete());
        assert_eq!(report.copied.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].doc, id("missing.md"));
        assert!(export_root.join("a.md").exists());
        assert!(export_root.join("b.md").exists());
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let vault_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        write(vault_dir.path(), "a.md", "hello");
        let export_root = out_dir.path().join("e");
        let plan = plan_export(vault_dir.path(), &export_root, &[id("a.md")]);
        let options = ExportOptions {
            concurrency: 0,
            dry_run: true,
        };

        let report = run_export(plan, export_root.clone(), &options).await.unwrap();
        assert!(report.dry_run);
        assert_eq!(report.copied[0].bytes, 5);
        assert!(!export_root.exists());
    }

    #[tokio::test]
    async fn dry_run_reports_missing_source_as_unreadable() {
        let vault_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let export_root = out_dir.path().join("e");
        let plan = plan_export(vault_dir.path(), &export_root, &[id("gone.md")]);
        let options = ExportOptions {
            concurrency: 1,
            dry_run: true,
        };

        let report = run_export(plan, export_root, &options).await.unwrap();
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].error.starts_with("failed to read metadata of"));
    }

    #[tokio::test]
    async fn export_root_that_is_a_file_is_an_error() {
        let out_dir = tempfile::tempdir().unwrap();
        let file = out_dir.path().join("taken");
        std::fs::write(&file, "x").unwrap();
        let err = run_export(Vec::new(), file, &ExportOptions::default()).await.unwrap_err();
        assert!(matches!(err, ExportError::RootIsFile(_)));
    }

    #[test]
    fn report_serializes() {
        let report = ExportReport {
            export_root: PathBuf::from("/out/e"),
            dry_run: false,
            copied: vec![CopiedFile {
                doc: id("a.md"),
                destination: PathBuf::from("/out/e/a.md"),
                bytes: 1,
            }],
            failed: vec![],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["copied"][0]["doc"], "a.md");
        assert_eq!(json["failed"].as_array().unwrap().len(), 0);
    }
}
