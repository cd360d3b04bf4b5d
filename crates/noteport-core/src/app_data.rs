//! Where noteport stores its own data (settings).
//!
//! Vault contents stay in the folder the user chose. We only store app state here.

use std::path::PathBuf;

/// Returns the directory where noteport stores its settings.
/// On macOS: `~/Library/Application Support/app.Noteport.Noteport/`.
/// Creates the directory if it doesn't exist; returns `None` if we can't determine the path.
pub fn app_data_dir() -> Option<PathBuf> {
    let dir = directories::ProjectDirs::from("app", "Noteport", "Noteport")?
        .data_local_dir()
        .to_path_buf();
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(dir = %dir.display(), error = %e, "could not create app data directory");
        return None;
    }
    Some(dir)
}
