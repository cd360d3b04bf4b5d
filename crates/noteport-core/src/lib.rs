//! All backend logic independent of how the tool is run.
//!
//! The user's vault lives in a folder they choose and is only read. noteport
//! stores its settings in its own app data directory (see [app_data]).

pub mod app_data;
pub mod config;
pub mod doc;
pub mod export;
pub mod links;
pub mod notes;
pub mod reach;
pub mod vault;

pub use app_data::app_data_dir;
pub use config::{
    get_vault_root, load_settings, save_settings, set_export_path, set_my_setting, set_vault_root,
    ConfigError, Settings,
};
pub use doc::{DocId, DocIdError};
pub use export::{
    export_reachable, plan_export, run_export, ExportError, ExportOptions, ExportReport,
    PlannedCopy, DEFAULT_CONCURRENCY,
};
pub use links::{extract_links, LinkIndexProvider, MemoryLinkIndex};
pub use notes::{scan_vault, Document, ScanError};
pub use reach::{collect, Reachable};
pub use vault::{Vault, VaultError};

/// Returns a short status string. Used to verify the backend is wired up.
pub fn status() -> &'static str {
    "noteport-core ready"
}
