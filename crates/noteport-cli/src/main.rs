//! CLI entry point for noteport: export a note and everything it links to.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use noteport_core::{
    app_data_dir, collect, export_reachable, load_settings, set_export_path, set_my_setting,
    set_vault_root, status, DocId, ExportOptions, LinkIndexProvider, Settings, Vault,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "noteport")]
#[command(about = "noteport: recursively export a note and every note it links to")]
struct Cli {
    /// Log debug output (overridden by NOTEPORT_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show backend status.
    Status,
    /// Show where noteport stores its settings (app data directory).
    DataDir,
    /// Scan a vault and list its documents with their outbound link counts.
    Scan {
        /// Vault directory (defaults to the configured vault).
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },
    /// List a note's outbound links, marking the ones that do not resolve.
    Links {
        /// Note name, vault-relative path or absolute path.
        note: String,
        #[arg(long, value_name = "PATH")]
        vault: Option<PathBuf>,
    },
    /// List every document reachable from a note.
    Reach {
        note: String,
        #[arg(long, value_name = "PATH")]
        vault: Option<PathBuf>,
        /// Print JSON instead of one path per line.
        #[arg(long)]
        json: bool,
    },
    /// Copy a note and everything reachable from it into a new timestamped folder.
    Export {
        note: String,
        #[arg(long, value_name = "PATH")]
        vault: Option<PathBuf>,
        /// Directory to create the export folder in (defaults to the configured export path).
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Maximum number of files copied at once.
        #[arg(long)]
        concurrency: Option<usize>,
        /// Show what would be copied without writing anything.
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show or change persisted settings.
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
}

#[derive(clap::Subcommand)]
enum SettingsAction {
    /// Print current settings.
    Show,
    /// Set the default vault directory.
    SetVault { path: PathBuf },
    /// Set the directory exports are written under.
    SetExportPath { path: PathBuf },
    /// Set the free-form user setting.
    SetMySetting { value: String },
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "noteport=debug,noteport_core=debug"
    } else {
        "noteport=info,noteport_core=info"
    };
    let filter = EnvFilter::try_from_env("NOTEPORT_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let settings = load_settings();

    let result = match cli.command.unwrap_or(Commands::Status) {
        Commands::Status => {
            println!("noteport");
            println!("  core: {}", status());
            Ok(())
        }
        Commands::DataDir => match app_data_dir() {
            Some(p) => {
                println!("{}", p.display());
                Ok(())
            }
            None => Err("could not determine app data directory".to_string()),
        },
        Commands::Scan { path } => run_scan(path, &settings),
        Commands::Links { note, vault } => run_links(&note, vault, &settings),
        Commands::Reach { note, vault, json } => run_reach(&note, vault, json, &settings),
        Commands::Export {
            note,
            vault,
            out,
            concurrency,
            dry_run,
            json,
        } => {
            let options = ExportOptions {
                concurrency: concurrency.unwrap_or(settings.concurrency),
                dry_run,
            };
            run_export(&note, vault, out, options, json, &settings).await
        }
        Commands::Settings { action } => run_settings(action.unwrap_or(SettingsAction::Show), &settings),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn open_vault(arg: Option<PathBuf>, settings: &Settings) -> Result<Vault, String> {
    let root = arg
        .or_else(|| settings.vault_root())
        .ok_or("no vault given; pass --vault or run `noteport settings set-vault PATH`")?;
    Vault::open(&root).map_err(|e| e.to_string())
}

fn find_note(vault: &Vault, note: &str) -> Result<DocId, String> {
    vault
        .resolve_note(note)
        .ok_or_else(|| format!("note not found in {}: {}", vault.root().display(), note))
}

fn run_scan(path: Option<PathBuf>, settings: &Settings) -> Result<(), String> {
    let vault = open_vault(path, settings)?;
    println!("Scanned {} document(s) under {}", vault.len(), vault.root().display());
    for doc in vault.documents() {
        if doc.is_note() {
            println!("  {}  ({} link(s))", doc.id, vault.outbound(&doc.id).len());
        } else {
            println!("  {}", doc.id);
        }
    }
    Ok(())
}

fn run_links(note: &str, vault: Option<PathBuf>, settings: &Settings) -> Result<(), String> {
    let vault = open_vault(vault, settings)?;
    let id = find_note(&vault, note)?;
    for link in vault.outbound(&id) {
        match vault.resolve(link) {
            Some(target) => println!("  {}  ->  {}", link, target),
            None => println!("  {}  (unresolved)", link),
        }
    }
    Ok(())
}

fn run_reach(note: &str, vault: Option<PathBuf>, json: bool, settings: &Settings) -> Result<(), String> {
    let vault = open_vault(vault, settings)?;
    let id = find_note(&vault, note)?;
    let reachable = collect(Some(&id), &vault);
    if json {
        let docs: Vec<&DocId> = reachable.iter().collect();
        let out = serde_json::to_string_pretty(&docs).map_err(|e| e.to_string())?;
        println!("{}", out);
    } else {
        println!("{} document(s) reachable from {}", reachable.len(), id);
        for doc in &reachable {
            println!("  {}", doc);
        }
    }
    Ok(())
}

async fn run_export(
    note: &str,
    vault: Option<PathBuf>,
    out: Option<PathBuf>,
    options: ExportOptions,
    json: bool,
    settings: &Settings,
) -> Result<(), String> {
    let base = out
        .or_else(|| settings.export_path())
        .ok_or("no export directory given; pass --out or run `noteport settings set-export-path PATH`")?;
    let vault = open_vault(vault, settings)?;
    let id = find_note(&vault, note)?;
    if is_inside(&base, vault.root()) {
        tracing::warn!(base = %base.display(), "export directory is inside the vault; exported copies will be scanned next time");
    }

    let report = export_reachable(&vault, &id, &base, &options)
        .await
        .map_err(|e| e.to_string())?;

    if json {
        let out = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{}", out);
    } else {
        let verb = if report.dry_run { "Would copy" } else { "Copied" };
        println!(
            "{} {} file(s), {} byte(s) to {}",
            verb,
            report.copied.len(),
            report.total_bytes(),
            report.export_root.display()
        );
        for failed in &report.failed {
            println!("  failed: {}  {}", failed.doc, failed.error);
        }
    }

    if report.is_complete() {
        Ok(())
    } else {
        Err(format!("{} file(s) could not be copied", report.failed.len()))
    }
}

fn run_settings(action: SettingsAction, settings: &Settings) -> Result<(), String> {
    match action {
        SettingsAction::Show => {
            println!("my_setting   = {}", settings.my_setting);
            println!("export_path  = {}", settings.export_path);
            println!(
                "vault_root   = {}",
                settings.vault_root.as_deref().unwrap_or("")
            );
            println!("concurrency  = {}", settings.concurrency);
            Ok(())
        }
        SettingsAction::SetVault { path } => set_vault_root(&path).map_err(|e| e.to_string()),
        SettingsAction::SetExportPath { path } => set_export_path(&path).map_err(|e| e.to_string()),
        SettingsAction::SetMySetting { value } => set_my_setting(&value).map_err(|e| e.to_string()),
    }
}

fn is_inside(path: &Path, root: &Path) -> bool {
    path.canonicalize()
        .map(|p| p.starts_with(root))
        .unwrap_or(false)
}
