//! Entity and root folder commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use super::{Cli, parse_id};
use crate::output::{self, OutputFormat};
use folio_core::error::AppError;
use folio_entity::{FolderRepair, StorageDriveFolder};
use folio_service::{EntityFolder, RootFlags};

/// Arguments for folder commands
#[derive(Debug, Args)]
pub struct FolderArgs {
    /// Folder subcommand
    #[command(subcommand)]
    pub command: FolderCommand,
}

/// Folder subcommands
#[derive(Debug, Subcommand)]
pub enum FolderCommand {
    /// List study roots and browser roots
    Roots,
    /// Register a folder as a study root and/or browser root
    AddRoot {
        /// Drive ID
        #[arg(short, long)]
        drive: String,
        /// Folder path on the drive
        path: String,
        /// Studies may be placed under this folder
        #[arg(long)]
        study: bool,
        /// Offer the folder for browsing
        #[arg(long)]
        browser: bool,
        /// Create the folder if it does not exist
        #[arg(long)]
        create: bool,
    },
    /// Show the folder layout an entity would get, without creating anything
    Plan {
        /// Entity ID
        entity: String,
        /// Root folder ID to place the entity under
        #[arg(short, long)]
        root: Option<String>,
    },
    /// Create the primary folder of an entity (returns it if it exists)
    Create {
        /// Entity ID
        entity: String,
        /// Root folder ID to place the entity under
        #[arg(short, long)]
        root: Option<String>,
    },
    /// Show the primary folder of an entity
    Show {
        /// Entity ID
        entity: String,
        /// List sub-folders and files
        #[arg(short, long)]
        contents: bool,
    },
    /// List all folders linked to an entity
    List {
        /// Entity ID
        entity: String,
    },
    /// Link an additional folder to an entity
    Link {
        /// Entity ID
        entity: String,
        /// Drive ID
        #[arg(short, long)]
        drive: String,
        /// Folder path on the drive
        path: String,
    },
    /// Make sure an entity's folder exists
    Repair {
        /// Entity ID
        entity: String,
        /// Root folder ID to place the entity under
        #[arg(short, long)]
        root: Option<String>,
    },
    /// List entities whose folder still needs a repair
    Repairs,
    /// Rename an entity's primary folder
    Rename {
        /// Entity ID
        entity: String,
        /// New folder name
        name: String,
    },
    /// Move an entity's primary folder under another parent
    Move {
        /// Entity ID
        entity: String,
        /// New parent path on the same drive
        parent: String,
    },
    /// Deactivate every folder of an entity
    Deactivate {
        /// Entity ID
        entity: String,
    },
}

/// Table row for a registry folder
#[derive(Debug, Serialize, Tabled)]
struct FolderRow {
    #[tabled(rename = "ID")]
    id: Uuid,
    #[tabled(rename = "Owner")]
    owner: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Backend ID")]
    backend_folder_id: String,
    #[tabled(rename = "Primary")]
    is_primary: bool,
    #[tabled(rename = "Roots")]
    roots: String,
    #[tabled(rename = "Write")]
    write_enabled: bool,
}

impl From<&StorageDriveFolder> for FolderRow {
    fn from(folder: &StorageDriveFolder) -> Self {
        let roots = match (folder.is_study_root, folder.is_browser_root) {
            (true, true) => "study, browser",
            (true, false) => "study",
            (false, true) => "browser",
            (false, false) => "-",
        };
        Self {
            id: folder.id,
            owner: folder
                .owner()
                .map(|o| format!("{} {}", o.kind, o.id))
                .unwrap_or_else(|| "-".to_string()),
            path: folder.path.clone(),
            backend_folder_id: folder.backend_folder_id.clone(),
            is_primary: folder.is_primary,
            roots: roots.to_string(),
            write_enabled: folder.write_enabled,
        }
    }
}

/// Table row for a planned folder
#[derive(Debug, Serialize, Tabled)]
struct PlanRow {
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Path")]
    path: String,
}

/// Table row for a pending repair
#[derive(Debug, Serialize, Tabled)]
struct RepairRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Entity")]
    owner_id: Uuid,
    #[tabled(rename = "Attempts")]
    attempts: i32,
    #[tabled(rename = "Last failure")]
    last_failed_at: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl From<&FolderRepair> for RepairRow {
    fn from(repair: &FolderRepair) -> Self {
        Self {
            kind: repair.owner_kind.to_string(),
            owner_id: repair.owner_id,
            attempts: repair.attempts,
            last_failed_at: repair.last_failed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            reason: repair.reason.clone(),
        }
    }
}

/// Execute folder commands
pub async fn execute(args: &FolderArgs, cli: &Cli, format: OutputFormat) -> Result<(), AppError> {
    let orchestrator = cli.orchestrator().await?;

    match &args.command {
        FolderCommand::Roots => {
            let mut roots = orchestrator.study_roots().await?;
            for browser in orchestrator.browser_roots().await? {
                if !roots.iter().any(|r| r.id == browser.id) {
                    roots.push(browser);
                }
            }
            let rows: Vec<FolderRow> = roots.iter().map(FolderRow::from).collect();
            output::print_list(&rows, format);
        }
        FolderCommand::AddRoot {
            drive,
            path,
            study,
            browser,
            create,
        } => {
            let drive_id = parse_id(drive, "drive")?;
            let flags = RootFlags {
                study_root: *study,
                browser_root: *browser,
            };
            let root = orchestrator
                .register_root_folder(drive_id, path, flags, *create)
                .await?;
            output::print_success(&format!("Root folder registered: {}", root.id));
            output::print_list(&[FolderRow::from(&root)], format);
        }
        FolderCommand::Plan { entity, root } => {
            let plan = orchestrator
                .resolve(parse_id(entity, "entity")?, parse_root(root)?)
                .await?;
            output::print_kv("Drive", &plan.drive.drive.display_name);
            output::print_kv("Base", &plan.base.path);
            let rows: Vec<PlanRow> = plan
                .steps
                .iter()
                .map(|step| PlanRow {
                    entity: format!("{} {}", step.entity.kind, step.entity.id),
                    name: step.name.clone(),
                    path: step.path.clone(),
                })
                .collect();
            if rows.is_empty() {
                output::print_success(&format!("Folder already registered at {}", plan.path()));
            } else {
                output::print_list(&rows, format);
            }
        }
        FolderCommand::Create { entity, root } => {
            let created = orchestrator
                .create_folder_for_entity(parse_id(entity, "entity")?, parse_root(root)?)
                .await?;
            output::print_success(&format!("Folder ready at {}", created.record.path));
            print_entity_folder(&created, format);
        }
        FolderCommand::Show { entity, contents } => {
            let found = orchestrator
                .get_primary_folder(parse_id(entity, "entity")?, *contents)
                .await?;
            print_entity_folder(&found, format);
            if *contents && format == OutputFormat::Table {
                for sub in &found.folder.folders {
                    println!("  {}/", sub.name);
                }
                for file in &found.folder.files {
                    println!("  {} ({} bytes)", file.name, file.size);
                }
            }
        }
        FolderCommand::List { entity } => {
            let folders = orchestrator
                .folders_for_entity(parse_id(entity, "entity")?)
                .await?;
            let rows: Vec<FolderRow> = folders.iter().map(FolderRow::from).collect();
            output::print_list(&rows, format);
        }
        FolderCommand::Link {
            entity,
            drive,
            path,
        } => {
            let linked = orchestrator
                .add_secondary_folder(parse_id(entity, "entity")?, parse_id(drive, "drive")?, path)
                .await?;
            output::print_success(&format!("Folder linked: {}", linked.record.path));
        }
        FolderCommand::Repair { entity, root } => {
            let repaired = orchestrator
                .repair_folder(parse_id(entity, "entity")?, parse_root(root)?)
                .await?;
            output::print_success(&format!("Folder present at {}", repaired.record.path));
        }
        FolderCommand::Repairs => {
            let repairs = orchestrator.pending_repairs().await?;
            let rows: Vec<RepairRow> = repairs.iter().map(RepairRow::from).collect();
            output::print_list(&rows, format);
        }
        FolderCommand::Rename { entity, name } => {
            let renamed = orchestrator
                .rename_entity_folder(parse_id(entity, "entity")?, name)
                .await?;
            output::print_success(&format!("Folder renamed to {}", renamed.record.path));
        }
        FolderCommand::Move { entity, parent } => {
            let moved = orchestrator
                .move_entity_folder(parse_id(entity, "entity")?, parent)
                .await?;
            output::print_success(&format!("Folder moved to {}", moved.record.path));
        }
        FolderCommand::Deactivate { entity } => {
            let count = orchestrator
                .deactivate_entity(parse_id(entity, "entity")?)
                .await?;
            if count == 0 {
                output::print_warning("No active folders for this entity.");
            } else {
                output::print_success(&format!("{count} folder(s) deactivated."));
            }
        }
    }

    Ok(())
}

fn parse_root(root: &Option<String>) -> Result<Option<Uuid>, AppError> {
    root.as_deref().map(|r| parse_id(r, "root folder")).transpose()
}

fn print_entity_folder(found: &EntityFolder, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_item(&found.folder, format),
        OutputFormat::Table => {
            output::print_kv("Registry ID", &found.record.id.to_string());
            output::print_kv("Path", &found.folder.path);
            output::print_kv("Backend ID", &found.folder.folder_id);
            output::print_kv("URL", &output::or_dash(found.folder.url.as_ref()));
        }
    }
}
