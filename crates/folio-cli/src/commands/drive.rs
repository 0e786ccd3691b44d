//! Storage drive commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use super::{Cli, parse_id};
use crate::output::{self, OutputFormat};
use folio_core::error::AppError;
use folio_core::types::{DuplicatePolicy, FolderNameStyle};
use folio_entity::{DriveDetails, DriveOptions, NewStorageDrive, StorageDrive};

/// Arguments for drive commands
#[derive(Debug, Args)]
pub struct DriveArgs {
    /// Drive subcommand
    #[command(subcommand)]
    pub command: DriveCommand,
}

/// Drive subcommands
#[derive(Debug, Subcommand)]
pub enum DriveCommand {
    /// List registered drives
    List,
    /// Register a new drive
    Add {
        /// Display name
        #[arg(short, long)]
        name: String,
        /// Backend root: a directory, key prefix, tenant folder or drive folder
        #[arg(short, long)]
        root: String,
        /// Backend details as JSON, e.g. '{"type":"object_store","bucket":"b","region":"eu-west-1"}'
        #[arg(short, long, default_value = r#"{"type":"local"}"#)]
        details: String,
        /// Duplicate-folder policy: fail or reuse_existing
        #[arg(long)]
        duplicate_policy: Option<DuplicatePolicy>,
        /// Folder name style: underscored or spaced
        #[arg(long)]
        name_style: Option<FolderNameStyle>,
        /// Create entity folders without upload rights
        #[arg(long)]
        read_only: bool,
    },
    /// Check that every registered drive answers
    Check,
    /// Stop placing new folders on a drive
    Retire {
        /// Drive ID
        drive: String,
    },
}

/// Table row for a drive
#[derive(Debug, Serialize, Tabled)]
struct DriveRow {
    #[tabled(rename = "ID")]
    id: Uuid,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    drive_type: String,
    #[tabled(rename = "Root")]
    root_path: String,
    #[tabled(rename = "Duplicates")]
    duplicate_policy: String,
    #[tabled(rename = "Naming")]
    name_style: String,
    #[tabled(rename = "Active")]
    active: bool,
}

impl From<&StorageDrive> for DriveRow {
    fn from(drive: &StorageDrive) -> Self {
        Self {
            id: drive.id,
            name: drive.display_name.clone(),
            drive_type: drive.drive_type.to_string(),
            root_path: drive.root_path.clone(),
            duplicate_policy: output::or_dash(drive.options.duplicate_policy),
            name_style: output::or_dash(drive.options.name_style),
            active: drive.active,
        }
    }
}

/// Table row for a health check
#[derive(Debug, Serialize, Tabled)]
struct HealthRow {
    #[tabled(rename = "ID")]
    id: Uuid,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Healthy")]
    healthy: bool,
    #[tabled(rename = "Detail")]
    detail: String,
}

/// Execute drive commands
pub async fn execute(args: &DriveArgs, cli: &Cli, format: OutputFormat) -> Result<(), AppError> {
    let orchestrator = cli.orchestrator().await?;

    match &args.command {
        DriveCommand::List => {
            let drives = orchestrator.registry().list_drives().await?;
            let rows: Vec<DriveRow> = drives.iter().map(DriveRow::from).collect();
            output::print_list(&rows, format);
        }
        DriveCommand::Add {
            name,
            root,
            details,
            duplicate_policy,
            name_style,
            read_only,
        } => {
            let details: DriveDetails = serde_json::from_str(details)
                .map_err(|e| AppError::validation(format!("Invalid drive details: {e}")))?;
            let new = NewStorageDrive {
                display_name: name.clone(),
                root_path: root.clone(),
                details,
                options: DriveOptions {
                    duplicate_policy: *duplicate_policy,
                    name_style: *name_style,
                    write_enabled: !read_only,
                    ..DriveOptions::default()
                },
            };
            let drive = orchestrator.register_drive(new).await?;
            output::print_success(&format!("Drive '{}' registered: {}", drive.display_name, drive.id));
            output::print_list(&[DriveRow::from(&drive)], format);
        }
        DriveCommand::Check => {
            orchestrator.load_drives().await?;
            let health = orchestrator.drive_health().await;
            let drives = orchestrator.registry().list_drives().await?;
            let rows: Vec<HealthRow> = drives
                .iter()
                .map(|drive| {
                    let (healthy, detail) = match health.get(&drive.id) {
                        Some(true) => (true, "ok"),
                        Some(false) => (false, "backend did not answer"),
                        None if !drive.active => (false, "retired"),
                        None => (false, "client could not be built"),
                    };
                    HealthRow {
                        id: drive.id,
                        name: drive.display_name.clone(),
                        healthy,
                        detail: detail.to_string(),
                    }
                })
                .collect();
            output::print_list(&rows, format);
        }
        DriveCommand::Retire { drive } => {
            let drive_id = parse_id(drive, "drive")?;
            if orchestrator.retire_drive(drive_id).await? {
                output::print_success(&format!("Drive {drive_id} retired"));
            } else {
                output::print_success(&format!("Drive {drive_id} was already retired"));
            }
        }
    }

    Ok(())
}
