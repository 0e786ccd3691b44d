//! CLI command definitions and dispatch.

pub mod drive;
pub mod folder;
pub mod migrate;
pub mod upload;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::debug;
use uuid::Uuid;

use crate::output::OutputFormat;
use folio_core::config::AppConfig;
use folio_core::error::AppError;
use folio_database::build_registry;
use folio_service::{MemoryEntityDirectory, StorageOrchestrator, TracingAuditSink};
use folio_storage::DriveManager;

/// Folio: entity folders across local, object store, share and cloud drives
#[derive(Debug, Parser)]
#[command(name = "folio", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// JSON file with the programs, studies and assays to work with
    #[arg(short, long, global = true)]
    pub entities: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Registry migration management
    Migrate(migrate::MigrateArgs),
    /// Storage drive management
    Drive(drive::DriveArgs),
    /// Entity and root folder management
    Folder(folder::FolderArgs),
    /// Upload a file into an entity folder
    Upload(upload::UploadArgs),
    /// Download a file from an entity folder
    Download(upload::DownloadArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &self.config).await,
            Commands::Drive(args) => drive::execute(args, self, self.format).await,
            Commands::Folder(args) => folder::execute(args, self, self.format).await,
            Commands::Upload(args) => upload::upload(args, self, self.format).await,
            Commands::Download(args) => upload::download(args, self).await,
        }
    }

    /// Build an orchestrator with every registered drive loaded.
    pub async fn orchestrator(&self) -> Result<StorageOrchestrator, AppError> {
        let config = load_config(&self.config)?;
        let registry = build_registry(&config).await?;
        let directory = self.load_entities().await?;
        let drives = DriveManager::new(Duration::from_secs(config.storage.request_timeout_seconds));

        let orchestrator = StorageOrchestrator::new(
            Arc::new(directory),
            registry,
            drives,
            Arc::new(TracingAuditSink),
            &config.storage,
        );
        let loaded = orchestrator.load_drives().await?;
        debug!(drives = loaded, "Drives loaded");
        Ok(orchestrator)
    }

    async fn load_entities(&self) -> Result<MemoryEntityDirectory, AppError> {
        let Some(path) = &self.entities else {
            return Ok(MemoryEntityDirectory::new());
        };
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::configuration(format!(
                "Failed to read entity file {}: {e}",
                path.display()
            ))
        })?;
        MemoryEntityDirectory::from_json(&raw)
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
}

/// Helper: parse a UUID argument
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::validation(format!("Invalid {what} ID: '{raw}'")))
}
