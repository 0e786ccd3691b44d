//! Folder registry.
//!
//! Rows are never hard-deleted: folders are deactivated together with
//! their owner. An owner has at most one active primary folder; inserting a
//! second one fails with `AlreadyExists`, which lets concurrent creators
//! detect that they lost the race.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use folio_core::config::AppConfig;
use folio_core::error::AppError;
use folio_core::result::AppResult;
use folio_entity::{
    FolderLocation, FolderOwner, FolderRepair, NewDriveFolder, NewStorageDrive, StorageDrive,
    StorageDriveFolder,
};

pub use memory::MemoryFolderRegistry;
pub use postgres::PgFolderRegistry;

use crate::connection::DatabasePool;

/// Durable mapping from entities to drives and folders.
#[async_trait]
pub trait FolderRegistry: Send + Sync + std::fmt::Debug + 'static {
    /// Persist a new drive.
    async fn register_drive(&self, drive: NewStorageDrive) -> AppResult<StorageDrive>;

    /// Find a drive by ID.
    async fn find_drive(&self, id: Uuid) -> AppResult<Option<StorageDrive>>;

    /// All drives, oldest first.
    async fn list_drives(&self) -> AppResult<Vec<StorageDrive>>;

    /// Stop placing new folders on a drive. Returns whether it was active.
    ///
    /// Fails with `NotFound` for an unknown drive.
    async fn deactivate_drive(&self, id: Uuid) -> AppResult<bool>;

    /// Persist a folder row.
    ///
    /// Fails with `AlreadyExists` if the row would be a second active
    /// primary folder for its owner.
    async fn insert_folder(&self, folder: NewDriveFolder) -> AppResult<StorageDriveFolder>;

    /// Find a folder row by ID.
    async fn find_folder(&self, id: Uuid) -> AppResult<Option<StorageDriveFolder>>;

    /// The active primary folder of an owner.
    async fn find_primary(&self, owner: FolderOwner) -> AppResult<Option<StorageDriveFolder>>;

    /// All active folders of an owner, primary first.
    async fn find_for_owner(&self, owner: FolderOwner) -> AppResult<Vec<StorageDriveFolder>>;

    /// The active row for a backend folder identifier on a drive.
    async fn find_by_backend_id(
        &self,
        drive_id: Uuid,
        backend_folder_id: &str,
    ) -> AppResult<Option<StorageDriveFolder>>;

    /// Active folders flagged as study roots.
    async fn find_study_roots(&self) -> AppResult<Vec<StorageDriveFolder>>;

    /// Active folders flagged as browser roots.
    async fn find_browser_roots(&self) -> AppResult<Vec<StorageDriveFolder>>;

    /// The drive holding a registry folder.
    async fn find_drive_for_folder(&self, folder_id: Uuid) -> AppResult<Option<StorageDrive>>;

    /// Record a folder's new name, path and backend id.
    async fn update_location(
        &self,
        folder_id: Uuid,
        location: &FolderLocation,
    ) -> AppResult<StorageDriveFolder>;

    /// Rewrite the paths of active rows strictly below `old_prefix`.
    ///
    /// With `ids_follow_paths` the backend ids are rewritten too, for
    /// backends whose identifier is the path. Returns the rows touched.
    async fn rebase_paths(
        &self,
        drive_id: Uuid,
        old_prefix: &str,
        new_prefix: &str,
        ids_follow_paths: bool,
    ) -> AppResult<u64>;

    /// Deactivate every folder of an owner. Returns the rows touched.
    async fn deactivate_for_owner(&self, owner: FolderOwner) -> AppResult<u64>;

    /// Note that an owner's folder could not be provisioned.
    async fn record_repair_needed(&self, owner: FolderOwner, reason: &str) -> AppResult<FolderRepair>;

    /// Forget a recorded repair. Returns whether one existed.
    async fn clear_repair(&self, owner: FolderOwner) -> AppResult<bool>;

    /// Outstanding repairs, oldest failure first.
    async fn pending_repairs(&self) -> AppResult<Vec<FolderRepair>>;
}

/// Build the registry selected by `storage.registry`.
pub async fn build_registry(config: &AppConfig) -> AppResult<Arc<dyn FolderRegistry>> {
    let registry: Arc<dyn FolderRegistry> = match config.storage.registry.as_str() {
        "postgres" => {
            info!("Using PostgreSQL folder registry");
            let pool = DatabasePool::connect(&config.database).await?;
            Arc::new(PgFolderRegistry::new(pool.pool().clone()))
        }
        "memory" => {
            info!("Using in-memory folder registry");
            Arc::new(MemoryFolderRegistry::new())
        }
        other => {
            return Err(AppError::configuration(format!(
                "Unknown registry backend: '{other}'. Supported: postgres, memory"
            )));
        }
    };
    Ok(registry)
}
