//! In-memory folder registry for tests and single-process tooling.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use folio_core::error::AppError;
use folio_core::result::AppResult;
use folio_core::types::path;
use folio_entity::{
    FolderLocation, FolderOwner, FolderRepair, NewDriveFolder, NewStorageDrive, StorageDrive,
    StorageDriveFolder,
};

use super::FolderRegistry;

#[derive(Debug, Default)]
struct InnerState {
    drives: Vec<StorageDrive>,
    folders: Vec<StorageDriveFolder>,
    repairs: HashMap<FolderOwner, FolderRepair>,
}

/// Registry kept in process memory behind a single Tokio mutex.
///
/// The mutex makes the primary-folder check and the insert one step, so
/// it enforces the same uniqueness as the PostgreSQL partial index.
#[derive(Debug, Clone, Default)]
pub struct MemoryFolderRegistry {
    state: Arc<Mutex<InnerState>>,
}

impl MemoryFolderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row, inactive ones included.
    pub async fn all_folders(&self) -> Vec<StorageDriveFolder> {
        self.state.lock().await.folders.clone()
    }
}

fn sorted_primary_first(mut rows: Vec<StorageDriveFolder>) -> Vec<StorageDriveFolder> {
    rows.sort_by(|a, b| {
        b.is_primary
            .cmp(&a.is_primary)
            .then(a.created_at.cmp(&b.created_at))
    });
    rows
}

#[async_trait]
impl FolderRegistry for MemoryFolderRegistry {
    async fn register_drive(&self, drive: NewStorageDrive) -> AppResult<StorageDrive> {
        drive.validate()?;
        let drive = drive.into_drive(Uuid::new_v4());
        self.state.lock().await.drives.push(drive.clone());
        Ok(drive)
    }

    async fn find_drive(&self, id: Uuid) -> AppResult<Option<StorageDrive>> {
        let state = self.state.lock().await;
        Ok(state.drives.iter().find(|d| d.id == id).cloned())
    }

    async fn list_drives(&self) -> AppResult<Vec<StorageDrive>> {
        Ok(self.state.lock().await.drives.clone())
    }

    async fn deactivate_drive(&self, id: Uuid) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let drive = state
            .drives
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| AppError::not_found(format!("Drive {id} is not registered")))?;
        let was_active = drive.active;
        drive.active = false;
        Ok(was_active)
    }

    async fn insert_folder(&self, folder: NewDriveFolder) -> AppResult<StorageDriveFolder> {
        let mut state = self.state.lock().await;
        if !state.drives.iter().any(|d| d.id == folder.storage_drive_id) {
            return Err(AppError::database(format!(
                "Drive {} is not registered",
                folder.storage_drive_id
            )));
        }
        if folder.is_primary {
            let Some(owner) = folder.owner else {
                return Err(AppError::database("A primary folder needs an owner"));
            };
            let taken = state
                .folders
                .iter()
                .any(|f| f.active && f.is_primary && f.owner() == Some(owner));
            if taken {
                return Err(AppError::already_exists(format!(
                    "Owner {} {} already has an active primary folder",
                    owner.kind, owner.id
                )));
            }
        }
        let row = folder.into_folder(Uuid::new_v4());
        state.folders.push(row.clone());
        Ok(row)
    }

    async fn find_folder(&self, id: Uuid) -> AppResult<Option<StorageDriveFolder>> {
        let state = self.state.lock().await;
        Ok(state.folders.iter().find(|f| f.id == id).cloned())
    }

    async fn find_primary(&self, owner: FolderOwner) -> AppResult<Option<StorageDriveFolder>> {
        let state = self.state.lock().await;
        Ok(state
            .folders
            .iter()
            .find(|f| f.active && f.is_primary && f.owner() == Some(owner))
            .cloned())
    }

    async fn find_for_owner(&self, owner: FolderOwner) -> AppResult<Vec<StorageDriveFolder>> {
        let state = self.state.lock().await;
        let rows = state
            .folders
            .iter()
            .filter(|f| f.active && f.owner() == Some(owner))
            .cloned()
            .collect();
        Ok(sorted_primary_first(rows))
    }

    async fn find_by_backend_id(
        &self,
        drive_id: Uuid,
        backend_folder_id: &str,
    ) -> AppResult<Option<StorageDriveFolder>> {
        let state = self.state.lock().await;
        let rows = state
            .folders
            .iter()
            .filter(|f| {
                f.active && f.storage_drive_id == drive_id && f.backend_folder_id == backend_folder_id
            })
            .cloned()
            .collect();
        Ok(sorted_primary_first(rows).into_iter().next())
    }

    async fn find_study_roots(&self) -> AppResult<Vec<StorageDriveFolder>> {
        let state = self.state.lock().await;
        Ok(state
            .folders
            .iter()
            .filter(|f| f.active && f.is_study_root)
            .cloned()
            .collect())
    }

    async fn find_browser_roots(&self) -> AppResult<Vec<StorageDriveFolder>> {
        let state = self.state.lock().await;
        Ok(state
            .folders
            .iter()
            .filter(|f| f.active && f.is_browser_root)
            .cloned()
            .collect())
    }

    async fn find_drive_for_folder(&self, folder_id: Uuid) -> AppResult<Option<StorageDrive>> {
        let state = self.state.lock().await;
        let Some(folder) = state.folders.iter().find(|f| f.id == folder_id) else {
            return Ok(None);
        };
        Ok(state
            .drives
            .iter()
            .find(|d| d.id == folder.storage_drive_id)
            .cloned())
    }

    async fn update_location(
        &self,
        folder_id: Uuid,
        location: &FolderLocation,
    ) -> AppResult<StorageDriveFolder> {
        let mut state = self.state.lock().await;
        let row = state
            .folders
            .iter_mut()
            .find(|f| f.id == folder_id)
            .ok_or_else(|| AppError::not_found(format!("Registry folder {folder_id} not found")))?;
        row.name = location.name.clone();
        row.path = location.path.clone();
        row.backend_folder_id = location.backend_folder_id.clone();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn rebase_paths(
        &self,
        drive_id: Uuid,
        old_prefix: &str,
        new_prefix: &str,
        ids_follow_paths: bool,
    ) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let mut touched = 0;
        for row in state
            .folders
            .iter_mut()
            .filter(|f| f.active && f.storage_drive_id == drive_id)
        {
            if let Some(rebased) = path::rebase(&row.path, old_prefix, new_prefix) {
                if ids_follow_paths {
                    row.backend_folder_id = rebased.clone();
                }
                row.path = rebased;
                row.updated_at = Utc::now();
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn deactivate_for_owner(&self, owner: FolderOwner) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let mut touched = 0;
        for row in state
            .folders
            .iter_mut()
            .filter(|f| f.active && f.owner() == Some(owner))
        {
            row.active = false;
            row.updated_at = Utc::now();
            touched += 1;
        }
        Ok(touched)
    }

    async fn record_repair_needed(&self, owner: FolderOwner, reason: &str) -> AppResult<FolderRepair> {
        let mut state = self.state.lock().await;
        let repair = state
            .repairs
            .entry(owner)
            .and_modify(|r| r.record_failure(reason))
            .or_insert_with(|| FolderRepair::new(owner, reason));
        Ok(repair.clone())
    }

    async fn clear_repair(&self, owner: FolderOwner) -> AppResult<bool> {
        Ok(self.state.lock().await.repairs.remove(&owner).is_some())
    }

    async fn pending_repairs(&self) -> AppResult<Vec<FolderRepair>> {
        let state = self.state.lock().await;
        let mut repairs: Vec<FolderRepair> = state.repairs.values().cloned().collect();
        repairs.sort_by_key(|r| r.first_failed_at);
        Ok(repairs)
    }
}
