//! PostgreSQL folder registry.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use folio_core::error::{AppError, ErrorKind};
use folio_core::result::AppResult;
use folio_entity::{
    FolderLocation, FolderOwner, FolderRepair, NewDriveFolder, NewStorageDrive, StorageDrive,
    StorageDriveFolder,
};

use super::FolderRegistry;

/// Registry stored in the `storage_drives`, `storage_drive_folders` and
/// `folder_repairs` tables.
#[derive(Debug, Clone)]
pub struct PgFolderRegistry {
    pool: PgPool,
}

impl PgFolderRegistry {
    /// Create a registry over a pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, message, e)
}

#[async_trait]
impl FolderRegistry for PgFolderRegistry {
    async fn register_drive(&self, drive: NewStorageDrive) -> AppResult<StorageDrive> {
        drive.validate()?;
        let drive_type = drive.details.drive_type();
        sqlx::query_as::<_, StorageDrive>(
            "INSERT INTO storage_drives (id, display_name, drive_type, root_path, details, options) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&drive.display_name)
        .bind(drive_type)
        .bind(&drive.root_path)
        .bind(Json(&drive.details))
        .bind(Json(&drive.options))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to register drive"))
    }

    async fn find_drive(&self, id: Uuid) -> AppResult<Option<StorageDrive>> {
        sqlx::query_as::<_, StorageDrive>("SELECT * FROM storage_drives WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find drive"))
    }

    async fn list_drives(&self) -> AppResult<Vec<StorageDrive>> {
        sqlx::query_as::<_, StorageDrive>("SELECT * FROM storage_drives ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list drives"))
    }

    async fn deactivate_drive(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("UPDATE storage_drives SET active = FALSE WHERE id = $1 AND active")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to deactivate drive"))?;
        if result.rows_affected() > 0 {
            return Ok(true);
        }
        match self.find_drive(id).await? {
            Some(_) => Ok(false),
            None => Err(AppError::not_found(format!("Drive {id} is not registered"))),
        }
    }

    async fn insert_folder(&self, folder: NewDriveFolder) -> AppResult<StorageDriveFolder> {
        sqlx::query_as::<_, StorageDriveFolder>(
            "INSERT INTO storage_drive_folders \
             (id, storage_drive_id, owner_kind, owner_id, name, path, backend_folder_id, \
              is_primary, write_enabled, delete_enabled, is_study_root, is_browser_root) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(folder.storage_drive_id)
        .bind(folder.owner.map(|o| o.kind))
        .bind(folder.owner.map(|o| o.id))
        .bind(&folder.name)
        .bind(&folder.path)
        .bind(&folder.backend_folder_id)
        .bind(folder.is_primary)
        .bind(folder.write_enabled)
        .bind(folder.delete_enabled)
        .bind(folder.is_study_root)
        .bind(folder.is_browser_root)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let unique = e
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation());
            if unique {
                AppError::with_source(
                    ErrorKind::AlreadyExists,
                    "Owner already has an active primary folder",
                    e,
                )
            } else {
                AppError::with_source(ErrorKind::Database, "Failed to insert folder", e)
            }
        })
    }

    async fn find_folder(&self, id: Uuid) -> AppResult<Option<StorageDriveFolder>> {
        sqlx::query_as::<_, StorageDriveFolder>("SELECT * FROM storage_drive_folders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find folder"))
    }

    async fn find_primary(&self, owner: FolderOwner) -> AppResult<Option<StorageDriveFolder>> {
        sqlx::query_as::<_, StorageDriveFolder>(
            "SELECT * FROM storage_drive_folders \
             WHERE owner_kind = $1 AND owner_id = $2 AND is_primary AND active",
        )
        .bind(owner.kind)
        .bind(owner.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find primary folder"))
    }

    async fn find_for_owner(&self, owner: FolderOwner) -> AppResult<Vec<StorageDriveFolder>> {
        sqlx::query_as::<_, StorageDriveFolder>(
            "SELECT * FROM storage_drive_folders \
             WHERE owner_kind = $1 AND owner_id = $2 AND active \
             ORDER BY is_primary DESC, created_at ASC",
        )
        .bind(owner.kind)
        .bind(owner.id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list owner folders"))
    }

    async fn find_by_backend_id(
        &self,
        drive_id: Uuid,
        backend_folder_id: &str,
    ) -> AppResult<Option<StorageDriveFolder>> {
        sqlx::query_as::<_, StorageDriveFolder>(
            "SELECT * FROM storage_drive_folders \
             WHERE storage_drive_id = $1 AND backend_folder_id = $2 AND active \
             ORDER BY is_primary DESC, created_at ASC LIMIT 1",
        )
        .bind(drive_id)
        .bind(backend_folder_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find folder by backend id"))
    }

    async fn find_study_roots(&self) -> AppResult<Vec<StorageDriveFolder>> {
        sqlx::query_as::<_, StorageDriveFolder>(
            "SELECT * FROM storage_drive_folders WHERE is_study_root AND active ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list study roots"))
    }

    async fn find_browser_roots(&self) -> AppResult<Vec<StorageDriveFolder>> {
        sqlx::query_as::<_, StorageDriveFolder>(
            "SELECT * FROM storage_drive_folders WHERE is_browser_root AND active ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list browser roots"))
    }

    async fn find_drive_for_folder(&self, folder_id: Uuid) -> AppResult<Option<StorageDrive>> {
        sqlx::query_as::<_, StorageDrive>(
            "SELECT d.* FROM storage_drives d \
             JOIN storage_drive_folders f ON f.storage_drive_id = d.id \
             WHERE f.id = $1",
        )
        .bind(folder_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find drive for folder"))
    }

    async fn update_location(
        &self,
        folder_id: Uuid,
        location: &FolderLocation,
    ) -> AppResult<StorageDriveFolder> {
        sqlx::query_as::<_, StorageDriveFolder>(
            "UPDATE storage_drive_folders \
             SET name = $2, path = $3, backend_folder_id = $4, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(folder_id)
        .bind(&location.name)
        .bind(&location.path)
        .bind(&location.backend_folder_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to update folder location"))?
        .ok_or_else(|| AppError::not_found(format!("Registry folder {folder_id} not found")))
    }

    async fn rebase_paths(
        &self,
        drive_id: Uuid,
        old_prefix: &str,
        new_prefix: &str,
        ids_follow_paths: bool,
    ) -> AppResult<u64> {
        let old_prefix = old_prefix.trim_end_matches('/');
        let new_prefix = new_prefix.trim_end_matches('/');
        let result = sqlx::query(
            "UPDATE storage_drive_folders \
             SET path = $3 || substr(path, length($2) + 1), \
                 backend_folder_id = CASE WHEN $4 THEN $3 || substr(path, length($2) + 1) \
                                          ELSE backend_folder_id END, \
                 updated_at = NOW() \
             WHERE storage_drive_id = $1 AND active \
               AND left(path, length($2) + 1) = $2 || '/'",
        )
        .bind(drive_id)
        .bind(old_prefix)
        .bind(new_prefix)
        .bind(ids_follow_paths)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to rebase folder paths"))?;
        Ok(result.rows_affected())
    }

    async fn deactivate_for_owner(&self, owner: FolderOwner) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE storage_drive_folders SET active = FALSE, updated_at = NOW() \
             WHERE owner_kind = $1 AND owner_id = $2 AND active",
        )
        .bind(owner.kind)
        .bind(owner.id)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to deactivate owner folders"))?;
        Ok(result.rows_affected())
    }

    async fn record_repair_needed(&self, owner: FolderOwner, reason: &str) -> AppResult<FolderRepair> {
        sqlx::query_as::<_, FolderRepair>(
            "INSERT INTO folder_repairs (owner_kind, owner_id, reason) VALUES ($1, $2, $3) \
             ON CONFLICT (owner_kind, owner_id) DO UPDATE \
             SET reason = EXCLUDED.reason, \
                 attempts = folder_repairs.attempts + 1, \
                 last_failed_at = NOW() \
             RETURNING *",
        )
        .bind(owner.kind)
        .bind(owner.id)
        .bind(reason)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to record folder repair"))
    }

    async fn clear_repair(&self, owner: FolderOwner) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM folder_repairs WHERE owner_kind = $1 AND owner_id = $2")
            .bind(owner.kind)
            .bind(owner.id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to clear folder repair"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn pending_repairs(&self) -> AppResult<Vec<FolderRepair>> {
        sqlx::query_as::<_, FolderRepair>("SELECT * FROM folder_repairs ORDER BY first_failed_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list folder repairs"))
    }
}
