//! Registry folder model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::entity::EntityKind;

/// The business entity that owns a registry folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FolderOwner {
    /// Hierarchy level of the owner.
    pub kind: EntityKind,
    /// Owner identifier.
    pub id: Uuid,
}

impl FolderOwner {
    /// Create an owner reference.
    pub fn new(kind: EntityKind, id: Uuid) -> Self {
        Self { kind, id }
    }
}

/// A folder registered on a drive.
///
/// Rows are never hard-deleted. `path` follows renames and moves;
/// `backend_folder_id` is the key used to find the folder again.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StorageDriveFolder {
    /// Unique row identifier.
    pub id: Uuid,
    /// Drive holding the folder.
    pub storage_drive_id: Uuid,
    /// Kind of the owning entity; `None` for root folders.
    pub owner_kind: Option<EntityKind>,
    /// Owning entity; `None` for root folders.
    pub owner_id: Option<Uuid>,
    /// Folder name.
    pub name: String,
    /// Uniform path on the drive.
    pub path: String,
    /// Backend-assigned identifier.
    pub backend_folder_id: String,
    /// Whether this is the owner's primary folder.
    pub is_primary: bool,
    /// Whether uploads are accepted.
    pub write_enabled: bool,
    /// Whether deletion is allowed.
    pub delete_enabled: bool,
    /// Whether studies may be placed under this folder.
    pub is_study_root: bool,
    /// Whether the folder is offered as a browsing entry point.
    pub is_browser_root: bool,
    /// Soft-delete flag.
    pub active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl StorageDriveFolder {
    /// The owning entity, if the row has one.
    pub fn owner(&self) -> Option<FolderOwner> {
        match (self.owner_kind, self.owner_id) {
            (Some(kind), Some(id)) => Some(FolderOwner { kind, id }),
            _ => None,
        }
    }

    /// Whether the row is a root folder rather than an entity folder.
    pub fn is_root(&self) -> bool {
        self.owner_id.is_none()
    }
}

/// Data required to insert a registry row.
#[derive(Debug, Clone)]
pub struct NewDriveFolder {
    /// Drive holding the folder.
    pub storage_drive_id: Uuid,
    /// Owning entity; `None` for root folders.
    pub owner: Option<FolderOwner>,
    /// Folder name.
    pub name: String,
    /// Uniform path.
    pub path: String,
    /// Backend identifier.
    pub backend_folder_id: String,
    /// Primary flag.
    pub is_primary: bool,
    /// Uploads accepted.
    pub write_enabled: bool,
    /// Deletion allowed.
    pub delete_enabled: bool,
    /// Study root flag.
    pub is_study_root: bool,
    /// Browser root flag.
    pub is_browser_root: bool,
}

impl NewDriveFolder {
    /// Materialize the row as it will be stored.
    pub fn into_folder(self, id: Uuid) -> StorageDriveFolder {
        let now = Utc::now();
        StorageDriveFolder {
            id,
            storage_drive_id: self.storage_drive_id,
            owner_kind: self.owner.map(|o| o.kind),
            owner_id: self.owner.map(|o| o.id),
            name: self.name,
            path: self.path,
            backend_folder_id: self.backend_folder_id,
            is_primary: self.is_primary,
            write_enabled: self.write_enabled,
            delete_enabled: self.delete_enabled,
            is_study_root: self.is_study_root,
            is_browser_root: self.is_browser_root,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// New name, path and backend id of a folder after a rename or move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderLocation {
    /// Folder name.
    pub name: String,
    /// Uniform path.
    pub path: String,
    /// Backend identifier.
    pub backend_folder_id: String,
}
