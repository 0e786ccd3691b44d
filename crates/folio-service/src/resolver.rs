//! Path resolution for entity folders.
//!
//! Persisted state wins over re-derivation: the deepest ancestor that
//! already has a primary folder contributes its registry path, so folders
//! renamed out-of-band keep working as parents.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use folio_core::error::AppError;
use folio_core::result::AppResult;
use folio_core::types::FolderNameStyle;
use folio_database::FolderRegistry;
use folio_entity::{EntityRecord, FolderOwner, StorageDriveFolder};
use folio_storage::{DriveManager, FolderNamingPolicy, ManagedDrive};

use crate::entity::EntityDirectory;

/// One folder the orchestrator has to provision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFolder {
    /// Entity that will own the folder.
    pub entity: EntityRecord,
    /// Path of the parent folder.
    pub parent_path: String,
    /// Legal folder name.
    pub name: String,
    /// Full path of the folder.
    pub path: String,
}

/// Where an entity's folder goes and which missing ancestors come first.
#[derive(Debug, Clone)]
pub struct ResolvedPlan {
    /// Drive holding the base folder.
    pub drive: ManagedDrive,
    /// Registry folder everything is placed under.
    pub base: StorageDriveFolder,
    /// Folders to provision, top-down. The last one is the target entity's.
    pub steps: Vec<PlannedFolder>,
}

impl ResolvedPlan {
    /// The target entity's planned folder.
    pub fn target(&self) -> Option<&PlannedFolder> {
        self.steps.last()
    }

    /// The target entity's planned path.
    pub fn path(&self) -> &str {
        self.target()
            .map(|s| s.path.as_str())
            .unwrap_or(self.base.path.as_str())
    }
}

/// Computes target paths from registry state and entity lineage.
#[derive(Debug, Clone)]
pub struct PathResolver {
    directory: Arc<dyn EntityDirectory>,
    registry: Arc<dyn FolderRegistry>,
    drives: DriveManager,
    default_name_style: FolderNameStyle,
}

impl PathResolver {
    /// Create a resolver.
    pub fn new(
        directory: Arc<dyn EntityDirectory>,
        registry: Arc<dyn FolderRegistry>,
        drives: DriveManager,
        default_name_style: FolderNameStyle,
    ) -> Self {
        Self {
            directory,
            registry,
            drives,
            default_name_style,
        }
    }

    /// The live client for a registered drive, loading it on first use.
    pub async fn drive(&self, drive_id: Uuid) -> AppResult<ManagedDrive> {
        if let Ok(managed) = self.drives.get(&drive_id).await {
            return Ok(managed);
        }
        let drive = self
            .registry
            .find_drive(drive_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Drive {drive_id} is not registered")))?;
        match self.drives.register(drive).await {
            Ok(managed) => Ok(managed),
            // Another task loaded it first.
            Err(e) if e.is_already_exists() => self.drives.get(&drive_id).await,
            Err(e) => Err(e),
        }
    }

    /// A drive that accepts new folders.
    ///
    /// Folders already registered on a retired drive stay reachable
    /// through [`drive`](Self::drive); placing new ones there is refused.
    pub async fn placement_drive(&self, drive_id: Uuid) -> AppResult<ManagedDrive> {
        let managed = self.drive(drive_id).await?;
        if !managed.drive.active {
            return Err(AppError::configuration(format!(
                "Drive '{}' is retired and accepts no new folders",
                managed.drive.display_name
            )));
        }
        Ok(managed)
    }

    /// The naming policy in force on a drive.
    pub fn naming_for(&self, drive: &ManagedDrive) -> FolderNamingPolicy {
        FolderNamingPolicy::new(drive.drive.name_style(self.default_name_style))
    }

    /// Plan the folder of `entity`.
    ///
    /// `root_override` names a registry folder flagged as study root; the
    /// entity's folder is then placed directly under it and the parent's
    /// folder is ignored.
    pub async fn resolve(
        &self,
        entity: &EntityRecord,
        root_override: Option<Uuid>,
    ) -> AppResult<ResolvedPlan> {
        let lineage = self.directory.lineage(entity).await?;

        let (base, pending) = match root_override {
            Some(root_id) => (self.override_root(root_id).await?, vec![entity.clone()]),
            None => self.base_from_lineage(&lineage).await?,
        };

        let drive = self.placement_drive(base.storage_drive_id).await?;
        let naming = self.naming_for(&drive);

        let mut parent_path = base.path.clone();
        let mut steps = Vec::with_capacity(pending.len());
        for entity in pending {
            let name = naming.name(&entity)?;
            let path = drive.client.child_path(&parent_path, &name);
            steps.push(PlannedFolder {
                entity,
                parent_path: parent_path.clone(),
                name,
                path: path.clone(),
            });
            parent_path = path;
        }

        debug!(
            entity_id = %entity.id,
            drive_id = %drive.drive.id,
            base = %base.path,
            steps = steps.len(),
            "Resolved entity folder plan"
        );

        Ok(ResolvedPlan { drive, base, steps })
    }

    async fn override_root(&self, root_id: Uuid) -> AppResult<StorageDriveFolder> {
        let root = self
            .registry
            .find_folder(root_id)
            .await?
            .filter(|f| f.active)
            .ok_or_else(|| {
                AppError::configuration(format!("Root folder {root_id} is not registered"))
            })?;
        if !root.is_study_root {
            return Err(AppError::configuration(format!(
                "Folder '{}' is not a study root",
                root.path
            )));
        }
        Ok(root)
    }

    /// Deepest ancestor with a primary folder, else the single study root.
    async fn base_from_lineage(
        &self,
        lineage: &[EntityRecord],
    ) -> AppResult<(StorageDriveFolder, Vec<EntityRecord>)> {
        let ancestors = &lineage[..lineage.len().saturating_sub(1)];
        for (idx, ancestor) in ancestors.iter().enumerate().rev() {
            let owner = FolderOwner::new(ancestor.kind, ancestor.id);
            if let Some(folder) = self.registry.find_primary(owner).await? {
                return Ok((folder, lineage[idx + 1..].to_vec()));
            }
        }

        let mut roots = self.registry.find_study_roots().await?;
        match roots.len() {
            1 => Ok((roots.remove(0), lineage.to_vec())),
            0 => Err(AppError::configuration(
                "No ancestor has a folder and no study root is registered",
            )),
            n => Err(AppError::configuration(format!(
                "No ancestor has a folder and {n} study roots are registered; choose one explicitly"
            ))),
        }
    }
}
