//! Storage orchestrator: the facade the rest of the application calls.
//!
//! Every workflow runs naming, resolution, the backend call and the
//! registry write in that order. The registry is only written after the
//! backend confirmed the folder, so a failed or timed-out call never
//! leaves a half-registered folder behind.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{error, info, warn};
use uuid::Uuid;

use folio_core::config::storage::StorageConfig;
use folio_core::error::AppError;
use folio_core::events::{ResourceDescriptor, StorageAuditEvent, StorageOperation};
use folio_core::result::AppResult;
use folio_core::traits::AuditSink;
use folio_core::traits::storage::{ByteStream, VirtualFile, VirtualFolder};
use folio_core::types::DuplicatePolicy;
use folio_core::types::path;
use folio_database::FolderRegistry;
use folio_entity::{
    EntityRecord, FolderLocation, FolderOwner, FolderRepair, NewDriveFolder, NewStorageDrive,
    StorageDrive, StorageDriveFolder,
};
use folio_storage::{DriveManager, ManagedDrive};

use crate::duplicate::DuplicateResolutionPolicy;
use crate::entity::{EntityCreated, EntityDirectory};
use crate::resolver::{PathResolver, ResolvedPlan};

/// A registry row together with the backend folder it points at.
#[derive(Debug, Clone)]
pub struct EntityFolder {
    /// Registry row.
    pub record: StorageDriveFolder,
    /// Folder as reported by the backend.
    pub folder: VirtualFolder,
}

/// Result of best-effort provisioning after an entity was created.
#[derive(Debug, Clone)]
pub enum ProvisionOutcome {
    /// The folder exists and is registered.
    Provisioned(EntityFolder),
    /// Provisioning failed; the owner is recorded for repair.
    RepairNeeded(FolderRepair),
}

impl ProvisionOutcome {
    /// Whether a folder was provisioned.
    pub fn is_provisioned(&self) -> bool {
        matches!(self, Self::Provisioned(_))
    }
}

/// A file and its content stream.
pub struct FetchedFile {
    /// File metadata.
    pub file: VirtualFile,
    /// File content.
    pub stream: ByteStream,
}

impl fmt::Debug for FetchedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchedFile")
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}

/// Flags of a registered root folder.
#[derive(Debug, Clone, Copy, Default)]
pub struct RootFlags {
    /// Studies may be placed under the folder.
    pub study_root: bool,
    /// The folder is offered for browsing.
    pub browser_root: bool,
}

/// Sequences entity folder workflows over the registry and the drives.
#[derive(Debug, Clone)]
pub struct StorageOrchestrator {
    directory: Arc<dyn EntityDirectory>,
    registry: Arc<dyn FolderRegistry>,
    drives: DriveManager,
    resolver: PathResolver,
    audit: Arc<dyn AuditSink>,
    default_policy: DuplicatePolicy,
}

impl StorageOrchestrator {
    /// Create an orchestrator.
    pub fn new(
        directory: Arc<dyn EntityDirectory>,
        registry: Arc<dyn FolderRegistry>,
        drives: DriveManager,
        audit: Arc<dyn AuditSink>,
        config: &StorageConfig,
    ) -> Self {
        let resolver = PathResolver::new(
            directory.clone(),
            registry.clone(),
            drives.clone(),
            config.default_name_style,
        );
        Self {
            directory,
            registry,
            drives,
            resolver,
            audit,
            default_policy: config.default_duplicate_policy,
        }
    }

    /// The registry behind this orchestrator.
    pub fn registry(&self) -> &Arc<dyn FolderRegistry> {
        &self.registry
    }

    /// The path resolver.
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    // ── Drives ──

    /// Register a drive. Its client is built first, so a drive whose
    /// settings cannot produce a client is never persisted.
    pub async fn register_drive(&self, new: NewStorageDrive) -> AppResult<StorageDrive> {
        new.validate()?;
        let client = self
            .drives
            .build_client(&new.clone().into_drive(Uuid::nil()))
            .await?;
        let drive = self.registry.register_drive(new).await?;
        self.drives.register_client(drive.clone(), client).await?;
        info!(drive_id = %drive.id, drive_type = %drive.drive_type, "Drive registered");
        Ok(drive)
    }

    /// Build clients for every active registered drive.
    ///
    /// A drive whose client cannot be built is skipped with a warning.
    /// Returns the number of drives loaded.
    pub async fn load_drives(&self) -> AppResult<usize> {
        let mut loaded = 0;
        for drive in self.registry.list_drives().await? {
            if !drive.active {
                continue;
            }
            match self.resolver.drive(drive.id).await {
                Ok(_) => loaded += 1,
                Err(e) => warn!(drive_id = %drive.id, error = %e, "Skipping drive"),
            }
        }
        Ok(loaded)
    }

    /// Retire a drive: folders already on it stay reachable, new folders
    /// are no longer placed there. Returns whether the drive was active.
    pub async fn retire_drive(&self, drive_id: Uuid) -> AppResult<bool> {
        let was_active = self.registry.deactivate_drive(drive_id).await?;
        // The cached client carries the old drive row.
        self.drives.unregister(&drive_id).await;
        if was_active {
            info!(drive_id = %drive_id, "Drive retired");
        }
        Ok(was_active)
    }

    /// Health of every loaded drive.
    pub async fn drive_health(&self) -> HashMap<Uuid, bool> {
        self.drives.health_check_all().await
    }

    // ── Entity folders ──

    /// Plan an entity's folder without touching any backend.
    pub async fn resolve(&self, entity_id: Uuid, root_override: Option<Uuid>) -> AppResult<ResolvedPlan> {
        let entity = self.directory.get(entity_id).await?;
        self.resolver.resolve(&entity, root_override).await
    }

    /// Provision the folder of a freshly created entity.
    ///
    /// Never fails: the entity already exists, so a provisioning error is
    /// recorded as a pending repair and returned as such.
    pub async fn on_entity_created(&self, event: EntityCreated) -> ProvisionOutcome {
        let entity = event.record();
        let owner = owner_of(&entity);
        match self.provision(&entity, event.root_folder_id, None).await {
            Ok(created) => ProvisionOutcome::Provisioned(created),
            Err(e) => {
                warn!(
                    entity_id = %entity.id,
                    kind = %entity.kind,
                    error = %e,
                    "Folder provisioning failed, repair needed"
                );
                let reason = e.to_string();
                match self.registry.record_repair_needed(owner, &reason).await {
                    Ok(repair) => ProvisionOutcome::RepairNeeded(repair),
                    Err(db) => {
                        error!(entity_id = %entity.id, error = %db, "Could not record folder repair");
                        ProvisionOutcome::RepairNeeded(FolderRepair::new(owner, reason))
                    }
                }
            }
        }
    }

    /// Create (or return) the primary folder of an entity.
    pub async fn create_folder_for_entity(
        &self,
        entity_id: Uuid,
        root_override: Option<Uuid>,
    ) -> AppResult<EntityFolder> {
        let entity = self.directory.get(entity_id).await?;
        self.provision(&entity, root_override, None).await
    }

    /// The entity's primary folder.
    ///
    /// On backends with stable ids the folder is found by id; if it was
    /// moved outside the system the registry is brought up to date.
    pub async fn get_primary_folder(
        &self,
        entity_id: Uuid,
        load_contents: bool,
    ) -> AppResult<EntityFolder> {
        let (_, row) = self.primary_row(entity_id).await?;
        let drive = self.resolver.drive(row.storage_drive_id).await?;
        let found = self.locate(&drive, row, load_contents).await?;
        self.emit(
            entity_id,
            StorageOperation::FolderFetched,
            ResourceDescriptor::folder(drive.drive.id, &found.folder),
        )
        .await;
        Ok(found)
    }

    /// All active folders of an entity, primary first.
    pub async fn folders_for_entity(&self, entity_id: Uuid) -> AppResult<Vec<StorageDriveFolder>> {
        let entity = self.directory.get(entity_id).await?;
        self.registry.find_for_owner(owner_of(&entity)).await
    }

    /// Store a file in the entity's primary folder.
    pub async fn upload_file(&self, entity_id: Uuid, name: &str, data: Bytes) -> AppResult<VirtualFile> {
        let (_, row) = self.primary_row(entity_id).await?;
        if !row.write_enabled {
            return Err(AppError::authorization(format!(
                "Folder '{}' does not accept uploads",
                row.path
            )));
        }
        let drive = self.resolver.drive(row.storage_drive_id).await?;
        let found = self.locate(&drive, row, false).await?;
        let file = drive
            .client
            .upload_file(&found.folder.path, name, data)
            .await?;
        info!(
            entity_id = %entity_id,
            path = %file.path,
            size = file.size,
            "File uploaded"
        );
        self.emit(
            entity_id,
            StorageOperation::FileUploaded,
            ResourceDescriptor::file(drive.drive.id, &file),
        )
        .await;
        Ok(file)
    }

    /// Stream a file below the entity's primary folder.
    pub async fn fetch_file(&self, entity_id: Uuid, relative_path: &str) -> AppResult<FetchedFile> {
        let relative = path::normalize(relative_path)?;
        if relative == path::ROOT {
            return Err(AppError::validation("A file path is required"));
        }
        let (_, row) = self.primary_row(entity_id).await?;
        let drive = self.resolver.drive(row.storage_drive_id).await?;
        let found = self.locate(&drive, row, false).await?;
        let full = path::segments(&relative)
            .into_iter()
            .fold(found.folder.path.clone(), |parent, name| {
                drive.client.child_path(&parent, name)
            });

        let file = drive.client.find_file_by_path(&full).await?;
        let stream = drive.client.fetch_file(&full).await?;
        self.emit(
            entity_id,
            StorageOperation::FileFetched,
            ResourceDescriptor::file(drive.drive.id, &file),
        )
        .await;
        Ok(FetchedFile { file, stream })
    }

    /// Make sure the entity's folder exists. Idempotent.
    ///
    /// A registered folder that vanished is re-created at its persisted
    /// path; an entity without a registered folder is provisioned, reusing
    /// a folder already present at the derived path.
    pub async fn repair_folder(
        &self,
        entity_id: Uuid,
        root_override: Option<Uuid>,
    ) -> AppResult<EntityFolder> {
        let entity = self.directory.get(entity_id).await?;
        let owner = owner_of(&entity);

        let repaired = match self.registry.find_primary(owner).await? {
            Some(row) => {
                let drive = self.resolver.drive(row.storage_drive_id).await?;
                match self.locate(&drive, row.clone(), false).await {
                    Ok(found) => found,
                    Err(e) if e.is_not_found() => self.recreate(&drive, row).await?,
                    Err(e) => return Err(e),
                }
            }
            None => {
                self.provision(&entity, root_override, Some(DuplicatePolicy::ReuseExisting))
                    .await?
            }
        };

        self.registry.clear_repair(owner).await?;
        info!(entity_id = %entity_id, path = %repaired.record.path, "Folder repaired");
        self.emit(
            entity_id,
            StorageOperation::FolderRepaired,
            ResourceDescriptor::folder(repaired.record.storage_drive_id, &repaired.folder),
        )
        .await;
        Ok(repaired)
    }

    /// Rename the entity's primary folder on its backend.
    ///
    /// `new_name` goes through the drive's naming rules. Registry rows of
    /// descendant folders are rebased onto the new path.
    pub async fn rename_entity_folder(&self, entity_id: Uuid, new_name: &str) -> AppResult<EntityFolder> {
        let (_, row) = self.primary_row(entity_id).await?;
        let drive = self.resolver.drive(row.storage_drive_id).await?;
        let name = self.resolver.naming_for(&drive).legal(new_name)?;
        let found = self.locate(&drive, row, false).await?;

        let folder = drive.client.rename_folder(&found.folder.path, &name).await?;
        let record = self.relocated(&drive, found.record, &folder).await?;
        self.emit(
            entity_id,
            StorageOperation::FolderRenamed,
            ResourceDescriptor::folder(drive.drive.id, &folder),
        )
        .await;
        Ok(EntityFolder { record, folder })
    }

    /// Move the entity's primary folder under `new_parent_path` on the same drive.
    pub async fn move_entity_folder(
        &self,
        entity_id: Uuid,
        new_parent_path: &str,
    ) -> AppResult<EntityFolder> {
        let new_parent = path::normalize(new_parent_path)?;
        let (_, row) = self.primary_row(entity_id).await?;
        let drive = self.resolver.drive(row.storage_drive_id).await?;
        let found = self.locate(&drive, row, false).await?;

        let folder = drive.client.move_folder(&found.folder.path, &new_parent).await?;
        let record = self.relocated(&drive, found.record, &folder).await?;
        self.emit(
            entity_id,
            StorageOperation::FolderMoved,
            ResourceDescriptor::folder(drive.drive.id, &folder),
        )
        .await;
        Ok(EntityFolder { record, folder })
    }

    /// Link an additional, non-primary folder to an entity.
    ///
    /// The folder at `folder_path` is created if it does not exist yet.
    pub async fn add_secondary_folder(
        &self,
        entity_id: Uuid,
        drive_id: Uuid,
        folder_path: &str,
    ) -> AppResult<EntityFolder> {
        let entity = self.directory.get(entity_id).await?;
        let drive = self.resolver.placement_drive(drive_id).await?;
        let folder_path = path::normalize(folder_path)?;
        let parent = path::parent(&folder_path)
            .ok_or_else(|| AppError::validation("The drive root cannot be an entity folder"))?;

        let folder = match drive.client.find_folder_by_path(&folder_path, false).await {
            Ok(folder) => folder,
            Err(e) if e.is_not_found() => {
                drive
                    .client
                    .create_folder(&parent, path::name(&folder_path))
                    .await?
            }
            Err(e) => return Err(e),
        };

        let record = self
            .registry
            .insert_folder(NewDriveFolder {
                storage_drive_id: drive.drive.id,
                owner: Some(owner_of(&entity)),
                name: folder.name.clone(),
                path: folder.path.clone(),
                backend_folder_id: folder.folder_id.clone(),
                is_primary: false,
                write_enabled: drive.drive.options.write_enabled,
                delete_enabled: drive.drive.options.delete_enabled,
                is_study_root: false,
                is_browser_root: false,
            })
            .await?;
        info!(entity_id = %entity_id, path = %record.path, "Secondary folder linked");
        Ok(EntityFolder { record, folder })
    }

    /// Register a folder as a study and/or browser root.
    pub async fn register_root_folder(
        &self,
        drive_id: Uuid,
        folder_path: &str,
        flags: RootFlags,
        create_missing: bool,
    ) -> AppResult<StorageDriveFolder> {
        if !flags.study_root && !flags.browser_root {
            return Err(AppError::validation(
                "A root folder must be a study root, a browser root, or both",
            ));
        }
        let drive = self.resolver.placement_drive(drive_id).await?;
        let folder_path = path::normalize(folder_path)?;

        let folder = match drive.client.find_folder_by_path(&folder_path, false).await {
            Ok(folder) => folder,
            Err(e) if e.is_not_found() && create_missing => {
                let parent = path::parent(&folder_path).ok_or(e)?;
                drive
                    .client
                    .create_folder(&parent, path::name(&folder_path))
                    .await?
            }
            Err(e) => return Err(e),
        };

        if let Some(existing) = self
            .registry
            .find_by_backend_id(drive_id, &folder.folder_id)
            .await?
            .filter(|f| f.is_root())
        {
            return Err(AppError::already_exists(format!(
                "Folder '{}' is already registered as a root",
                existing.path
            )));
        }

        let name = if folder.name.is_empty() {
            drive.drive.display_name.clone()
        } else {
            folder.name.clone()
        };
        let record = self
            .registry
            .insert_folder(NewDriveFolder {
                storage_drive_id: drive_id,
                owner: None,
                name,
                path: folder.path.clone(),
                backend_folder_id: folder.folder_id.clone(),
                is_primary: false,
                write_enabled: drive.drive.options.write_enabled,
                delete_enabled: drive.drive.options.delete_enabled,
                is_study_root: flags.study_root,
                is_browser_root: flags.browser_root,
            })
            .await?;
        info!(
            drive_id = %drive_id,
            path = %record.path,
            study_root = flags.study_root,
            browser_root = flags.browser_root,
            "Root folder registered"
        );
        Ok(record)
    }

    /// Registered study roots across all drives.
    pub async fn study_roots(&self) -> AppResult<Vec<StorageDriveFolder>> {
        self.registry.find_study_roots().await
    }

    /// Registered browser roots across all drives.
    pub async fn browser_roots(&self) -> AppResult<Vec<StorageDriveFolder>> {
        self.registry.find_browser_roots().await
    }

    /// Deactivate every folder of an entity. Backend folders are left alone.
    pub async fn deactivate_entity(&self, entity_id: Uuid) -> AppResult<u64> {
        let entity = self.directory.get(entity_id).await?;
        let touched = self.registry.deactivate_for_owner(owner_of(&entity)).await?;
        info!(entity_id = %entity_id, folders = touched, "Entity folders deactivated");
        Ok(touched)
    }

    /// Owners whose provisioning failed and that still need a repair.
    pub async fn pending_repairs(&self) -> AppResult<Vec<FolderRepair>> {
        self.registry.pending_repairs().await
    }

    // ── Internals ──

    async fn primary_row(&self, entity_id: Uuid) -> AppResult<(EntityRecord, StorageDriveFolder)> {
        let entity = self.directory.get(entity_id).await?;
        let row = self
            .registry
            .find_primary(owner_of(&entity))
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("{} {} has no primary folder", entity.kind, entity.id))
            })?;
        Ok((entity, row))
    }

    async fn provision(
        &self,
        entity: &EntityRecord,
        root_override: Option<Uuid>,
        policy_override: Option<DuplicatePolicy>,
    ) -> AppResult<EntityFolder> {
        if let Some(row) = self.registry.find_primary(owner_of(entity)).await? {
            let drive = self.resolver.drive(row.storage_drive_id).await?;
            return self.locate(&drive, row, false).await;
        }

        let plan = self.resolver.resolve(entity, root_override).await?;
        let policy = DuplicateResolutionPolicy::new(
            policy_override.unwrap_or_else(|| plan.drive.drive.duplicate_policy(self.default_policy)),
        );

        // Confirms the base still exists and picks up an out-of-band move.
        let base = self.locate(&plan.drive, plan.base.clone(), false).await?;
        let mut parent = base.record.path;
        let mut provisioned = None;
        for step in &plan.steps {
            let created = self
                .ensure_folder(&plan.drive, &policy, &step.entity, &parent, &step.name)
                .await?;
            parent = created.record.path.clone();
            provisioned = Some(created);
        }
        let created = provisioned
            .ok_or_else(|| AppError::internal(format!("Empty folder plan for entity {}", entity.id)))?;

        info!(
            entity_id = %entity.id,
            kind = %entity.kind,
            drive_id = %plan.drive.drive.id,
            path = %created.record.path,
            "Entity folder provisioned"
        );
        self.emit(
            entity.id,
            StorageOperation::FolderCreated,
            ResourceDescriptor::folder(plan.drive.drive.id, &created.folder),
        )
        .await;
        Ok(created)
    }

    /// Create one planned folder and register it as the owner's primary.
    async fn ensure_folder(
        &self,
        drive: &ManagedDrive,
        policy: &DuplicateResolutionPolicy,
        entity: &EntityRecord,
        parent: &str,
        name: &str,
    ) -> AppResult<EntityFolder> {
        let owner = owner_of(entity);
        if let Some(row) = self.registry.find_primary(owner).await? {
            return self.open(row).await;
        }

        let target = drive.client.child_path(parent, name);
        let folder = self.create_resolving(drive, policy, entity, parent, name, &target).await?;

        let inserted = self
            .registry
            .insert_folder(NewDriveFolder {
                storage_drive_id: drive.drive.id,
                owner: Some(owner),
                name: folder.name.clone(),
                path: folder.path.clone(),
                backend_folder_id: folder.folder_id.clone(),
                is_primary: true,
                write_enabled: drive.drive.options.write_enabled,
                delete_enabled: drive.drive.options.delete_enabled,
                is_study_root: false,
                is_browser_root: false,
            })
            .await;
        let created = match inserted {
            Ok(record) => EntityFolder { record, folder },
            Err(e) if e.is_already_exists() => {
                info!(entity_id = %entity.id, "Concurrent creation won, using its folder");
                let winner = self.registry.find_primary(owner).await?.ok_or(e)?;
                self.open(winner).await?
            }
            Err(e) => return Err(e),
        };

        if self.registry.clear_repair(owner).await? {
            info!(entity_id = %entity.id, "Pending repair cleared");
        }
        Ok(created)
    }

    /// Create a folder, resolving an occupied target through `policy`.
    ///
    /// If the policy finds the occupying folder gone, creation is tried
    /// exactly once more.
    async fn create_resolving(
        &self,
        drive: &ManagedDrive,
        policy: &DuplicateResolutionPolicy,
        entity: &EntityRecord,
        parent: &str,
        name: &str,
        target: &str,
    ) -> AppResult<VirtualFolder> {
        let client = drive.client.as_ref();
        let error = match client.create_folder(parent, name).await {
            Ok(folder) => return Ok(folder),
            Err(e) => e,
        };
        match policy.resolve(error, client, entity, target).await {
            Err(e) if e.is_not_found() => {
                warn!(
                    entity_id = %entity.id,
                    path = %target,
                    "Existing folder vanished during duplicate resolution, retrying once"
                );
                match client.create_folder(parent, name).await {
                    Ok(folder) => Ok(folder),
                    Err(e) => policy.resolve(e, client, entity, target).await,
                }
            }
            resolved => resolved,
        }
    }

    async fn open(&self, row: StorageDriveFolder) -> AppResult<EntityFolder> {
        let drive = self.resolver.drive(row.storage_drive_id).await?;
        self.locate(&drive, row, false).await
    }

    /// Find a registry row's folder on its backend.
    async fn locate(
        &self,
        drive: &ManagedDrive,
        row: StorageDriveFolder,
        load_contents: bool,
    ) -> AppResult<EntityFolder> {
        if !drive.client.stable_ids() {
            let folder = drive
                .client
                .find_folder_by_path(&row.path, load_contents)
                .await?;
            return Ok(EntityFolder { record: row, folder });
        }

        let folder = drive
            .client
            .find_folder_by_id(&row.backend_folder_id, load_contents)
            .await?;
        if folder.path == row.path {
            return Ok(EntityFolder { record: row, folder });
        }

        info!(
            folder_id = %row.id,
            old_path = %row.path,
            new_path = %folder.path,
            "Folder moved outside the system, updating registry"
        );
        let record = self.relocated(drive, row, &folder).await?;
        Ok(EntityFolder { record, folder })
    }

    /// Record a folder's new location and rebase the rows below it.
    async fn relocated(
        &self,
        drive: &ManagedDrive,
        row: StorageDriveFolder,
        folder: &VirtualFolder,
    ) -> AppResult<StorageDriveFolder> {
        let record = self
            .registry
            .update_location(
                row.id,
                &FolderLocation {
                    name: folder.name.clone(),
                    path: folder.path.clone(),
                    backend_folder_id: folder.folder_id.clone(),
                },
            )
            .await?;
        let rebased = self
            .registry
            .rebase_paths(
                drive.drive.id,
                &row.path,
                &folder.path,
                !drive.client.stable_ids(),
            )
            .await?;
        if rebased > 0 {
            info!(
                old_prefix = %row.path,
                new_prefix = %folder.path,
                rows = rebased,
                "Descendant folders rebased"
            );
        }
        Ok(record)
    }

    /// Re-create a registered folder that disappeared from its backend.
    async fn recreate(
        &self,
        drive: &ManagedDrive,
        row: StorageDriveFolder,
    ) -> AppResult<EntityFolder> {
        let parent = path::parent(&row.path).ok_or_else(|| {
            AppError::configuration(format!("Registry folder {} points at the drive root", row.id))
        })?;
        warn!(folder_id = %row.id, path = %row.path, "Re-creating missing folder");

        let folder = match drive.client.create_folder(&parent, path::name(&row.path)).await {
            Ok(folder) => folder,
            Err(e) if e.is_already_exists() => {
                drive.client.find_folder_by_path(&row.path, false).await?
            }
            Err(e) => return Err(e),
        };
        let record = self
            .registry
            .update_location(
                row.id,
                &FolderLocation {
                    name: folder.name.clone(),
                    path: folder.path.clone(),
                    backend_folder_id: folder.folder_id.clone(),
                },
            )
            .await?;
        Ok(EntityFolder { record, folder })
    }

    async fn emit(&self, entity_id: Uuid, operation: StorageOperation, resource: ResourceDescriptor) {
        self.audit
            .notify(StorageAuditEvent::new(entity_id, operation, resource))
            .await;
    }
}

fn owner_of(entity: &EntityRecord) -> FolderOwner {
    FolderOwner::new(entity.kind, entity.id)
}
