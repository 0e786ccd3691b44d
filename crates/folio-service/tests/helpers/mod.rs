//! Shared helpers for orchestrator integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use folio_core::config::storage::StorageConfig;
use folio_core::error::AppError;
use folio_core::events::StorageAuditEvent;
use folio_core::result::AppResult;
use folio_core::traits::storage::{ByteStream, StorageClient, VirtualFile, VirtualFolder};
use folio_core::types::{FolderNameStyle, path};
use folio_database::{FolderRegistry, MemoryFolderRegistry};
use folio_entity::{
    DriveDetails, DriveOptions, EntityRecord, NewStorageDrive, StorageDrive, StorageDriveFolder,
};
use folio_service::{ChannelAuditSink, MemoryEntityDirectory, RootFlags, StorageOrchestrator};
use folio_storage::DriveManager;

/// Orchestrator wired to in-memory collaborators and one drive.
pub struct TestApp {
    /// The orchestrator under test.
    pub orchestrator: StorageOrchestrator,
    /// Registry behind the orchestrator.
    pub registry: Arc<MemoryFolderRegistry>,
    /// Entity directory behind the orchestrator.
    pub directory: Arc<MemoryEntityDirectory>,
    /// Audit events emitted so far.
    pub audit: UnboundedReceiver<StorageAuditEvent>,
    /// The single registered drive.
    pub drive: StorageDrive,
    /// The `/Studies` study root on that drive.
    pub study_root: StorageDriveFolder,
    /// Backing directory of a local drive.
    pub dir: TempDir,
}

impl TestApp {
    /// Local drive with default options.
    pub async fn local() -> Self {
        Self::local_with(DriveOptions::default()).await
    }

    /// Local drive with the given options.
    pub async fn local_with(options: DriveOptions) -> Self {
        Self::build(None, options).await
    }

    /// Drive served by `client` instead of a real backend.
    pub async fn with_client(client: Arc<dyn StorageClient>, options: DriveOptions) -> Self {
        Self::build(Some(client), options).await
    }

    async fn build(client: Option<Arc<dyn StorageClient>>, options: DriveOptions) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let registry = Arc::new(MemoryFolderRegistry::new());
        let directory = Arc::new(MemoryEntityDirectory::new());
        let drives = DriveManager::default();
        let (sink, audit) = ChannelAuditSink::new();

        let orchestrator = StorageOrchestrator::new(
            directory.clone(),
            registry.clone(),
            drives.clone(),
            Arc::new(sink),
            &StorageConfig::default(),
        );

        let new_drive = NewStorageDrive {
            display_name: "Test drive".into(),
            root_path: dir.path().to_string_lossy().to_string(),
            details: DriveDetails::Local,
            options,
        };
        let drive = match client {
            None => orchestrator
                .register_drive(new_drive)
                .await
                .expect("Failed to register drive"),
            Some(client) => {
                let drive = registry
                    .register_drive(new_drive)
                    .await
                    .expect("Failed to register drive");
                drives
                    .register_client(drive.clone(), client)
                    .await
                    .expect("Failed to load client");
                drive
            }
        };

        let study_root = orchestrator
            .register_root_folder(
                drive.id,
                "/Studies",
                RootFlags {
                    study_root: true,
                    browser_root: true,
                },
                true,
            )
            .await
            .expect("Failed to register study root");

        Self {
            orchestrator,
            registry,
            directory,
            audit,
            drive,
            study_root,
            dir,
        }
    }

    /// Add an entity to the directory.
    pub async fn add(&self, record: EntityRecord) -> EntityRecord {
        self.directory.insert(record.clone()).await;
        record
    }

    /// A program, a study in it and an assay in the study.
    pub async fn hierarchy(&self) -> (EntityRecord, EntityRecord, EntityRecord) {
        let program = self
            .add(EntityRecord::program(
                Uuid::new_v4(),
                "Clinical Program A",
                Some("CPA".into()),
            ))
            .await;
        let study = self
            .add(EntityRecord::study(
                Uuid::new_v4(),
                "First In Human",
                "CPA-10001",
                program.id,
            ))
            .await;
        let assay = self
            .add(EntityRecord::assay(
                Uuid::new_v4(),
                "PK Panel",
                "CPA-10001-01",
                study.id,
            ))
            .await;
        (program, study, assay)
    }

    /// Filesystem location of a uniform path on a local drive.
    pub fn disk(&self, uniform: &str) -> PathBuf {
        let mut full = self.dir.path().to_path_buf();
        for segment in path::segments(uniform) {
            full.push(segment);
        }
        full
    }

    /// Drain the audit events emitted so far.
    pub fn events(&mut self) -> Vec<StorageAuditEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.audit.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Drive options with the spaced name style.
pub fn spaced() -> DriveOptions {
    DriveOptions {
        name_style: Some(FolderNameStyle::Spaced),
        ..DriveOptions::default()
    }
}

#[derive(Debug, Default)]
struct StableState {
    next_id: u64,
    /// Folder path by id.
    folders: BTreeMap<String, String>,
    /// File id and content by path.
    files: BTreeMap<String, (String, Bytes)>,
}

impl StableState {
    fn id_of(&self, folder_path: &str) -> Option<String> {
        if folder_path == path::ROOT {
            return Some("root".to_string());
        }
        self.folders
            .iter()
            .find(|(_, p)| p.as_str() == folder_path)
            .map(|(id, _)| id.clone())
    }

    fn path_of(&self, id: &str) -> Option<String> {
        if id == "root" {
            return Some(path::ROOT.to_string());
        }
        self.folders.get(id).cloned()
    }

    fn view(&self, id: &str, folder_path: &str, load_contents: bool) -> VirtualFolder {
        let parent_id = path::parent(folder_path).and_then(|p| self.id_of(&p));
        let folder = VirtualFolder::new(folder_path, id).with_parent_id(parent_id);
        if !load_contents {
            return folder;
        }
        let folders = self
            .folders
            .iter()
            .filter(|(_, p)| path::parent(p).as_deref() == Some(folder_path))
            .map(|(child_id, p)| VirtualFolder::new(p.clone(), child_id.clone()))
            .collect();
        let files = self
            .files
            .iter()
            .filter(|(p, _)| path::parent(p).as_deref() == Some(folder_path))
            .map(|(p, (file_id, data))| file_view(p, file_id, data))
            .collect();
        folder.with_contents(folders, files)
    }

    fn occupied(&self, target: &str) -> bool {
        self.id_of(target).is_some() || self.files.contains_key(target)
    }

    fn relocate(&mut self, from: &str, to: &str) {
        for p in self.folders.values_mut() {
            if p.as_str() == from {
                *p = to.to_string();
            } else if let Some(rebased) = path::rebase(p.as_str(), from, to) {
                *p = rebased;
            }
        }
        let files = std::mem::take(&mut self.files);
        self.files = files
            .into_iter()
            .map(|(p, f)| (path::rebase(&p, from, to).unwrap_or(p), f))
            .collect();
    }
}

fn file_view(file_path: &str, file_id: &str, data: &Bytes) -> VirtualFile {
    VirtualFile {
        name: path::name(file_path).to_string(),
        path: file_path.to_string(),
        file_id: file_id.to_string(),
        url: None,
        size: data.len() as u64,
        last_modified: None,
    }
}

/// In-memory backend whose folder ids survive rename and move, like the
/// enterprise share and the cloud drive.
#[derive(Debug, Default)]
pub struct StableIdClient {
    state: Mutex<StableState>,
    unavailable: AtomicBool,
}

impl StableIdClient {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `BackendUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of folders on the backend.
    pub fn folder_count(&self) -> usize {
        self.state.lock().unwrap().folders.len()
    }

    /// Rename a folder behind the orchestrator's back.
    pub fn rename_out_of_band(&self, from: &str, new_name: &str) {
        let mut state = self.state.lock().unwrap();
        let to = path::join(&path::parent(from).unwrap(), new_name);
        state.relocate(from, &to);
    }

    fn check(&self) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::backend_unavailable("Backend is down"));
        }
        Ok(())
    }

    fn relocate_folder(&self, from: &str, to: &str) -> AppResult<VirtualFolder> {
        let mut state = self.state.lock().unwrap();
        let id = state
            .id_of(from)
            .ok_or_else(|| AppError::not_found(format!("Folder not found: {from}")))?;
        if state.occupied(to) {
            return Err(AppError::already_exists(format!("Target exists: {to}")));
        }
        state.relocate(from, to);
        Ok(state.view(&id, to, false))
    }
}

#[async_trait]
impl StorageClient for StableIdClient {
    fn provider_type(&self) -> &str {
        "stable_memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(!self.unavailable.load(Ordering::SeqCst))
    }

    async fn find_folder_by_path(&self, folder_path: &str, load_contents: bool) -> AppResult<VirtualFolder> {
        self.check()?;
        let folder_path = path::normalize(folder_path)?;
        let state = self.state.lock().unwrap();
        let id = state
            .id_of(&folder_path)
            .ok_or_else(|| AppError::not_found(format!("Folder not found: {folder_path}")))?;
        Ok(state.view(&id, &folder_path, load_contents))
    }

    async fn find_folder_by_id(&self, id: &str, load_contents: bool) -> AppResult<VirtualFolder> {
        self.check()?;
        let state = self.state.lock().unwrap();
        let folder_path = state
            .path_of(id)
            .ok_or_else(|| AppError::not_found(format!("Folder id not found: {id}")))?;
        Ok(state.view(id, &folder_path, load_contents))
    }

    async fn find_file_by_path(&self, file_path: &str) -> AppResult<VirtualFile> {
        self.check()?;
        let state = self.state.lock().unwrap();
        let (file_id, data) = state
            .files
            .get(file_path)
            .ok_or_else(|| AppError::not_found(format!("File not found: {file_path}")))?;
        Ok(file_view(file_path, file_id, data))
    }

    async fn find_file_by_id(&self, id: &str) -> AppResult<VirtualFile> {
        self.check()?;
        let state = self.state.lock().unwrap();
        state
            .files
            .iter()
            .find(|(_, (file_id, _))| file_id == id)
            .map(|(p, (file_id, data))| file_view(p, file_id, data))
            .ok_or_else(|| AppError::not_found(format!("File id not found: {id}")))
    }

    async fn create_folder(&self, parent_path: &str, name: &str) -> AppResult<VirtualFolder> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        if state.id_of(parent_path).is_none() {
            return Err(AppError::not_found(format!("Parent not found: {parent_path}")));
        }
        let target = path::join(parent_path, name);
        if state.occupied(&target) {
            return Err(AppError::already_exists(format!("Folder exists: {target}")));
        }
        state.next_id += 1;
        let id = format!("item-{}", state.next_id);
        state.folders.insert(id.clone(), target.clone());
        Ok(state.view(&id, &target, false))
    }

    async fn upload_file(&self, parent_path: &str, name: &str, data: Bytes) -> AppResult<VirtualFile> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        if state.id_of(parent_path).is_none() {
            return Err(AppError::not_found(format!("Parent not found: {parent_path}")));
        }
        let target = path::join(parent_path, name);
        let file_id = match state.files.get(&target) {
            Some((existing, _)) => existing.clone(),
            None => {
                state.next_id += 1;
                format!("file-{}", state.next_id)
            }
        };
        state.files.insert(target.clone(), (file_id.clone(), data.clone()));
        Ok(file_view(&target, &file_id, &data))
    }

    async fn rename_folder(&self, folder_path: &str, new_name: &str) -> AppResult<VirtualFolder> {
        self.check()?;
        let parent = path::parent(folder_path)
            .ok_or_else(|| AppError::validation("Cannot rename the root"))?;
        self.relocate_folder(folder_path, &path::join(&parent, new_name))
    }

    async fn move_folder(&self, folder_path: &str, new_parent_path: &str) -> AppResult<VirtualFolder> {
        self.check()?;
        let to = path::join(new_parent_path, path::name(folder_path));
        self.relocate_folder(folder_path, &to)
    }

    async fn fetch_file(&self, file_path: &str) -> AppResult<ByteStream> {
        self.check()?;
        let data = self
            .state
            .lock()
            .unwrap()
            .files
            .get(file_path)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| AppError::not_found(format!("File not found: {file_path}")))?;
        Ok(Box::pin(futures::stream::once(async move {
            Ok::<_, std::io::Error>(data)
        })))
    }
}
