//! Storage client trait and the backend-agnostic folder/file model.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;
use crate::types::path;

/// A byte stream type used for reading file contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Weak reference to a folder: enough to look it up again, nothing owned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRef {
    /// Uniform path of the folder.
    pub path: String,
    /// Backend identifier, when the backend exposes one cheaply.
    pub folder_id: Option<String>,
}

/// A file as reported by a backend. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualFile {
    /// File name.
    pub name: String,
    /// Uniform path.
    pub path: String,
    /// Backend-assigned identifier.
    pub file_id: String,
    /// Link a human can open, if the backend has one.
    pub url: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, if reported.
    pub last_modified: Option<DateTime<Utc>>,
}

/// A folder as reported by a backend.
///
/// `folders` and `files` are only populated when contents were explicitly
/// requested; they are a snapshot and are never kept in sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualFolder {
    /// Folder name.
    pub name: String,
    /// Uniform path.
    pub path: String,
    /// Backend-assigned identifier.
    pub folder_id: String,
    /// Link a human can open, if the backend has one.
    pub url: Option<String>,
    /// Parent folder, `None` for the drive root.
    pub parent: Option<FolderRef>,
    /// Sub-folders (only when `contents_loaded`).
    pub folders: Vec<VirtualFolder>,
    /// Files (only when `contents_loaded`).
    pub files: Vec<VirtualFile>,
    /// Whether `folders`/`files` reflect a listing.
    pub contents_loaded: bool,
}

impl VirtualFolder {
    /// Build a folder without contents; the parent is derived from the path.
    pub fn new(path: impl Into<String>, folder_id: impl Into<String>) -> Self {
        let path = path.into();
        let name = path::name(&path).to_string();
        let parent = path::parent(&path).map(|p| FolderRef {
            path: p,
            folder_id: None,
        });
        Self {
            name,
            path,
            folder_id: folder_id.into(),
            url: None,
            parent,
            folders: Vec::new(),
            files: Vec::new(),
            contents_loaded: false,
        }
    }

    /// Attach a human link.
    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    /// Attach the parent's backend identifier.
    pub fn with_parent_id(mut self, parent_id: Option<String>) -> Self {
        if let Some(parent) = self.parent.as_mut() {
            parent.folder_id = parent_id;
        }
        self
    }

    /// Attach listed contents.
    pub fn with_contents(mut self, folders: Vec<VirtualFolder>, files: Vec<VirtualFile>) -> Self {
        self.folders = folders;
        self.files = files;
        self.contents_loaded = true;
        self
    }
}

/// Uniform operation set implemented once per storage backend.
///
/// Implementations must translate every backend-native failure into the
/// shared taxonomy: `NotFound`, `AlreadyExists` (folder creation, rename
/// and move onto an occupied path), `BackendUnavailable`, `Configuration`.
/// Clients hold only immutable configuration and are safe to call
/// concurrently.
#[async_trait]
pub trait StorageClient: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "object_store").
    fn provider_type(&self) -> &str;

    /// Whether folder ids survive rename and move.
    ///
    /// Path-addressed backends return `false`: their identifier is the
    /// path, so a rename yields a new id.
    fn stable_ids(&self) -> bool {
        true
    }

    /// Compose the path of `name` inside `parent`.
    fn child_path(&self, parent: &str, name: &str) -> String {
        path::join(parent, name)
    }

    /// Check whether the backend is reachable with the configured credentials.
    async fn health_check(&self) -> AppResult<bool>;

    /// Find a folder by uniform path.
    async fn find_folder_by_path(&self, path: &str, load_contents: bool)
    -> AppResult<VirtualFolder>;

    /// Find a folder by backend identifier.
    async fn find_folder_by_id(&self, id: &str, load_contents: bool) -> AppResult<VirtualFolder>;

    /// Find a file by uniform path.
    async fn find_file_by_path(&self, path: &str) -> AppResult<VirtualFile>;

    /// Find a file by backend identifier.
    async fn find_file_by_id(&self, id: &str) -> AppResult<VirtualFile>;

    /// Create `name` inside `parent_path`.
    ///
    /// Fails with `AlreadyExists` when something occupies the target and
    /// with `NotFound` when the parent does not exist.
    async fn create_folder(&self, parent_path: &str, name: &str) -> AppResult<VirtualFolder>;

    /// Store a file named `name` inside `parent_path`.
    async fn upload_file(&self, parent_path: &str, name: &str, data: Bytes)
    -> AppResult<VirtualFile>;

    /// Rename the folder at `path`, keeping it in the same parent.
    async fn rename_folder(&self, path: &str, new_name: &str) -> AppResult<VirtualFolder>;

    /// Move the folder at `path` into `new_parent_path`.
    async fn move_folder(&self, path: &str, new_parent_path: &str) -> AppResult<VirtualFolder>;

    /// Stream the contents of the file at `path`.
    async fn fetch_file(&self, path: &str) -> AppResult<ByteStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_folder_derives_parent() {
        let folder = VirtualFolder::new("/CPA/Study", "42").with_parent_id(Some("7".into()));
        assert_eq!(folder.name, "Study");
        assert_eq!(
            folder.parent,
            Some(FolderRef {
                path: "/CPA".to_string(),
                folder_id: Some("7".to_string()),
            })
        );
        assert!(!folder.contents_loaded);
    }

    #[test]
    fn test_root_has_no_parent() {
        let root = VirtualFolder::new("/", "root");
        assert!(root.parent.is_none());
        assert_eq!(root.name, "");
    }
}
