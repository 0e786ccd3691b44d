//! Local filesystem storage client.
//!
//! The uniform path doubles as the folder and file identifier, so ids
//! change when a folder is renamed or moved.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::StreamExt;
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::debug;

use folio_core::error::{AppError, ErrorKind};
use folio_core::result::AppResult;
use folio_core::traits::storage::{ByteStream, StorageClient, VirtualFile, VirtualFolder};
use folio_core::types::path;

use super::check_name;

/// Local filesystem storage client.
#[derive(Debug, Clone)]
pub struct LocalStorageClient {
    /// Directory mapped to the uniform root `/`.
    root: PathBuf,
}

impl LocalStorageClient {
    /// Create a client rooted at the given directory, creating it if needed.
    pub async fn new(root_path: &str) -> AppResult<Self> {
        let root = PathBuf::from(root_path);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// Map a uniform path to a filesystem path below the root.
    fn resolve(&self, uniform: &str) -> AppResult<(String, PathBuf)> {
        let uniform = path::normalize(uniform)?;
        let mut full = self.root.clone();
        for segment in path::segments(&uniform) {
            full.push(segment);
        }
        Ok((uniform, full))
    }

    fn url_for(full: &std::path::Path) -> Option<String> {
        url::Url::from_file_path(full).ok().map(String::from)
    }

    async fn folder_at(&self, uniform: &str, load_contents: bool) -> AppResult<VirtualFolder> {
        let (uniform, full) = self.resolve(uniform)?;
        let meta = fs::metadata(&full)
            .await
            .map_err(|e| io_error(e, format!("Folder not found: {uniform}")))?;
        if !meta.is_dir() {
            return Err(AppError::not_found(format!("Not a folder: {uniform}")));
        }

        let folder = VirtualFolder::new(uniform.clone(), uniform.clone())
            .with_url(Self::url_for(&full))
            .with_parent_id(path::parent(&uniform));
        if !load_contents {
            return Ok(folder);
        }

        let mut folders = Vec::new();
        let mut files = Vec::new();
        let mut dir = fs::read_dir(&full)
            .await
            .map_err(|e| io_error(e, format!("Failed to list folder: {uniform}")))?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| io_error(e, "Failed to read directory entry"))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            let child = path::join(&uniform, &name);
            let entry_meta = entry
                .metadata()
                .await
                .map_err(|e| io_error(e, "Failed to get entry metadata"))?;
            if entry_meta.is_dir() {
                folders.push(
                    VirtualFolder::new(child.clone(), child)
                        .with_url(Self::url_for(&entry.path()))
                        .with_parent_id(Some(uniform.clone())),
                );
            } else {
                files.push(VirtualFile {
                    name,
                    file_id: child.clone(),
                    path: child,
                    url: Self::url_for(&entry.path()),
                    size: entry_meta.len(),
                    last_modified: entry_meta.modified().ok().map(DateTime::<Utc>::from),
                });
            }
        }
        folders.sort_by(|a, b| a.name.cmp(&b.name));
        files.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(folder.with_contents(folders, files))
    }

    async fn file_at(&self, uniform: &str) -> AppResult<VirtualFile> {
        let (uniform, full) = self.resolve(uniform)?;
        let meta = fs::metadata(&full)
            .await
            .map_err(|e| io_error(e, format!("File not found: {uniform}")))?;
        if !meta.is_file() {
            return Err(AppError::not_found(format!("Not a file: {uniform}")));
        }
        Ok(VirtualFile {
            name: path::name(&uniform).to_string(),
            file_id: uniform.clone(),
            path: uniform,
            url: Self::url_for(&full),
            size: meta.len(),
            last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    /// Full path of an existing directory.
    async fn existing_dir(&self, uniform: &str) -> AppResult<(String, PathBuf)> {
        let (uniform, full) = self.resolve(uniform)?;
        match fs::metadata(&full).await {
            Ok(meta) if meta.is_dir() => Ok((uniform, full)),
            Ok(_) => Err(AppError::not_found(format!("Not a folder: {uniform}"))),
            Err(e) => Err(io_error(e, format!("Folder not found: {uniform}"))),
        }
    }

    async fn relocate(&self, from: &str, to_parent: &str, to_name: &str) -> AppResult<VirtualFolder> {
        let (source, source_full) = self.existing_dir(from).await?;
        if source == path::ROOT {
            return Err(AppError::validation("The drive root cannot be renamed or moved"));
        }
        let (parent, parent_full) = self.existing_dir(to_parent).await?;
        let target = path::join(&parent, to_name);
        if target == source || path::is_descendant(&target, &source) {
            return Err(AppError::validation(format!(
                "Cannot move '{source}' into itself"
            )));
        }

        let target_full = parent_full.join(to_name);
        if fs::try_exists(&target_full).await.unwrap_or(false) {
            return Err(AppError::already_exists(format!(
                "Folder already exists: {target}"
            )));
        }
        fs::rename(&source_full, &target_full)
            .await
            .map_err(|e| io_error(e, format!("Failed to move {source} -> {target}")))?;

        debug!(from = %source, to = %target, "Relocated folder");
        self.folder_at(&target, false).await
    }
}

#[async_trait]
impl StorageClient for LocalStorageClient {
    fn provider_type(&self) -> &str {
        "local"
    }

    fn stable_ids(&self) -> bool {
        false
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn find_folder_by_path(&self, path: &str, load_contents: bool) -> AppResult<VirtualFolder> {
        self.folder_at(path, load_contents).await
    }

    async fn find_folder_by_id(&self, id: &str, load_contents: bool) -> AppResult<VirtualFolder> {
        self.folder_at(id, load_contents).await
    }

    async fn find_file_by_path(&self, path: &str) -> AppResult<VirtualFile> {
        self.file_at(path).await
    }

    async fn find_file_by_id(&self, id: &str) -> AppResult<VirtualFile> {
        self.file_at(id).await
    }

    async fn create_folder(&self, parent_path: &str, name: &str) -> AppResult<VirtualFolder> {
        check_name(name)?;
        let (parent, parent_full) = self.existing_dir(parent_path).await?;
        let target = path::join(&parent, name);

        fs::create_dir(parent_full.join(name)).await.map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                AppError::with_source(
                    ErrorKind::AlreadyExists,
                    format!("Folder already exists: {target}"),
                    e,
                )
            } else {
                io_error(e, format!("Failed to create folder: {target}"))
            }
        })?;

        debug!(path = %target, "Created folder");
        self.folder_at(&target, false).await
    }

    async fn upload_file(&self, parent_path: &str, name: &str, data: Bytes) -> AppResult<VirtualFile> {
        check_name(name)?;
        let (parent, parent_full) = self.existing_dir(parent_path).await?;
        let target = path::join(&parent, name);
        let target_full = parent_full.join(name);

        if fs::metadata(&target_full).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(AppError::already_exists(format!(
                "A folder occupies {target}"
            )));
        }
        fs::write(&target_full, &data)
            .await
            .map_err(|e| io_error(e, format!("Failed to write file: {target}")))?;

        debug!(path = %target, bytes = data.len(), "Wrote file");
        self.file_at(&target).await
    }

    async fn rename_folder(&self, path: &str, new_name: &str) -> AppResult<VirtualFolder> {
        check_name(new_name)?;
        let source = path::normalize(path)?;
        let parent = path::parent(&source).unwrap_or_else(|| path::ROOT.to_string());
        self.relocate(&source, &parent, new_name).await
    }

    async fn move_folder(&self, path: &str, new_parent_path: &str) -> AppResult<VirtualFolder> {
        let source = path::normalize(path)?;
        let name = path::name(&source).to_string();
        self.relocate(&source, new_parent_path, &name).await
    }

    async fn fetch_file(&self, path: &str) -> AppResult<ByteStream> {
        let (uniform, full) = self.resolve(path)?;
        let file = fs::File::open(&full)
            .await
            .map_err(|e| io_error(e, format!("File not found: {uniform}")))?;
        let stream = ReaderStream::new(file);
        Ok(Box::pin(stream.map(|r| r.map(|b| b.into()))))
    }
}

fn io_error(e: io::Error, message: impl Into<String>) -> AppError {
    let kind = match e.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
        _ => ErrorKind::BackendUnavailable,
    };
    AppError::with_source(kind, message, e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    async fn client() -> (tempfile::TempDir, LocalStorageClient) {
        let dir = tempfile::tempdir().unwrap();
        let client = LocalStorageClient::new(dir.path().to_str().unwrap())
            .await
            .unwrap();
        (dir, client)
    }

    #[tokio::test]
    async fn test_create_and_find_folder() {
        let (_dir, client) = client().await;
        let folder = client.create_folder("/", "Programs").await.unwrap();
        assert_eq!(folder.path, "/Programs");
        assert_eq!(folder.folder_id, "/Programs");

        let study = client
            .create_folder("/Programs", "CPA-10001 - First In Human")
            .await
            .unwrap();
        assert_eq!(study.path, "/Programs/CPA-10001 - First In Human");
        assert_eq!(study.parent.unwrap().path, "/Programs");

        let root = client.find_folder_by_path("/", true).await.unwrap();
        assert!(root.contents_loaded);
        assert_eq!(root.folders.len(), 1);
    }

    #[tokio::test]
    async fn test_create_reports_existing_and_missing_parent() {
        let (_dir, client) = client().await;
        client.create_folder("/", "A").await.unwrap();

        let err = client.create_folder("/", "A").await.unwrap_err();
        assert!(err.is_already_exists());

        let err = client.create_folder("/Missing", "B").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_path_traversal_is_rejected() {
        let (_dir, client) = client().await;
        let err = client.find_folder_by_path("/../etc", false).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        let err = client.create_folder("/", "..").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_upload_overwrites_and_streams_back() {
        let (_dir, client) = client().await;
        client.create_folder("/", "Docs").await.unwrap();
        client
            .upload_file("/Docs", "notes.txt", Bytes::from("first"))
            .await
            .unwrap();
        let file = client
            .upload_file("/Docs", "notes.txt", Bytes::from("second!"))
            .await
            .unwrap();
        assert_eq!(file.size, 7);
        assert_eq!(file.file_id, "/Docs/notes.txt");

        let chunks: Vec<Bytes> = client
            .fetch_file("/Docs/notes.txt")
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(chunks.concat(), b"second!");
    }

    #[tokio::test]
    async fn test_rename_and_move_change_identifier() {
        let (_dir, client) = client().await;
        client.create_folder("/", "A").await.unwrap();
        client.create_folder("/", "B").await.unwrap();
        client.create_folder("/A", "Study").await.unwrap();

        let renamed = client.rename_folder("/A/Study", "Renamed").await.unwrap();
        assert_eq!(renamed.folder_id, "/A/Renamed");

        let moved = client.move_folder("/A/Renamed", "/B").await.unwrap();
        assert_eq!(moved.path, "/B/Renamed");
        assert!(client.find_folder_by_path("/A/Renamed", false).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_rename_onto_existing_folder_fails() {
        let (_dir, client) = client().await;
        client.create_folder("/", "A").await.unwrap();
        client.create_folder("/", "B").await.unwrap();
        let err = client.rename_folder("/A", "B").await.unwrap_err();
        assert!(err.is_already_exists());

        let err = client.move_folder("/A", "/A").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
