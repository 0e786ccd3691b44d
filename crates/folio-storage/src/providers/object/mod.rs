//! Object-store client.
//!
//! Buckets have no folders, so a folder is represented by a zero-byte
//! marker object whose key ends in `/`. A prefix that holds objects but has
//! no marker (written by another tool) still counts as a folder. The
//! uniform path is the identifier; renames and moves copy every object and
//! then delete the originals, which is not atomic.

pub mod bucket;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use folio_core::error::AppError;
use folio_core::result::AppResult;
use folio_core::traits::storage::{ByteStream, StorageClient, VirtualFile, VirtualFolder};
use folio_core::types::path;

pub use bucket::{MemoryBucket, ObjectBucket, ObjectEntry, ObjectListing};
#[cfg(feature = "s3")]
pub use bucket::S3Bucket;

use super::check_name;

/// Storage client over a bucket.
#[derive(Debug, Clone)]
pub struct ObjectStoreClient {
    bucket: Arc<dyn ObjectBucket>,
    /// Key prefix mapped to the uniform root: empty, or ending in `/`.
    prefix: String,
}

impl ObjectStoreClient {
    /// Create a client over `bucket`, rooted at the key prefix `root_path`.
    pub fn new(bucket: Arc<dyn ObjectBucket>, root_path: &str) -> AppResult<Self> {
        let root = path::normalize(root_path)?;
        let prefix = if root == path::ROOT {
            String::new()
        } else {
            format!("{}/", root.trim_start_matches('/'))
        };
        Ok(Self { bucket, prefix })
    }

    /// Key of the marker object for a uniform folder path.
    fn folder_key(&self, uniform: &str) -> String {
        if uniform == path::ROOT {
            self.prefix.clone()
        } else {
            format!("{}{}/", self.prefix, uniform.trim_start_matches('/'))
        }
    }

    fn file_key(&self, uniform: &str) -> String {
        format!("{}{}", self.prefix, uniform.trim_start_matches('/'))
    }

    fn uniform_from_key(&self, key: &str) -> String {
        let rest = key
            .strip_prefix(&self.prefix)
            .unwrap_or(key)
            .trim_end_matches('/');
        format!("/{rest}")
    }

    async fn folder_exists(&self, uniform: &str) -> AppResult<bool> {
        if uniform == path::ROOT {
            return Ok(true);
        }
        let key = self.folder_key(uniform);
        if self.bucket.head(&key).await?.is_some() {
            return Ok(true);
        }
        let listing = self.bucket.list(&key, Some("/")).await?;
        Ok(!listing.objects.is_empty() || !listing.prefixes.is_empty())
    }

    async fn require_folder(&self, uniform: &str) -> AppResult<String> {
        let uniform = path::normalize(uniform)?;
        if !self.folder_exists(&uniform).await? {
            return Err(AppError::not_found(format!("Folder not found: {uniform}")));
        }
        Ok(uniform)
    }

    fn folder(&self, uniform: &str) -> VirtualFolder {
        VirtualFolder::new(uniform.to_string(), uniform.to_string())
            .with_url(self.bucket.object_url(&self.folder_key(uniform)))
            .with_parent_id(path::parent(uniform))
    }

    fn file(&self, entry: ObjectEntry) -> VirtualFile {
        let uniform = self.uniform_from_key(&entry.key);
        VirtualFile {
            name: path::name(&uniform).to_string(),
            file_id: uniform.clone(),
            url: self.bucket.object_url(&entry.key),
            path: uniform,
            size: entry.size,
            last_modified: entry.last_modified,
        }
    }

    async fn folder_at(&self, uniform: &str, load_contents: bool) -> AppResult<VirtualFolder> {
        let uniform = self.require_folder(uniform).await?;
        let folder = self.folder(&uniform);
        if !load_contents {
            return Ok(folder);
        }

        let marker = self.folder_key(&uniform);
        let listing = self.bucket.list(&marker, Some("/")).await?;
        let folders = listing
            .prefixes
            .iter()
            .map(|prefix| self.folder(&self.uniform_from_key(prefix)))
            .collect();
        let files = listing
            .objects
            .into_iter()
            .filter(|entry| entry.key != marker)
            .map(|entry| self.file(entry))
            .collect();
        Ok(folder.with_contents(folders, files))
    }

    async fn file_at(&self, uniform: &str) -> AppResult<VirtualFile> {
        let uniform = path::normalize(uniform)?;
        if uniform == path::ROOT {
            return Err(AppError::not_found("The drive root is not a file"));
        }
        let entry = self
            .bucket
            .head(&self.file_key(&uniform))
            .await?
            .ok_or_else(|| AppError::not_found(format!("File not found: {uniform}")))?;
        Ok(self.file(entry))
    }

    /// Copy everything under `source` to `target`, then delete the originals.
    async fn relocate(&self, source: &str, target: &str) -> AppResult<VirtualFolder> {
        let source = self.require_folder(source).await?;
        if source == path::ROOT {
            return Err(AppError::validation("The drive root cannot be renamed or moved"));
        }
        if target == source || path::is_descendant(target, &source) {
            return Err(AppError::validation(format!(
                "Cannot move '{source}' to '{target}'"
            )));
        }
        if self.folder_exists(target).await? || self.bucket.head(&self.file_key(target)).await?.is_some() {
            return Err(AppError::already_exists(format!(
                "Folder already exists: {target}"
            )));
        }

        let old_prefix = self.folder_key(&source);
        let new_prefix = self.folder_key(target);
        let objects = self.bucket.list(&old_prefix, None).await?.objects;

        warn!(
            bucket = self.bucket.name(),
            from = %source,
            to = %target,
            objects = objects.len(),
            "Relocating folder by copy and delete; not atomic"
        );

        for entry in &objects {
            let suffix = &entry.key[old_prefix.len()..];
            self.bucket
                .copy(&entry.key, &format!("{new_prefix}{suffix}"))
                .await?;
        }
        if !objects.iter().any(|entry| entry.key == old_prefix) {
            self.bucket.put(&new_prefix, Bytes::new()).await?;
        }
        for entry in &objects {
            self.bucket.delete(&entry.key).await?;
        }

        Ok(self.folder(target))
    }
}

#[async_trait]
impl StorageClient for ObjectStoreClient {
    fn provider_type(&self) -> &str {
        "object_store"
    }

    fn stable_ids(&self) -> bool {
        false
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.bucket.health_check().await
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
        let parent = self.require_folder(parent_path).await?;
        let target = path::join(&parent, name);

        let occupied = self.folder_exists(&target).await?
            || self.bucket.head(&self.file_key(&target)).await?.is_some();
        if occupied {
            return Err(AppError::already_exists(format!(
                "Folder already exists: {target}"
            )));
        }

        self.bucket.put(&self.folder_key(&target), Bytes::new()).await?;
        debug!(bucket = self.bucket.name(), path = %target, "Created folder marker");
        Ok(self.folder(&target))
    }

    /// Uploading over an existing object replaces it silently.
    async fn upload_file(&self, parent_path: &str, name: &str, data: Bytes) -> AppResult<VirtualFile> {
        check_name(name)?;
        let parent = self.require_folder(parent_path).await?;
        let target = path::join(&parent, name);
        if self.folder_exists(&target).await? {
            return Err(AppError::already_exists(format!(
                "A folder occupies {target}"
            )));
        }
        let key = self.file_key(&target);
        let size = data.len();

        self.bucket.put(&key, data).await?;
        debug!(bucket = self.bucket.name(), key = %key, bytes = size, "Uploaded object");
        self.file_at(&target).await
    }

    async fn rename_folder(&self, path: &str, new_name: &str) -> AppResult<VirtualFolder> {
        check_name(new_name)?;
        let source = path::normalize(path)?;
        let parent = path::parent(&source)
            .ok_or_else(|| AppError::validation("The drive root cannot be renamed"))?;
        self.relocate(&source, &path::join(&parent, new_name)).await
    }

    async fn move_folder(&self, path: &str, new_parent_path: &str) -> AppResult<VirtualFolder> {
        let source = path::normalize(path)?;
        let new_parent = self.require_folder(new_parent_path).await?;
        self.relocate(&source, &path::join(&new_parent, path::name(&source)))
            .await
    }

    async fn fetch_file(&self, path: &str) -> AppResult<ByteStream> {
        let uniform = path::normalize(path)?;
        self.bucket.get(&self.file_key(&uniform)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::ErrorKind;
    use futures::TryStreamExt;

    fn client(bucket: &Arc<MemoryBucket>) -> ObjectStoreClient {
        ObjectStoreClient::new(bucket.clone(), "/research").unwrap()
    }

    #[tokio::test]
    async fn test_create_writes_marker_and_detects_duplicates() {
        let bucket = Arc::new(MemoryBucket::new("test"));
        let client = client(&bucket);

        let folder = client.create_folder("/", "Studies").await.unwrap();
        assert_eq!(folder.path, "/Studies");
        assert_eq!(folder.folder_id, "/Studies");
        assert_eq!(bucket.keys().await, vec!["research/Studies/".to_string()]);

        let err = client.create_folder("/", "Studies").await.unwrap_err();
        assert!(err.is_already_exists());

        let err = client.create_folder("/Nope", "X").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_prefix_without_marker_is_a_folder() {
        let bucket = Arc::new(MemoryBucket::new("test"));
        bucket
            .put("research/Imported/data.csv", Bytes::from_static(b"a,b"))
            .await
            .unwrap();
        let client = client(&bucket);

        let folder = client.find_folder_by_path("/Imported", true).await.unwrap();
        assert_eq!(folder.files.len(), 1);
        assert_eq!(folder.files[0].path, "/Imported/data.csv");

        let err = client.create_folder("/", "Imported").await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_listing_excludes_own_marker() {
        let bucket = Arc::new(MemoryBucket::new("test"));
        let client = client(&bucket);
        client.create_folder("/", "A").await.unwrap();
        client.create_folder("/A", "B").await.unwrap();
        client
            .upload_file("/A", "x.txt", Bytes::from_static(b"x"))
            .await
            .unwrap();

        let folder = client.find_folder_by_path("/A", true).await.unwrap();
        assert_eq!(folder.folders.len(), 1);
        assert_eq!(folder.folders[0].path, "/A/B");
        assert_eq!(folder.files.len(), 1);
        assert_eq!(folder.files[0].name, "x.txt");
    }

    #[tokio::test]
    async fn test_rename_copies_then_deletes_everything() {
        let bucket = Arc::new(MemoryBucket::new("test"));
        let client = client(&bucket);
        client.create_folder("/", "Old").await.unwrap();
        client.create_folder("/Old", "Sub").await.unwrap();
        client
            .upload_file("/Old", "a.txt", Bytes::from_static(b"a"))
            .await
            .unwrap();
        client
            .upload_file("/Old/Sub", "b.txt", Bytes::from_static(b"bb"))
            .await
            .unwrap();

        let renamed = client.rename_folder("/Old", "New").await.unwrap();
        assert_eq!(renamed.folder_id, "/New");

        assert_eq!(
            bucket.keys().await,
            vec![
                "research/New/".to_string(),
                "research/New/Sub/".to_string(),
                "research/New/Sub/b.txt".to_string(),
                "research/New/a.txt".to_string(),
            ]
        );
        let chunks: Vec<Bytes> = client
            .fetch_file("/New/Sub/b.txt")
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(chunks.concat(), b"bb");
    }

    #[tokio::test]
    async fn test_move_refuses_occupied_target_and_own_subtree() {
        let bucket = Arc::new(MemoryBucket::new("test"));
        let client = client(&bucket);
        client.create_folder("/", "A").await.unwrap();
        client.create_folder("/", "B").await.unwrap();
        client.create_folder("/B", "A").await.unwrap();

        let err = client.move_folder("/A", "/B").await.unwrap_err();
        assert!(err.is_already_exists());

        let err = client.move_folder("/B", "/B/A").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_upload_overwrites() {
        let bucket = Arc::new(MemoryBucket::new("test"));
        let client = client(&bucket);
        client.upload_file("/", "f.txt", Bytes::from_static(b"1")).await.unwrap();
        let file = client
            .upload_file("/", "f.txt", Bytes::from_static(b"22"))
            .await
            .unwrap();
        assert_eq!(file.size, 2);
        assert_eq!(client.find_file_by_id("/f.txt").await.unwrap().size, 2);
    }

    #[tokio::test]
    async fn test_upload_refuses_name_of_existing_folder() {
        let bucket = Arc::new(MemoryBucket::new("test"));
        let client = client(&bucket);
        client.create_folder("/", "A").await.unwrap();

        let err = client
            .upload_file("/", "A", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(bucket.keys().await, vec!["research/A/".to_string()]);
    }
}
