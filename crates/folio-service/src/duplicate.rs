//! Handling of "already exists" outcomes from folder creation.

use tracing::info;

use folio_core::error::AppError;
use folio_core::result::AppResult;
use folio_core::traits::storage::{StorageClient, VirtualFolder};
use folio_core::types::DuplicatePolicy;
use folio_entity::EntityRecord;

/// Decides what a create-folder call that hit an occupied path returns.
///
/// The decision only looks at the error kind, so every backend is treated
/// the same way.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateResolutionPolicy {
    policy: DuplicatePolicy,
}

impl DuplicateResolutionPolicy {
    /// Create a resolution policy.
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self { policy }
    }

    /// The configured mode.
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Resolve a failed creation at `path`.
    ///
    /// Errors other than `AlreadyExists` are returned unchanged. With
    /// `reuse_existing` the folder at `path` is looked up and returned as
    /// is; a `NotFound` from that lookup means it vanished in between. A
    /// file sitting at `path` cannot be reused and is a `Duplicate`.
    pub async fn resolve(
        &self,
        error: AppError,
        client: &dyn StorageClient,
        entity: &EntityRecord,
        path: &str,
    ) -> AppResult<VirtualFolder> {
        if !error.is_already_exists() {
            return Err(error);
        }
        match self.policy {
            DuplicatePolicy::Fail => Err(AppError::duplicate(format!(
                "Folder '{path}' for {} {} already exists",
                entity.kind, entity.id
            ))),
            DuplicatePolicy::ReuseExisting => {
                let existing = match client.find_folder_by_path(path, false).await {
                    Ok(folder) => folder,
                    Err(e) if e.is_not_found() => {
                        if client.find_file_by_path(path).await.is_ok() {
                            return Err(AppError::duplicate(format!(
                                "A file occupies '{path}', the folder path of {} {}",
                                entity.kind, entity.id
                            )));
                        }
                        return Err(e);
                    }
                    Err(e) => return Err(e),
                };
                info!(
                    entity_id = %entity.id,
                    path = %existing.path,
                    folder_id = %existing.folder_id,
                    "Reusing existing folder"
                );
                Ok(existing)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::error::ErrorKind;
    use folio_storage::providers::LocalStorageClient;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_modes() {
        let dir = tempfile::tempdir().unwrap();
        let client = LocalStorageClient::new(&dir.path().to_string_lossy()).await.unwrap();
        let existing = client.create_folder("/", "CPA").await.unwrap();
        let entity = EntityRecord::program(Uuid::new_v4(), "CPA", None);

        let conflict = client.create_folder("/", "CPA").await.unwrap_err();
        let reused = DuplicateResolutionPolicy::new(DuplicatePolicy::ReuseExisting)
            .resolve(conflict, &client, &entity, "/CPA")
            .await
            .unwrap();
        assert_eq!(reused.folder_id, existing.folder_id);

        let conflict = client.create_folder("/", "CPA").await.unwrap_err();
        let err = DuplicateResolutionPolicy::new(DuplicatePolicy::Fail)
            .resolve(conflict, &client, &entity, "/CPA")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Duplicate);

        let unrelated = AppError::backend_unavailable("timeout");
        let err = DuplicateResolutionPolicy::new(DuplicatePolicy::ReuseExisting)
            .resolve(unrelated, &client, &entity, "/CPA")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::BackendUnavailable);
    }

    #[tokio::test]
    async fn test_file_in_the_way_is_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let client = LocalStorageClient::new(&dir.path().to_string_lossy()).await.unwrap();
        std::fs::write(dir.path().join("CPA"), b"notes").unwrap();
        let entity = EntityRecord::program(Uuid::new_v4(), "CPA", None);

        let conflict = client.create_folder("/", "CPA").await.unwrap_err();
        assert!(conflict.is_already_exists());
        let err = DuplicateResolutionPolicy::new(DuplicatePolicy::ReuseExisting)
            .resolve(conflict, &client, &entity, "/CPA")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Duplicate);
        assert!(err.message.contains("/CPA"));
    }
}
