//! Drive manager: maps registered drives to live storage clients.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use folio_core::error::AppError;
use folio_core::result::AppResult;
use folio_core::traits::storage::StorageClient;
use folio_entity::{DriveDetails, StorageDrive};

/// A drive together with the client that talks to it.
#[derive(Debug, Clone)]
pub struct ManagedDrive {
    /// The registered drive.
    pub drive: StorageDrive,
    /// Client for the drive's backend.
    pub client: Arc<dyn StorageClient>,
}

/// Holds one client per registered drive.
///
/// Drives are immutable once registered, so a client built for a drive
/// stays valid for the drive's lifetime.
#[derive(Debug, Clone)]
pub struct DriveManager {
    drives: Arc<RwLock<HashMap<Uuid, ManagedDrive>>>,
    request_timeout: Duration,
}

impl DriveManager {
    /// Create an empty manager. `request_timeout` bounds each HTTP round trip.
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            drives: Arc::new(RwLock::new(HashMap::new())),
            request_timeout,
        }
    }

    /// Build the client matching a drive's details.
    pub async fn build_client(&self, drive: &StorageDrive) -> AppResult<Arc<dyn StorageClient>> {
        let root = drive.root_path.as_str();
        let client: Arc<dyn StorageClient> = match &drive.details.0 {
            #[cfg(feature = "local")]
            DriveDetails::Local => {
                Arc::new(crate::providers::LocalStorageClient::new(root).await?)
            }
            #[cfg(feature = "s3")]
            DriveDetails::ObjectStore {
                bucket,
                region,
                endpoint,
                access_key,
                secret_key,
            } => {
                let bucket = crate::providers::object::S3Bucket::connect(
                    bucket,
                    region,
                    endpoint.as_deref(),
                    access_key.as_deref(),
                    secret_key.as_deref(),
                )
                .await?;
                Arc::new(crate::providers::ObjectStoreClient::new(Arc::new(bucket), root)?)
            }
            #[cfg(feature = "enterprise-share")]
            DriveDetails::EnterpriseShare { base_url, api_token } => Arc::new(
                crate::providers::EnterpriseShareClient::new(
                    base_url,
                    api_token,
                    root,
                    self.request_timeout,
                )?,
            ),
            #[cfg(feature = "cloud-drive")]
            DriveDetails::CloudDrive {
                graph_url,
                drive_id,
                access_token,
            } => Arc::new(crate::providers::CloudDriveClient::new(
                graph_url,
                drive_id,
                access_token,
                root,
                drive.options.conflict_behavior,
                self.request_timeout,
            )?),
            #[allow(unreachable_patterns)]
            other => {
                return Err(AppError::configuration(format!(
                    "Support for {} drives is not compiled in",
                    other.drive_type()
                )));
            }
        };
        Ok(client)
    }

    /// Build and register the client for a drive.
    pub async fn register(&self, drive: StorageDrive) -> AppResult<ManagedDrive> {
        let client = self.build_client(&drive).await?;
        self.register_client(drive, client).await
    }

    /// Register a drive with an already-built client.
    pub async fn register_client(
        &self,
        drive: StorageDrive,
        client: Arc<dyn StorageClient>,
    ) -> AppResult<ManagedDrive> {
        let mut drives = self.drives.write().await;
        if drives.contains_key(&drive.id) {
            return Err(AppError::already_exists(format!(
                "Drive {} is already registered",
                drive.id
            )));
        }
        info!(
            drive_id = %drive.id,
            drive_type = %drive.drive_type,
            provider = client.provider_type(),
            "Registered drive client"
        );
        let managed = ManagedDrive { drive, client };
        drives.insert(managed.drive.id, managed.clone());
        Ok(managed)
    }

    /// Remove a drive's client.
    pub async fn unregister(&self, drive_id: &Uuid) {
        self.drives.write().await.remove(drive_id);
    }

    /// Get a registered drive and its client.
    pub async fn get(&self, drive_id: &Uuid) -> AppResult<ManagedDrive> {
        self.drives
            .read()
            .await
            .get(drive_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Drive {drive_id} is not loaded")))
    }

    /// Check health of all registered drives.
    pub async fn health_check_all(&self) -> HashMap<Uuid, bool> {
        let drives: Vec<ManagedDrive> = self.drives.read().await.values().cloned().collect();
        let mut results = HashMap::new();
        for managed in drives {
            let healthy = managed.client.health_check().await.unwrap_or(false);
            results.insert(managed.drive.id, healthy);
        }
        results
    }
}

impl Default for DriveManager {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}
