//! Storage drive model.
//!
//! A drive is one configured backend endpoint. It is shared by every
//! folder registered on it and is immutable once registered: changing
//! credentials or behaviour means registering a new drive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use folio_core::types::{DuplicatePolicy, FolderNameStyle};
use folio_core::{AppError, AppResult};

use super::kind::DriveType;

/// Backend-specific connection details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DriveDetails {
    /// Local filesystem; `root_path` is a directory.
    Local,
    /// S3-compatible bucket; `root_path` is a key prefix.
    ObjectStore {
        /// Bucket name.
        bucket: String,
        /// Region.
        region: String,
        /// Custom endpoint (MinIO and other S3-compatible services).
        #[serde(default)]
        endpoint: Option<String>,
        /// Access key ID (default credential chain when absent).
        #[serde(default)]
        access_key: Option<String>,
        /// Secret access key.
        #[serde(default)]
        secret_key: Option<String>,
    },
    /// Enterprise file share; `root_path` is the tenant folder prefixed on
    /// every request (e.g. `/Shared/Research`).
    EnterpriseShare {
        /// Tenant base URL, e.g. `https://acme.example-share.com`.
        base_url: String,
        /// API bearer token.
        api_token: String,
    },
    /// Cloud drive over a graph API; `root_path` is the folder inside the
    /// drive used as the top of the hierarchy.
    CloudDrive {
        /// Graph API base URL.
        #[serde(default = "default_graph_url")]
        graph_url: String,
        /// Drive identifier.
        drive_id: String,
        /// Bearer token.
        access_token: String,
    },
}

impl DriveDetails {
    /// The drive type these details belong to.
    pub fn drive_type(&self) -> DriveType {
        match self {
            Self::Local => DriveType::Local,
            Self::ObjectStore { .. } => DriveType::ObjectStore,
            Self::EnterpriseShare { .. } => DriveType::EnterpriseShare,
            Self::CloudDrive { .. } => DriveType::CloudDrive,
        }
    }
}

/// Conflict flag sent with cloud-drive folder creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictBehavior {
    /// The backend refuses to create over an existing item.
    #[default]
    Fail,
    /// The backend replaces an existing item.
    Replace,
}

impl ConflictBehavior {
    /// Wire value of the flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Replace => "replace",
        }
    }
}

/// Behaviour switches fixed at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveOptions {
    /// Duplicate policy; the configured default applies when absent.
    #[serde(default)]
    pub duplicate_policy: Option<DuplicatePolicy>,
    /// Folder name style; the configured default applies when absent.
    #[serde(default)]
    pub name_style: Option<FolderNameStyle>,
    /// Cloud-drive conflict flag.
    #[serde(default)]
    pub conflict_behavior: ConflictBehavior,
    /// Whether new entity folders accept uploads.
    #[serde(default = "default_true")]
    pub write_enabled: bool,
    /// Whether new entity folders allow deletion.
    #[serde(default)]
    pub delete_enabled: bool,
}

impl Default for DriveOptions {
    fn default() -> Self {
        Self {
            duplicate_policy: None,
            name_style: None,
            conflict_behavior: ConflictBehavior::default(),
            write_enabled: true,
            delete_enabled: false,
        }
    }
}

/// A registered storage drive.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StorageDrive {
    /// Unique drive identifier.
    pub id: Uuid,
    /// Human-readable name.
    pub display_name: String,
    /// Backend kind.
    pub drive_type: DriveType,
    /// Backend root (directory, key prefix, tenant folder).
    pub root_path: String,
    /// Connection details.
    pub details: Json<DriveDetails>,
    /// Behaviour switches.
    pub options: Json<DriveOptions>,
    /// Whether new folders may be placed on this drive.
    pub active: bool,
    /// When the drive was registered.
    pub created_at: DateTime<Utc>,
}

impl StorageDrive {
    /// Effective duplicate policy.
    pub fn duplicate_policy(&self, default: DuplicatePolicy) -> DuplicatePolicy {
        self.options.duplicate_policy.unwrap_or(default)
    }

    /// Effective folder name style.
    pub fn name_style(&self, default: FolderNameStyle) -> FolderNameStyle {
        self.options.name_style.unwrap_or(default)
    }
}

/// Data required to register a drive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStorageDrive {
    /// Human-readable name.
    pub display_name: String,
    /// Backend root.
    pub root_path: String,
    /// Connection details; also determine the drive type.
    pub details: DriveDetails,
    /// Behaviour switches.
    #[serde(default)]
    pub options: DriveOptions,
}

impl NewStorageDrive {
    /// Check the registration data before it is persisted.
    pub fn validate(&self) -> AppResult<()> {
        if self.display_name.trim().is_empty() {
            return Err(AppError::validation("Drive name cannot be empty"));
        }
        match &self.details {
            DriveDetails::Local if self.root_path.trim().is_empty() => Err(
                AppError::configuration("A local drive needs a root directory"),
            ),
            DriveDetails::ObjectStore { bucket, .. } if bucket.trim().is_empty() => {
                Err(AppError::configuration("An object-store drive needs a bucket"))
            }
            DriveDetails::EnterpriseShare { base_url, .. } if base_url.trim().is_empty() => Err(
                AppError::configuration("An enterprise-share drive needs a base URL"),
            ),
            DriveDetails::CloudDrive { drive_id, .. } if drive_id.trim().is_empty() => Err(
                AppError::configuration("A cloud drive needs a drive id"),
            ),
            _ => Ok(()),
        }
    }

    /// Materialize the row as it will be stored.
    pub fn into_drive(self, id: Uuid) -> StorageDrive {
        StorageDrive {
            id,
            display_name: self.display_name,
            drive_type: self.details.drive_type(),
            root_path: self.root_path,
            details: Json(self.details),
            options: Json(self.options),
            active: true,
            created_at: Utc::now(),
        }
    }
}

fn default_graph_url() -> String {
    "https://graph.microsoft.com/v1.0".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_details_tagged_by_type() {
        let details: DriveDetails = serde_json::from_value(serde_json::json!({
            "type": "cloud_drive",
            "drive_id": "b!abc",
            "access_token": "token"
        }))
        .unwrap();
        assert_eq!(details.drive_type(), DriveType::CloudDrive);
        match details {
            DriveDetails::CloudDrive { graph_url, .. } => {
                assert_eq!(graph_url, "https://graph.microsoft.com/v1.0")
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[test]
    fn test_options_fall_back_to_defaults() {
        let drive = NewStorageDrive {
            display_name: "Research share".into(),
            root_path: "/tmp/research".into(),
            details: DriveDetails::Local,
            options: DriveOptions::default(),
        }
        .into_drive(Uuid::new_v4());

        assert_eq!(drive.drive_type, DriveType::Local);
        assert_eq!(
            drive.duplicate_policy(DuplicatePolicy::Fail),
            DuplicatePolicy::Fail
        );
        assert_eq!(
            drive.name_style(FolderNameStyle::Spaced),
            FolderNameStyle::Spaced
        );
        assert!(drive.options.write_enabled);
    }

    #[test]
    fn test_validate_rejects_missing_bucket() {
        let drive = NewStorageDrive {
            display_name: "Bucket".into(),
            root_path: String::new(),
            details: DriveDetails::ObjectStore {
                bucket: " ".into(),
                region: "us-east-1".into(),
                endpoint: None,
                access_key: None,
                secret_key: None,
            },
            options: DriveOptions::default(),
        };
        assert!(drive.validate().is_err());
    }
}
