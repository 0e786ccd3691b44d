//! Audit events emitted by storage operations.
//!
//! Events are handed to an [`AuditSink`](crate::traits::AuditSink) after an
//! operation completes; the activity log consuming them is outside this
//! system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::traits::storage::{VirtualFile, VirtualFolder};

/// The operation that produced an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageOperation {
    /// A folder was created (or an existing one reused) for an entity.
    FolderCreated,
    /// An entity's primary folder was looked up.
    FolderFetched,
    /// A file was uploaded into an entity's folder.
    FileUploaded,
    /// A file was downloaded from an entity's folder.
    FileFetched,
    /// A missing folder was re-created or confirmed.
    FolderRepaired,
    /// An entity folder was renamed.
    FolderRenamed,
    /// An entity folder was moved.
    FolderMoved,
}

/// What an audit event points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceDescriptor {
    /// A folder.
    Folder {
        /// Drive holding the folder.
        drive_id: Uuid,
        /// Uniform path.
        path: String,
        /// Backend identifier.
        folder_id: String,
    },
    /// A file.
    File {
        /// Drive holding the file.
        drive_id: Uuid,
        /// Uniform path.
        path: String,
        /// Backend identifier.
        file_id: String,
        /// Size in bytes.
        size: u64,
    },
}

impl ResourceDescriptor {
    /// Describe a folder on a drive.
    pub fn folder(drive_id: Uuid, folder: &VirtualFolder) -> Self {
        Self::Folder {
            drive_id,
            path: folder.path.clone(),
            folder_id: folder.folder_id.clone(),
        }
    }

    /// Describe a file on a drive.
    pub fn file(drive_id: Uuid, file: &VirtualFile) -> Self {
        Self::File {
            drive_id,
            path: file.path.clone(),
            file_id: file.file_id.clone(),
            size: file.size,
        }
    }
}

/// One audit notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageAuditEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The entity the operation was performed for.
    pub entity_id: Uuid,
    /// What happened.
    pub operation: StorageOperation,
    /// The resulting folder or file.
    pub resource: ResourceDescriptor,
}

impl StorageAuditEvent {
    /// Create a new audit event.
    pub fn new(entity_id: Uuid, operation: StorageOperation, resource: ResourceDescriptor) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            entity_id,
            operation,
            resource,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tagged_resource() {
        let folder = VirtualFolder::new("/CPA", "/CPA");
        let event = StorageAuditEvent::new(
            Uuid::nil(),
            StorageOperation::FolderCreated,
            ResourceDescriptor::folder(Uuid::nil(), &folder),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["operation"], "folder_created");
        assert_eq!(json["resource"]["type"], "folder");
        assert_eq!(json["resource"]["path"], "/CPA");
    }
}
