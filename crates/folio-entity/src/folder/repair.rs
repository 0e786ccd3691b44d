//! Outstanding folder repairs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::model::FolderOwner;
use crate::entity::EntityKind;

/// An owner whose folder provisioning failed and still needs a repair.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FolderRepair {
    /// Kind of the owner.
    pub owner_kind: EntityKind,
    /// Owner identifier.
    pub owner_id: Uuid,
    /// Last failure message.
    pub reason: String,
    /// Number of failed attempts.
    pub attempts: i32,
    /// First failure.
    pub first_failed_at: DateTime<Utc>,
    /// Most recent failure.
    pub last_failed_at: DateTime<Utc>,
}

impl FolderRepair {
    /// First failure for an owner.
    pub fn new(owner: FolderOwner, reason: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            owner_kind: owner.kind,
            owner_id: owner.id,
            reason: reason.into(),
            attempts: 1,
            first_failed_at: now,
            last_failed_at: now,
        }
    }

    /// The owner needing repair.
    pub fn owner(&self) -> FolderOwner {
        FolderOwner::new(self.owner_kind, self.owner_id)
    }

    /// Record another failure.
    pub fn record_failure(&mut self, reason: impl Into<String>) {
        self.reason = reason.into();
        self.attempts += 1;
        self.last_failed_at = Utc::now();
    }
}
