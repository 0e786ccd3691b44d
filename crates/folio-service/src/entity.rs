//! Entity directory port.
//!
//! Programs, studies and assays are persisted elsewhere. The storage layer
//! only reads their id, name, code and parent through this port.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use folio_core::error::AppError;
use folio_core::result::AppResult;
use folio_entity::{EntityKind, EntityRecord};

/// Notification that an entity has been persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityCreated {
    /// Entity identifier.
    pub id: Uuid,
    /// Hierarchy level.
    pub kind: EntityKind,
    /// Display name.
    pub name: String,
    /// Business code.
    #[serde(default)]
    pub code: Option<String>,
    /// Parent entity.
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    /// Registry root folder chosen by the user instead of the parent's folder.
    #[serde(default)]
    pub root_folder_id: Option<Uuid>,
}

impl EntityCreated {
    /// The entity as the storage layer sees it.
    pub fn record(&self) -> EntityRecord {
        EntityRecord {
            id: self.id,
            kind: self.kind,
            name: self.name.clone(),
            code: self.code.clone(),
            parent_id: self.parent_id,
        }
    }
}

/// Read access to business entities.
#[async_trait]
pub trait EntityDirectory: Send + Sync + std::fmt::Debug + 'static {
    /// Look an entity up. Fails with `NotFound` for unknown ids.
    async fn get(&self, id: Uuid) -> AppResult<EntityRecord>;

    /// The chain from the top-level program down to `entity` inclusive.
    ///
    /// Fails with `Validation` if the chain breaks the program, study,
    /// assay hierarchy.
    async fn lineage(&self, entity: &EntityRecord) -> AppResult<Vec<EntityRecord>> {
        let mut chain = Vec::new();
        let mut current = entity.clone();
        loop {
            match (current.kind.parent_kind(), current.parent_id) {
                (None, None) => {
                    chain.push(current);
                    break;
                }
                (None, Some(_)) => {
                    return Err(AppError::validation(format!(
                        "Program {} cannot have a parent",
                        current.id
                    )));
                }
                (Some(_), None) => {
                    return Err(AppError::validation(format!(
                        "{} {} has no parent",
                        current.kind, current.id
                    )));
                }
                (Some(expected), Some(parent_id)) => {
                    let parent = self.get(parent_id).await?;
                    if parent.kind != expected {
                        return Err(AppError::validation(format!(
                            "{} {} must belong to a {expected}, found {} {}",
                            current.kind, current.id, parent.kind, parent.id
                        )));
                    }
                    chain.push(current);
                    current = parent;
                }
            }
        }
        chain.reverse();
        Ok(chain)
    }
}

/// Directory backed by a map, for tests and the CLI's entity files.
#[derive(Debug, Clone, Default)]
pub struct MemoryEntityDirectory {
    entities: Arc<RwLock<HashMap<Uuid, EntityRecord>>>,
}

impl MemoryEntityDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from a JSON array of entity records.
    pub fn from_json(raw: &str) -> AppResult<Self> {
        let records: Vec<EntityRecord> = serde_json::from_str(raw)?;
        let entities = records.into_iter().map(|r| (r.id, r)).collect();
        Ok(Self {
            entities: Arc::new(RwLock::new(entities)),
        })
    }

    /// Add or replace an entity.
    pub async fn insert(&self, record: EntityRecord) {
        self.entities.write().await.insert(record.id, record);
    }

    /// Number of known entities.
    pub async fn len(&self) -> usize {
        self.entities.read().await.len()
    }

    /// Whether the directory is empty.
    pub async fn is_empty(&self) -> bool {
        self.entities.read().await.is_empty()
    }
}

#[async_trait]
impl EntityDirectory for MemoryEntityDirectory {
    async fn get(&self, id: Uuid) -> AppResult<EntityRecord> {
        self.entities
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Entity {id} not found")))
    }
}
