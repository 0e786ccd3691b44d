//! Business entities as seen by the storage layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Level of an entity in the program / study / assay hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "entity_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Organizational unit; top of the hierarchy.
    Program,
    /// Research study inside a program.
    Study,
    /// Sub-study inside a study.
    Assay,
}

impl EntityKind {
    /// The kind an entity of this kind must have as parent.
    pub fn parent_kind(&self) -> Option<EntityKind> {
        match self {
            Self::Program => None,
            Self::Study => Some(Self::Program),
            Self::Assay => Some(Self::Study),
        }
    }

    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Program => "program",
            Self::Study => "study",
            Self::Assay => "assay",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The attributes of a program, study or assay the storage layer consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Entity identifier.
    pub id: Uuid,
    /// Hierarchy level.
    pub kind: EntityKind,
    /// Display name.
    pub name: String,
    /// Generated business code (e.g. `CPA-10001`).
    #[serde(default)]
    pub code: Option<String>,
    /// Parent entity.
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

impl EntityRecord {
    /// Create a program record.
    pub fn program(id: Uuid, name: impl Into<String>, code: Option<String>) -> Self {
        Self {
            id,
            kind: EntityKind::Program,
            name: name.into(),
            code,
            parent_id: None,
        }
    }

    /// Create a study record.
    pub fn study(id: Uuid, name: impl Into<String>, code: impl Into<String>, program_id: Uuid) -> Self {
        Self {
            id,
            kind: EntityKind::Study,
            name: name.into(),
            code: Some(code.into()),
            parent_id: Some(program_id),
        }
    }

    /// Create an assay record.
    pub fn assay(id: Uuid, name: impl Into<String>, code: impl Into<String>, study_id: Uuid) -> Self {
        Self {
            id,
            kind: EntityKind::Assay,
            name: name.into(),
            code: Some(code.into()),
            parent_id: Some(study_id),
        }
    }
}
