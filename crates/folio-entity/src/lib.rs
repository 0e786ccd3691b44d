//! # folio-entity
//!
//! Domain models for Folio. Registry rows (`StorageDrive`,
//! `StorageDriveFolder`, `FolderRepair`) derive `sqlx::FromRow`; the
//! business-entity view (`EntityRecord`) is what the storage layer reads
//! from the entity collaborators and never persists itself.

pub mod drive;
pub mod entity;
pub mod folder;

pub use drive::{
    ConflictBehavior, DriveDetails, DriveOptions, DriveType, NewStorageDrive, StorageDrive,
};
pub use entity::{EntityKind, EntityRecord};
pub use folder::{FolderLocation, FolderOwner, FolderRepair, NewDriveFolder, StorageDriveFolder};
