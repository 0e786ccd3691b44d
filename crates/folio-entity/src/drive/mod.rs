//! Storage drive entities.

pub mod kind;
pub mod model;

pub use kind::DriveType;
pub use model::{ConflictBehavior, DriveDetails, DriveOptions, NewStorageDrive, StorageDrive};
