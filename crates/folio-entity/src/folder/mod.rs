//! Registry folder entities.

pub mod model;
pub mod repair;

pub use model::{FolderLocation, FolderOwner, NewDriveFolder, StorageDriveFolder};
pub use repair::FolderRepair;
