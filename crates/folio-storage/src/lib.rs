//! # folio-storage
//!
//! Storage client implementations for Folio. Every backend (local
//! filesystem, S3-compatible object store, enterprise file share, cloud
//! drive) is exposed through the uniform
//! [`StorageClient`](folio_core::traits::StorageClient) contract. Also hosts
//! the folder naming policy and the [`DriveManager`] that maps registered
//! drives to live clients.

pub mod manager;
pub mod naming;
pub mod providers;

pub use manager::{DriveManager, ManagedDrive};
pub use naming::FolderNamingPolicy;
