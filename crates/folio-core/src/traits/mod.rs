//! Core traits defined in `folio-core` and implemented by other crates.

pub mod audit;
pub mod storage;

pub use audit::AuditSink;
pub use storage::{ByteStream, FolderRef, StorageClient, VirtualFile, VirtualFolder};
