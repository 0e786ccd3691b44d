//! # folio-database
//!
//! The folder registry: the durable mapping from business entities to the
//! folders provisioned for them. Ships a PostgreSQL implementation (sqlx)
//! and an in-memory one, plus pool management and migrations.

pub mod connection;
pub mod migration;
pub mod registry;

pub use connection::DatabasePool;
pub use registry::{FolderRegistry, MemoryFolderRegistry, PgFolderRegistry, build_registry};
