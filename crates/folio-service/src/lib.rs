//! # folio-service
//!
//! The storage workflows of Folio. The [`StorageOrchestrator`] sequences
//! naming, path resolution, backend calls and registry writes for the
//! program, study and assay folders; the [`PathResolver`] and
//! [`DuplicateResolutionPolicy`] are the decisions it delegates.
//!
//! Collaborators are injected at construction time as `Arc` trait
//! objects: the entity directory, the folder registry and the audit sink.

pub mod audit;
pub mod duplicate;
pub mod entity;
pub mod orchestrator;
pub mod resolver;

pub use audit::{ChannelAuditSink, TracingAuditSink};
pub use duplicate::DuplicateResolutionPolicy;
pub use entity::{EntityCreated, EntityDirectory, MemoryEntityDirectory};
pub use orchestrator::{
    EntityFolder, FetchedFile, ProvisionOutcome, RootFlags, StorageOrchestrator,
};
pub use resolver::{PathResolver, PlannedFolder, ResolvedPlan};
