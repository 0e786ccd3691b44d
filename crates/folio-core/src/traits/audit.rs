//! Audit sink for storage operations.

use async_trait::async_trait;

use crate::events::StorageAuditEvent;

/// Receiver of storage audit notifications.
///
/// The activity log behind a sink is a pure consumer: notifying must never
/// fail the storage operation that produced the event.
#[async_trait]
pub trait AuditSink: Send + Sync + std::fmt::Debug + 'static {
    /// Deliver one event.
    async fn notify(&self, event: StorageAuditEvent);
}
