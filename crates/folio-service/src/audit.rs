//! Audit sinks.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};

use folio_core::events::{ResourceDescriptor, StorageAuditEvent};
use folio_core::traits::AuditSink;

/// Writes every event as a structured log line.
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn notify(&self, event: StorageAuditEvent) {
        let (drive_id, path) = match &event.resource {
            ResourceDescriptor::Folder { drive_id, path, .. }
            | ResourceDescriptor::File { drive_id, path, .. } => (drive_id, path),
        };
        info!(
            target: "folio::audit",
            event_id = %event.id,
            entity_id = %event.entity_id,
            operation = ?event.operation,
            drive_id = %drive_id,
            path = %path,
            "Storage operation"
        );
    }
}

/// Forwards events to an unbounded Tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelAuditSink {
    sender: mpsc::UnboundedSender<StorageAuditEvent>,
}

impl ChannelAuditSink {
    /// Create a sink and the receiver its events arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StorageAuditEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl AuditSink for ChannelAuditSink {
    async fn notify(&self, event: StorageAuditEvent) {
        if self.sender.send(event).is_err() {
            debug!("Audit receiver dropped, event discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::events::StorageOperation;
    use folio_core::traits::storage::VirtualFolder;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_channel_sink_delivers_and_survives_closed_receiver() {
        let (sink, mut rx) = ChannelAuditSink::new();
        let folder = VirtualFolder::new("/CPA", "/CPA");
        let event = StorageAuditEvent::new(
            Uuid::new_v4(),
            StorageOperation::FolderFetched,
            ResourceDescriptor::folder(Uuid::new_v4(), &folder),
        );

        sink.notify(event.clone()).await;
        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, event.id);

        drop(rx);
        sink.notify(event).await;
    }
}
