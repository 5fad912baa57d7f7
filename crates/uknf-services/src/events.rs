//! Domain event sink.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use uknf_core::ReportEvent;

/// Receives report events. Delivery is best effort: a failing publisher
/// never rolls back the operation that produced the event.
#[async_trait]
pub trait ReportEventPublisher: Send + Sync {
    async fn publish(&self, event: ReportEvent) -> anyhow::Result<()>;
}

/// Writes events to the log.
#[derive(Debug, Clone, Default)]
pub struct TracingEventPublisher;

#[async_trait]
impl ReportEventPublisher for TracingEventPublisher {
    async fn publish(&self, event: ReportEvent) -> anyhow::Result<()> {
        let payload = serde_json::to_string(&event)?;
        tracing::info!(
            event_type = event.event_type(),
            report_id = %event.report_id(),
            entity_id = event.entity_id(),
            payload = %payload,
            "Report event"
        );
        Ok(())
    }
}

/// Forwards events to an in-process consumer.
#[derive(Debug, Clone)]
pub struct ChannelEventPublisher {
    sender: mpsc::Sender<ReportEvent>,
}

impl ChannelEventPublisher {
    pub fn new(sender: mpsc::Sender<ReportEvent>) -> Self {
        Self { sender }
    }

    /// Creates a publisher together with the receiving end.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ReportEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self::new(sender), receiver)
    }
}

#[async_trait]
impl ReportEventPublisher for ChannelEventPublisher {
    async fn publish(&self, event: ReportEvent) -> anyhow::Result<()> {
        self.sender
            .send(event)
            .await
            .map_err(|_| anyhow::anyhow!("report event receiver dropped"))
    }
}

/// Publishes on a spawned task; failures are logged at warn.
pub fn publish_in_background(publisher: Arc<dyn ReportEventPublisher>, event: ReportEvent) {
    tokio::spawn(async move {
        let event_type = event.event_type();
        let report_id = event.report_id();
        if let Err(e) = publisher.publish(event).await {
            tracing::warn!(
                error = %e,
                event_type = event_type,
                report_id = %report_id,
                "Failed to publish report event"
            );
        }
    });
}
