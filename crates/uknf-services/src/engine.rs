//! Hand-off to the external validation engine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Everything the engine needs to validate one attempt. Outcomes come back
/// keyed by `unique_validation_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub unique_validation_id: String,
    pub report_id: Uuid,
    pub entity_id: i64,
    pub storage_key: String,
    pub report_type: String,
    pub reporting_period: String,
}

/// Opaque, possibly slow, possibly failing validation backend.
#[async_trait]
pub trait ValidationEngine: Send + Sync {
    async fn submit(&self, request: ValidationRequest) -> anyhow::Result<()>;
}

/// Queues requests for an in-process engine adapter.
#[derive(Debug, Clone)]
pub struct ChannelValidationEngine {
    sender: mpsc::Sender<ValidationRequest>,
}

impl ChannelValidationEngine {
    pub fn new(sender: mpsc::Sender<ValidationRequest>) -> Self {
        Self { sender }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ValidationRequest>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self::new(sender), receiver)
    }
}

#[async_trait]
impl ValidationEngine for ChannelValidationEngine {
    async fn submit(&self, request: ValidationRequest) -> anyhow::Result<()> {
        self.sender
            .send(request)
            .await
            .map_err(|_| anyhow::anyhow!("validation engine queue closed"))
    }
}
