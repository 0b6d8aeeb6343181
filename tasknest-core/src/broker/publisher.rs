use async_trait::async_trait;
use lapin::{options::BasicPublishOptions, BasicProperties, Channel, Connection};
use tokio::sync::Mutex;
use tracing::debug;

use super::{broker_error, TASK_DUE_ROUTING_KEY, TASK_EVENTS_EXCHANGE};
use crate::error::Result;
use crate::events::TaskDueV1;

/// Outbound port for due notifications. The scanner publishes through this
/// so tests can swap in a recorder.
#[async_trait]
pub trait DuePublisher: Send + Sync {
    async fn publish_due(&self, event: &TaskDueV1) -> Result<()>;
}

/// Publishes persistent `TaskDueV1` messages on a dedicated channel.
pub struct LapinDuePublisher {
    // AMQP channels are not safe for concurrent frame writes; publishes
    // serialize on this mutex.
    channel: Mutex<Channel>,
}

impl LapinDuePublisher {
    pub async fn new(connection: &Connection) -> Result<Self> {
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| broker_error("Failed to open publish channel", e))?;
        Ok(Self {
            channel: Mutex::new(channel),
        })
    }
}

#[async_trait]
impl DuePublisher for LapinDuePublisher {
    async fn publish_due(&self, event: &TaskDueV1) -> Result<()> {
        let payload = serde_json::to_vec(event)?;
        let properties = BasicProperties::default()
            .with_delivery_mode(2) // persistent
            .with_content_type("application/json".into())
            .with_message_id(event.task_id.to_string().into());

        let channel = self.channel.lock().await;
        channel
            .basic_publish(
                TASK_EVENTS_EXCHANGE,
                TASK_DUE_ROUTING_KEY,
                BasicPublishOptions::default(),
                &payload,
                properties,
            )
            .await
            .map_err(|e| broker_error("Failed to publish due notification", e))?
            .await
            .map_err(|e| broker_error("Due notification publish unconfirmed", e))?;

        debug!(task_id = %event.task_id, "published task.due");
        Ok(())
    }
}
