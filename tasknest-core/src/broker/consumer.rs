use futures::StreamExt;
use lapin::{
    options::{BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions},
    types::FieldTable,
    Channel, Connection,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{broker_error, TASK_DUE_QUEUE};
use crate::error::Result;
use crate::events::TaskDueV1;

/// Deserializes a due-notification payload.
///
/// Split out of the consume loop so the poison-message decision is testable
/// without a broker.
pub fn decode_due_event(payload: &[u8]) -> Result<TaskDueV1> {
    Ok(serde_json::from_slice(payload)?)
}

/// Reminder consumer: prefetch 1, manual ack, nack-without-requeue to the
/// DLQ on any processing failure.
pub struct DueConsumer {
    channel: Channel,
}

impl DueConsumer {
    pub async fn new(connection: &Connection) -> Result<Self> {
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| broker_error("Failed to open consume channel", e))?;
        // One unacked message per consumer: flow control against a slow
        // log sink.
        channel
            .basic_qos(1, BasicQosOptions::default())
            .await
            .map_err(|e| broker_error("Failed to set prefetch", e))?;
        Ok(Self { channel })
    }

    /// Consumes until cancelled or the channel closes. Inflight deliveries
    /// left unacked at exit are redelivered after reconnection.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let mut consumer = self
            .channel
            .basic_consume(
                TASK_DUE_QUEUE,
                "tasknest-reminder",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| broker_error("Failed to start consumer", e))?;

        info!(queue = TASK_DUE_QUEUE, "reminder consumer started");

        loop {
            let delivery = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("reminder consumer stopping");
                    return Ok(());
                }
                next = consumer.next() => match next {
                    Some(Ok(delivery)) => delivery,
                    Some(Err(e)) => {
                        return Err(broker_error("Consumer stream failed", e));
                    }
                    None => {
                        warn!("consumer stream closed by broker");
                        return Ok(());
                    }
                },
            };

            let message_id = delivery
                .properties
                .message_id()
                .as_ref()
                .map(|id| id.as_str().to_owned())
                .unwrap_or_default();

            match decode_due_event(&delivery.data) {
                Ok(event) => {
                    // The consumer's only side-effect; idempotent under
                    // redelivery.
                    info!(
                        task_id = %event.task_id,
                        message_id = %message_id,
                        "Hi your Task is due {}",
                        event.title
                    );
                    if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                        warn!(error = %e, "failed to ack delivery");
                    }
                }
                Err(e) => {
                    // Never requeue: poison messages go to the DLQ once
                    // instead of storming the queue.
                    error!(message_id = %message_id, error = %e, "dropping undecodable delivery");
                    if let Err(e) = delivery
                        .nack(BasicNackOptions {
                            requeue: false,
                            ..Default::default()
                        })
                        .await
                    {
                        warn!(error = %e, "failed to nack delivery");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::decode_due_event;

    #[test]
    fn valid_payload_decodes() {
        let payload = br#"{
            "taskId": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
            "title": "file taxes",
            "dueDateUtc": "2030-01-01T00:00:00Z",
            "timestampUtc": "2030-01-01T00:01:00Z"
        }"#;
        let event = decode_due_event(payload).unwrap();
        assert_eq!(event.title, "file taxes");
    }

    #[test]
    fn poison_payload_is_rejected() {
        assert!(decode_due_event(b"not json at all").is_err());
        assert!(decode_due_event(br#"{"taskId": 42}"#).is_err());
    }
}
