//! RabbitMQ plumbing: connection bring-up, durable topology, publisher, and
//! the reminder consumer.
//!
//! The topology survives broker restarts (durable exchange/queues, persistent
//! messages) and failed deliveries land in a dead-letter queue instead of
//! being redelivered.

mod consumer;
mod publisher;

pub use consumer::{decode_due_event, DueConsumer};
pub use publisher::{DuePublisher, LapinDuePublisher};

use std::time::Duration;

use lapin::{
    options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions},
    types::{AMQPValue, FieldTable},
    Channel, Connection, ConnectionProperties, ExchangeKind,
};
use tracing::{info, warn};

use crate::config::BrokerConfig;
use crate::error::{CoreError, Result};

/// Durable topic exchange all task events flow through.
pub const TASK_EVENTS_EXCHANGE: &str = "tasks.events";
/// Routing key for "task due" notifications.
pub const TASK_DUE_ROUTING_KEY: &str = "task.due";
/// Durable queue the reminder consumer reads.
pub const TASK_DUE_QUEUE: &str = "tasks.reminders.due";
/// Durable dead-letter queue for poison messages.
pub const TASK_DUE_DLQ: &str = "tasks.reminders.dlq";

const CONNECT_ATTEMPTS: u32 = 5;
const CONNECT_INITIAL_BACKOFF: Duration = Duration::from_secs(2);

pub(crate) fn broker_error(context: &str, e: lapin::Error) -> CoreError {
    CoreError::Internal(format!("{context}: {e}"))
}

/// Connects to the broker with exponential backoff: 2 s initial delay,
/// doubling, capped at five attempts. Callers treat total failure as fatal.
pub async fn connect_with_backoff(config: &BrokerConfig) -> Result<Connection> {
    let uri = config.amqp_uri();
    let mut delay = CONNECT_INITIAL_BACKOFF;

    for attempt in 1..=CONNECT_ATTEMPTS {
        match Connection::connect(&uri, ConnectionProperties::default()).await {
            Ok(connection) => {
                info!(host = %config.host, attempt, "connected to broker");
                return Ok(connection);
            }
            Err(e) if attempt < CONNECT_ATTEMPTS => {
                warn!(
                    host = %config.host,
                    attempt,
                    retry_in_secs = delay.as_secs(),
                    error = %e,
                    "broker connection failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => {
                return Err(broker_error(
                    "Broker unreachable after maximum connection attempts",
                    e,
                ));
            }
        }
    }
    unreachable!("connection loop returns on every path")
}

/// Declares the full topology. Declarations are idempotent, so every process
/// runs this on startup regardless of which process got there first.
pub async fn declare_topology(channel: &Channel) -> Result<()> {
    channel
        .exchange_declare(
            TASK_EVENTS_EXCHANGE,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| broker_error("Failed to declare exchange", e))?;

    // Nacked deliveries route through the default exchange straight into
    // the DLQ.
    let mut due_args = FieldTable::default();
    due_args.insert(
        "x-dead-letter-exchange".into(),
        AMQPValue::LongString("".into()),
    );
    due_args.insert(
        "x-dead-letter-routing-key".into(),
        AMQPValue::LongString(TASK_DUE_DLQ.into()),
    );

    channel
        .queue_declare(
            TASK_DUE_QUEUE,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            due_args,
        )
        .await
        .map_err(|e| broker_error("Failed to declare due queue", e))?;

    channel
        .queue_declare(
            TASK_DUE_DLQ,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| broker_error("Failed to declare dead-letter queue", e))?;

    channel
        .queue_bind(
            TASK_DUE_QUEUE,
            TASK_EVENTS_EXCHANGE,
            TASK_DUE_ROUTING_KEY,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(|e| broker_error("Failed to bind due queue", e))?;

    Ok(())
}
