//! Worker process: periodic due-task scanning plus the reminder consumer.
//!
//! Shares the store and broker with the API but runs independently; any
//! number of worker instances stay correct because the scan claim is a
//! single atomic statement.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tasknest_core::broker::{
    connect_with_backoff, declare_topology, DueConsumer, LapinDuePublisher,
};
use tasknest_core::config::{BrokerConfig, DatabaseConfig, DueScanConfig};
use tasknest_core::database::{connect_pool, postgres::PostgresTaskRepository};
use tasknest_core::scanner::DueScanWorker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Missing store DSN is fatal at start; everything else has defaults.
    let database = DatabaseConfig::from_env().context("store connection string is required")?;
    let broker_config = BrokerConfig::from_env();
    let scan_config = DueScanConfig::from_env();

    let pool = connect_pool(&database.url)
        .await
        .context("failed to connect to database")?;
    let repository = Arc::new(PostgresTaskRepository::new(pool));

    // Startup bring-up: capped backoff, then exit non-zero on total failure.
    let connection = connect_with_backoff(&broker_config)
        .await
        .context("broker bring-up failed")?;
    let channel = connection
        .create_channel()
        .await
        .context("failed to open topology channel")?;
    declare_topology(&channel)
        .await
        .context("failed to declare broker topology")?;

    let publisher = Arc::new(
        LapinDuePublisher::new(&connection)
            .await
            .context("failed to create publisher")?,
    );

    let cancel = CancellationToken::new();

    let consumer_cancel = cancel.clone();
    let consumer_handle = tokio::spawn(async move {
        // Post-startup disconnections: re-connect, re-declare, resume.
        // Unacked inflight messages are redelivered after reconnection.
        let mut connection = connection;
        loop {
            let consumer = match DueConsumer::new(&connection).await {
                Ok(consumer) => consumer,
                Err(e) => {
                    error!(error = %e, "failed to start consumer");
                    return;
                }
            };
            match consumer.run(consumer_cancel.clone()).await {
                Ok(()) if consumer_cancel.is_cancelled() => return,
                Ok(()) => warn!("consumer stream ended, reconnecting"),
                Err(e) => warn!(error = %e, "consumer failed, reconnecting"),
            }

            connection = match connect_with_backoff(&BrokerConfig::from_env()).await {
                Ok(connection) => connection,
                Err(e) => {
                    error!(error = %e, "broker reconnection failed, consumer stopping");
                    return;
                }
            };
            if let Ok(channel) = connection.create_channel().await {
                if let Err(e) = declare_topology(&channel).await {
                    warn!(error = %e, "topology re-declaration failed");
                }
            }
        }
    });

    let scanner = DueScanWorker::new(repository, publisher, scan_config);
    let scan_cancel = cancel.clone();
    let scanner_handle = tokio::spawn(async move {
        scanner.run(scan_cancel).await;
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to install shutdown handler")?;
    info!("shutdown requested");
    cancel.cancel();

    let _ = scanner_handle.await;
    let _ = consumer_handle.await;
    info!("worker stopped");
    Ok(())
}
