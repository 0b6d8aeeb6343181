//! Persistence: repository ports plus Postgres and in-memory adapters.

pub mod memory;
pub mod ports;
pub mod postgres;
mod schema;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::error::{CoreError, Result};

/// Connects a pool against the configured store DSN.
pub async fn connect_pool(database_url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(16)
        .connect(database_url)
        .await
        .map_err(|e| CoreError::Internal(format!("Failed to connect to database: {e}")))
}

/// Creates the task/user tables and their indexes when absent.
///
/// Schema evolution proper is an external concern; this bootstrap only keeps
/// a fresh deployment runnable without tooling.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for statement in schema::STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| CoreError::Internal(format!("Schema bootstrap failed: {e}")))?;
    }
    Ok(())
}

/// Maps a sqlx error into the core taxonomy, keeping the undefined-table
/// code distinct so the scanner can tolerate the cold-start race.
pub(crate) fn store_error(context: &str, e: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("42P01") {
            return CoreError::StoreNotReady(format!("{context}: {e}"));
        }
    }
    CoreError::Internal(format!("{context}: {e}"))
}
