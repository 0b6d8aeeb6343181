use thiserror::Error;

/// Error taxonomy shared by the repositories, services, broker, and scanner.
///
/// Domain failures (`NotFound`, `InvalidOperation`, `ConcurrencyConflict`)
/// surface typed at the API boundary; everything else is infrastructure and
/// is never exposed in detail to clients.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// The backing table does not exist yet. The scanner tolerates this
    /// during the cold-start race with schema creation.
    #[error("store not ready: {0}")]
    StoreNotReady(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
