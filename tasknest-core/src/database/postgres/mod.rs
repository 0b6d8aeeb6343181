//! `PostgreSQL` repository implementations.

mod tasks;
mod users;

pub use tasks::PostgresTaskRepository;
pub use users::PostgresUserRepository;
