//! Abstract repository interfaces fronting the store.

mod tasks;
mod users;

pub use tasks::{ClaimedTask, TaskRepository};
pub use users::UserRepository;
