use std::sync::Arc;

use tasknest_core::database::memory::{InMemoryTaskRepository, InMemoryUserRepository};
use tasknest_core::database::postgres::{PostgresTaskRepository, PostgresUserRepository};
use tasknest_core::service::{TaskService, UserService};

/// Shared handler state: the domain services over whichever store backs the
/// process.
#[derive(Clone)]
pub struct AppState {
    pub tasks: TaskService,
    pub users: UserService,
}

impl AppState {
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        let task_repo = Arc::new(PostgresTaskRepository::new(pool.clone()));
        let user_repo = Arc::new(PostgresUserRepository::new(pool));
        Self {
            tasks: TaskService::new(task_repo, user_repo.clone()),
            users: UserService::new(user_repo),
        }
    }

    /// Store-free state for tests; returns the repositories so tests can
    /// seed rows directly.
    pub fn in_memory() -> (Self, InMemoryTaskRepository, InMemoryUserRepository) {
        let task_repo = InMemoryTaskRepository::new();
        let user_repo = InMemoryUserRepository::new();
        let state = Self {
            tasks: TaskService::new(
                Arc::new(task_repo.clone()),
                Arc::new(user_repo.clone()),
            ),
            users: UserService::new(Arc::new(user_repo.clone())),
        };
        (state, task_repo, user_repo)
    }
}
