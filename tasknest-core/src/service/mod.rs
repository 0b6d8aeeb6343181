//! Domain services layered over the repository ports.

mod tasks;
mod users;

pub use tasks::{
    CreateTaskInput, TaskDetails, TaskService, UpdateTaskInput, UserUpsertInput,
};
pub use users::{CreateUserInput, UserService};
