use std::sync::Arc;

use uuid::Uuid;

use crate::database::ports::UserRepository;
use crate::domain::User;
use crate::error::{CoreError, Result};
use crate::query::{Page, Paged};

#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub full_name: String,
    pub email: String,
    pub telephone: String,
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn create_user(&self, input: CreateUserInput) -> Result<User> {
        let user = User::new(input.full_name, &input.email, input.telephone);
        self.users.create(&user).await
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("user {id}")))
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<User> {
        self.users
            .find_by_email(email)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("user with email {email}")))
    }

    pub async fn list_users(&self, query: Option<&str>, page: &Page) -> Result<Paged<User>> {
        let (items, total) = self.users.search(query, page).await?;
        Ok(Paged::new(items, page, total))
    }
}
