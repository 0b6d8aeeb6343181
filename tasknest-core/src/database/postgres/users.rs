use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::ports::UserRepository;
use crate::database::store_error;
use crate::domain::{normalize_email, User};
use crate::error::{CoreError, Result};
use crate::query::Page;

const USER_COLUMNS: &str = "id, full_name, email, telephone, created_at";

#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, full_name, email, telephone, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.telephone)
        .bind(user.created_at)
        .execute(self.pool())
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                CoreError::Validation(format!("email {} is already registered", user.email))
            }
            _ => store_error("Failed to insert user", e),
        })?;

        Ok(user.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| store_error("Failed to load user", e))?;

        Ok(row.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(normalize_email(email))
        .fetch_optional(self.pool())
        .await
        .map_err(|e| store_error("Failed to load user by email", e))?;

        Ok(row.map(User::from))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(ids.to_vec())
        .fetch_all(self.pool())
        .await
        .map_err(|e| store_error("Failed to load users", e))?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn upsert_by_email(
        &self,
        full_name: &str,
        email: &str,
        telephone: &str,
    ) -> Result<User> {
        // Single conditional statement keyed by the normalized email; an
        // existing row keeps its id and created_at.
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, full_name, email, telephone, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE SET
                full_name = EXCLUDED.full_name,
                telephone = EXCLUDED.telephone
            RETURNING id, full_name, email, telephone, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(full_name)
        .bind(normalize_email(email))
        .bind(telephone)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await
        .map_err(|e| store_error("Failed to upsert user", e))?;

        Ok(User::from(row))
    }

    async fn search(&self, query: Option<&str>, page: &Page) -> Result<(Vec<User>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE 1=1");
        push_search(&mut count, query);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(|e| store_error("Failed to count users", e))?;

        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {USER_COLUMNS} FROM users WHERE 1=1"
        ));
        push_search(&mut builder, query);
        builder.push(" ORDER BY created_at ASC, id ASC LIMIT ");
        builder.push_bind(page.size);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset());

        let rows = builder
            .build_query_as::<UserRow>()
            .fetch_all(self.pool())
            .await
            .map_err(|e| store_error("Failed to search users", e))?;

        Ok((rows.into_iter().map(User::from).collect(), total))
    }
}

fn push_search(builder: &mut QueryBuilder<'_, Postgres>, query: Option<&str>) {
    if let Some(needle) = query {
        let pattern = format!("%{needle}%");
        builder.push(" AND (full_name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR email ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    full_name: String,
    email: String,
    telephone: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            full_name: row.full_name,
            email: row.email,
            telephone: row.telephone,
            created_at: row.created_at,
        }
    }
}
