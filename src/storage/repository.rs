use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseConfig;
use crate::models::User;

use super::error::StorageError;

pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn from_config(config: &DatabaseConfig) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn list_users(&self, start: i64, count: i64) -> Result<Vec<User>, StorageError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, age
            FROM users
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(count)
        .bind(start)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    pub async fn fetch_user(&self, id: i32) -> Result<User, StorageError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, age
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or_else(|| StorageError::NotFound(format!("User not found: {}", id)))
    }

    pub async fn create_user(&self, name: &str, age: i32) -> Result<User, StorageError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, age)
            VALUES ($1, $2)
            RETURNING id, name, age
            "#,
        )
        .bind(name)
        .bind(age)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    // Updating or deleting an id that is not present reports success, the
    // contract this service's clients were built against.
    pub async fn update_user(&self, id: i32, name: &str, age: i32) -> Result<User, StorageError> {
        sqlx::query(
            r#"
            UPDATE users
            SET name = $1, age = $2
            WHERE id = $3
            "#,
        )
        .bind(name)
        .bind(age)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(User { id, name: name.to_string(), age })
    }

    pub async fn delete_user(&self, id: i32) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
