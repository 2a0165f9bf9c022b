//! ABOUTME: User repository with profile CRUD operations
//! ABOUTME: Username and email are unique keys; duplicates surface as conflicts

use crate::bootstrap::{count_rows, Bootstrap};
use crate::{db_error, is_unique_violation, Db};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{AnyConnection, FromRow};
use tl_core::{time::now_iso8601, Error, Id, Result};
use tracing::{debug, instrument};
use utoipa::ToSchema;

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Request to create a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub full_name: String,
}

/// Request to update a user; at least one field must be present
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
}

const COLUMNS: &str = "id, username, email, full_name, created_at, updated_at";

/// (username, email, full_name)
const FIXTURES: [(&str, &str, &str); 5] = [
    ("john_doe", "john@example.com", "John Doe"),
    ("jane_smith", "jane@example.com", "Jane Smith"),
    ("bob_wilson", "bob@example.com", "Bob Wilson"),
    ("alice_brown", "alice@example.com", "Alice Brown"),
    ("charlie_davis", "charlie@example.com", "Charlie Davis"),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct UserBootstrap;

#[async_trait]
impl Bootstrap for UserBootstrap {
    fn name(&self) -> &'static str {
        "users"
    }

    fn schema(&self) -> &'static [&'static str] {
        &[r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                full_name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#]
    }

    async fn is_empty(&self, conn: &mut AnyConnection) -> Result<bool> {
        Ok(count_rows(conn, "users").await? == 0)
    }

    async fn seed(&self, conn: &mut AnyConnection) -> Result<u64> {
        let now = now_iso8601();
        let mut inserted = 0;

        // keyed by username: a replica that lost the race inserts nothing
        for (username, email, full_name) in FIXTURES {
            let result = sqlx::query(
                r#"
                INSERT INTO users (id, username, email, full_name, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(Id::new().to_string())
            .bind(username)
            .bind(email)
            .bind(full_name)
            .bind(&now)
            .bind(&now)
            .execute(&mut *conn)
            .await;

            match result {
                Ok(done) => inserted += done.rows_affected(),
                Err(e) if is_unique_violation(&e) => {}
                Err(e) => return Err(db_error("Failed to seed users", e)),
            }
        }

        Ok(inserted)
    }
}

/// User repository
pub struct UserRepository<'a> {
    db: &'a Db,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<User>> {
        let mut conn = self.db.acquire().await?;

        let sql = format!("SELECT {} FROM users ORDER BY created_at, username", COLUMNS);
        sqlx::query_as::<_, User>(&sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| db_error("Failed to fetch users", e))
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let mut conn = self.db.acquire().await?;

        let sql = format!("SELECT {} FROM users WHERE id = $1", COLUMNS);
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| db_error("Failed to fetch user", e))
    }

    /// Create a new user
    #[instrument(skip(self, request))]
    pub async fn create(&self, request: CreateUserRequest) -> Result<User> {
        let mut conn = self.db.acquire().await?;

        // name the clashing key; the insert below still guards against races
        let clash = sqlx::query_scalar::<_, String>(
            "SELECT username FROM users WHERE username = $1 OR email = $2",
        )
        .bind(&request.username)
        .bind(&request.email)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| db_error("Failed to check user uniqueness", e))?;

        if let Some(existing) = clash {
            return Err(if existing == request.username {
                Error::Conflict("Username already exists".to_string())
            } else {
                Error::Conflict("Email already exists".to_string())
            });
        }

        let id = Id::new().to_string();
        let now = now_iso8601();
        debug!("Creating user with id: {}", id);

        let sql = format!(
            "INSERT INTO users (id, username, email, full_name, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(request.username)
            .bind(request.email)
            .bind(request.full_name)
            .bind(&now)
            .bind(&now)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::Conflict("User creation failed".to_string())
                } else {
                    db_error("Failed to create user", e)
                }
            })
    }

    /// Update email and/or full name
    #[instrument(skip(self, request))]
    pub async fn update(&self, id: &str, request: UpdateUserRequest) -> Result<User> {
        if request.email.is_none() && request.full_name.is_none() {
            return Err(Error::Validation("No fields to update".to_string()));
        }

        let mut conn = self.db.acquire().await?;

        let sql = format!(
            "UPDATE users SET email = COALESCE($1, email), full_name = COALESCE($2, full_name), \
             updated_at = $3 WHERE id = $4 RETURNING {}",
            COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(request.email)
            .bind(request.full_name)
            .bind(now_iso8601())
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::Conflict("Email already exists".to_string())
                } else {
                    db_error("Failed to update user", e)
                }
            })?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))
    }

    /// Delete a user; absent ids are reported as not found
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut conn = self.db.acquire().await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(|e| db_error("Failed to delete user", e))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("User not found".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PoolSettings, ResourceInitializer};
    use std::time::Duration;
    use tl_core::RetryPolicy;

    async fn seeded_db() -> Db {
        let db = Db::connect_lazy(&PoolSettings::new(test_support::sqlite_test_url("users")))
            .unwrap();
        ResourceInitializer::new(
            &db,
            &UserBootstrap,
            RetryPolicy::fixed(1, Duration::from_millis(1)),
        )
        .initialize()
        .await
        .unwrap();
        db
    }

    fn new_user(username: &str, email: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            email: email.to_string(),
            full_name: "Test User".to_string(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_keys_are_conflicts() {
        let db = seeded_db().await;
        let repo = UserRepository::new(&db);

        let err = repo
            .create(new_user("john_doe", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(ref m) if m == "Username already exists"));

        let err = repo
            .create(new_user("someone", "jane@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(ref m) if m == "Email already exists"));

        assert_eq!(repo.list().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_update_and_delete_lifecycle() {
        let db = seeded_db().await;
        let repo = UserRepository::new(&db);

        let user = repo
            .create(new_user("dana", "dana@example.com"))
            .await
            .unwrap();

        let updated = repo
            .update(
                &user.id,
                UpdateUserRequest {
                    full_name: Some("Dana Scully".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.full_name, "Dana Scully");
        assert_eq!(updated.email, "dana@example.com");

        let err = repo
            .update(&user.id, UpdateUserRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        repo.delete(&user.id).await.unwrap();
        assert!(matches!(
            repo.delete(&user.id).await.unwrap_err(),
            Error::NotFound(_)
        ));
        assert!(repo.find_by_id(&user.id).await.unwrap().is_none());
    }
}
