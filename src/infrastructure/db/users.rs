use crate::domain::error::{AppError, Result};
use crate::domain::user::User;
use sqlx::sqlite::SqlitePool;

/// Stored credentials for a user
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
    pub password_salt: String,
}

pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        password_salt: &str,
    ) -> Result<User> {
        let created_at = chrono::Utc::now().timestamp_millis();
        let result = sqlx::query_as::<_, UserEntity>(
            "INSERT INTO users (username, email, password_hash, password_salt, created_at)
             VALUES (?, ?, ?, ?, ?) RETURNING id, username, email",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(password_salt)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(entity) => Ok(entity.into()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                AppError::Conflict("A user with that username already exists.".to_string()),
            ),
            Err(e) => Err(AppError::DatabaseError(format!("Failed to insert user: {e}"))),
        }
    }

    pub async fn find_credentials(&self, username: &str) -> Result<Option<Credentials>> {
        let row = sqlx::query_as::<_, CredentialsEntity>(
            "SELECT id, username, email, password_hash, password_salt FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch user: {e}")))?;

        Ok(row.map(|r| Credentials {
            user: User {
                id: r.id,
                username: r.username,
                email: r.email,
            },
            password_hash: r.password_hash,
            password_salt: r.password_salt,
        }))
    }

    /// Existing token for the user, or `candidate` stored as the new one
    pub async fn get_or_create_token(&self, user_id: i64, candidate: &str) -> Result<String> {
        let created_at = chrono::Utc::now().timestamp_millis();
        sqlx::query(
            "INSERT INTO auth_tokens (token, user_id, created_at) VALUES (?, ?, ?)
             ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(candidate)
        .bind(user_id)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to store auth token: {e}")))?;

        sqlx::query_scalar::<_, String>("SELECT token FROM auth_tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to read auth token: {e}")))
    }

    pub async fn find_user_by_token(&self, token: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, UserEntity>(
            "SELECT u.id, u.username, u.email FROM users u
             JOIN auth_tokens t ON t.user_id = u.id WHERE t.token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to resolve auth token: {e}")))?;

        Ok(user.map(|u| u.into()))
    }

    pub async fn delete_token(&self, token: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete auth token: {e}")))?;

        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct UserEntity {
    id: i64,
    username: String,
    email: String,
}

impl From<UserEntity> for User {
    fn from(e: UserEntity) -> Self {
        Self {
            id: e.id,
            username: e.username,
            email: e.email,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialsEntity {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    password_salt: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::db::connection::connect_in_memory;

    async fn repo() -> UserRepository {
        UserRepository::new(connect_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_insert_and_find_credentials() {
        let repo = repo().await;
        let user = repo.insert_user("alice", "a@example.com", "hash", "salt").await.unwrap();
        assert_eq!(user.username, "alice");

        let creds = repo.find_credentials("alice").await.unwrap().unwrap();
        assert_eq!(creds.user, user);
        assert_eq!(creds.password_hash, "hash");
        assert!(repo.find_credentials("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let repo = repo().await;
        repo.insert_user("alice", "", "h", "s").await.unwrap();
        let err = repo.insert_user("alice", "", "h", "s").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_token_lifecycle() {
        let repo = repo().await;
        let user = repo.insert_user("alice", "", "h", "s").await.unwrap();

        let first = repo.get_or_create_token(user.id, "tok-1").await.unwrap();
        let second = repo.get_or_create_token(user.id, "tok-2").await.unwrap();
        assert_eq!(first, "tok-1");
        assert_eq!(second, "tok-1");

        let found = repo.find_user_by_token("tok-1").await.unwrap();
        assert_eq!(found, Some(user));

        assert_eq!(repo.delete_token("tok-1").await.unwrap(), 1);
        assert!(repo.find_user_by_token("tok-1").await.unwrap().is_none());
    }
}
