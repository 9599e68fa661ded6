use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::{CredentialStore, NewToken, NewUser, StoreError, Token, User};

/// Postgres-backed [`CredentialStore`]. The pool is internally shared, so
/// the store itself is cheap to clone.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db) = e {
        // 23505: unique_violation
        if db.code().as_deref() == Some("23505") {
            return StoreError::Conflict;
        }
    }
    StoreError::Backend(e.into())
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, email)
            VALUES ($1, $2, $3)
            RETURNING id, username, password_hash, email, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(user)
    }

    async fn create_token(&self, token: NewToken) -> Result<Token, StoreError> {
        let token = sqlx::query_as::<_, Token>(
            r#"
            INSERT INTO tokens (key, user_id, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, key, user_id, expires_at, created_at, deleted_at
            "#,
        )
        .bind(&token.key)
        .bind(token.user_id)
        .bind(token.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(token)
    }

    async fn user_by_username(&self, username: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, email, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?
        .ok_or(StoreError::NotFound)
    }

    async fn token_by_key(&self, key: &str) -> Result<Token, StoreError> {
        sqlx::query_as::<_, Token>(
            r#"
            SELECT id, key, user_id, expires_at, created_at, deleted_at
            FROM tokens
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?
        .ok_or(StoreError::NotFound)
    }

    async fn latest_token_for_user(&self, user_id: Uuid) -> Result<Token, StoreError> {
        sqlx::query_as::<_, Token>(
            r#"
            SELECT id, key, user_id, expires_at, created_at, deleted_at
            FROM tokens
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?
        .ok_or(StoreError::NotFound)
    }
}
