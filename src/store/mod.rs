use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// User record in the store.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Insert form of [`User`]. The id is assigned by the store; the password
/// arrives here already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: String,
}

/// Session token record. `expires_at` is unix seconds; tokens are never
/// mutated after creation, only superseded by newer rows. `deleted_at` is a
/// soft-delete slot that no current flow populates.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Token {
    pub id: i64,
    pub key: String,
    pub user_id: Uuid,
    pub expires_at: i64,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Token {
    /// A token is reusable while its expiry is strictly in the future.
    pub fn is_valid(&self, now: i64) -> bool {
        self.expires_at > now
    }
}

/// Insert form of [`Token`].
#[derive(Debug, Clone)]
pub struct NewToken {
    pub key: String,
    pub user_id: Uuid,
    pub expires_at: i64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("username already taken")]
    Conflict,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Persistence contract for users and tokens. The orchestrator only ever
/// talks to this trait; concrete backends live in [`postgres`] and
/// [`memory`].
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persist a new user and return the stored record with its assigned id.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    /// Persist a new token and return the stored record.
    async fn create_token(&self, token: NewToken) -> Result<Token, StoreError>;

    async fn user_by_username(&self, username: &str) -> Result<User, StoreError>;

    async fn token_by_key(&self, key: &str) -> Result<Token, StoreError>;

    /// The user's most recent token by creation time (id breaks ties).
    async fn latest_token_for_user(&self, user_id: Uuid) -> Result<Token, StoreError>;
}
