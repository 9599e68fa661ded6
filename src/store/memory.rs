use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::store::{CredentialStore, NewToken, NewUser, StoreError, Token, User};

/// In-memory [`CredentialStore`] used as the test double for the
/// orchestrator. Ordering semantics match the Postgres store: the latest
/// token is the one with the greatest creation time, id breaking ties.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    tokens: Vec<Token>,
    next_token_id: i64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        if inner.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict);
        }
        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            password_hash: user.password_hash,
            email: user.email,
            created_at: Utc::now(),
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn create_token(&self, token: NewToken) -> Result<Token, StoreError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.next_token_id += 1;
        let token = Token {
            id: inner.next_token_id,
            key: token.key,
            user_id: token.user_id,
            expires_at: token.expires_at,
            created_at: Utc::now(),
            deleted_at: None,
        };
        inner.tokens.push(token.clone());
        Ok(token)
    }

    async fn user_by_username(&self, username: &str) -> Result<User, StoreError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        inner
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn token_by_key(&self, key: &str) -> Result<Token, StoreError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        inner
            .tokens
            .iter()
            .find(|t| t.key == key)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn latest_token_for_user(&self, user_id: Uuid) -> Result<Token, StoreError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        inner
            .tokens
            .iter()
            .filter(|t| t.user_id == user_id)
            .max_by_key(|t| (t.created_at, t.id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
impl InMemoryStore {
    /// Rewrite a stored token's expiry in place, as a DBA would.
    pub(crate) fn set_token_expiry(&self, key: &str, expires_at: i64) {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let token = inner
            .tokens
            .iter_mut()
            .find(|t| t.key == key)
            .expect("no such token");
        token.expires_at = expires_at;
    }

    pub(crate) fn user_count(&self) -> usize {
        self.inner.lock().expect("store lock poisoned").users.len()
    }

    pub(crate) fn tokens_for(&self, user_id: Uuid) -> Vec<Token> {
        self.inner
            .lock()
            .expect("store lock poisoned")
            .tokens
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_token(user_id: Uuid, key: &str) -> NewToken {
        NewToken {
            key: key.to_string(),
            user_id,
            expires_at: Utc::now().timestamp() + 60,
        }
    }

    #[tokio::test]
    async fn latest_token_is_the_most_recently_created() {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();
        store.create_token(new_token(user_id, "first")).await.unwrap();
        store.create_token(new_token(user_id, "second")).await.unwrap();
        // Another user's token must not shadow the result.
        store
            .create_token(new_token(Uuid::new_v4(), "other"))
            .await
            .unwrap();

        let latest = store.latest_token_for_user(user_id).await.unwrap();
        assert_eq!(latest.key, "second");
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let store = InMemoryStore::new();
        let user = NewUser {
            username: "alice".into(),
            password_hash: "h".into(),
            email: "a@x.com".into(),
        };
        store.create_user(user.clone()).await.unwrap();
        let err = store.create_user(user).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
    }

    #[tokio::test]
    async fn lookups_miss_with_not_found() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.user_by_username("ghost").await.unwrap_err(),
            StoreError::NotFound
        ));
        assert!(matches!(
            store.token_by_key("nonexistent").await.unwrap_err(),
            StoreError::NotFound
        ));
        assert!(matches!(
            store.latest_token_for_user(Uuid::new_v4()).await.unwrap_err(),
            StoreError::NotFound
        ));
    }
}
