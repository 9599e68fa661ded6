use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::auth::error::AuthError;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::token::TokenSigner;
use crate::store::{CredentialStore, NewUser, StoreError, Token, User};
use uuid::Uuid;

/// Orchestrates registration, login and token lookup over an abstract
/// [`CredentialStore`]. Stateless across calls; every request races freely
/// against the others. In particular two concurrent logins that both find
/// an expired token will both mint a replacement, and both replacements are
/// valid — the store's creation-time ordering decides which one later reads
/// as "current".
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    signer: TokenSigner,
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, signer: TokenSigner) -> Self {
        Self { store, signer }
    }

    /// Create a user, hashing the password before anything is persisted,
    /// then issue the account's first token. Failure to issue that token is
    /// logged and swallowed: user creation must not fail because of a
    /// signing problem, so the account may start out with no token at all.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<User, AuthError> {
        let password_hash = hash_password(password)?;
        let user = self
            .store
            .create_user(NewUser {
                username: username.to_string(),
                password_hash,
                email: email.to_string(),
            })
            .await?;

        if let Err(e) = self.mint_token(user.id).await {
            warn!(user_id = %user.id, error = %e, "initial token issuance failed");
        }

        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Authenticate a username/password pair and hand back the user's
    /// current token: the latest stored one if its expiry is still in the
    /// future, otherwise a freshly minted replacement. Superseded rows are
    /// left in place.
    pub async fn login(&self, username: &str, password: &str) -> Result<Token, AuthError> {
        let user = match self.store.user_by_username(username).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => return Err(AuthError::UserNotFound),
            Err(e) => return Err(e.into()),
        };

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let current = match self.store.latest_token_for_user(user.id).await {
            Ok(token) => token,
            // Reachable when registration's token issuance was swallowed.
            Err(StoreError::NotFound) => return Err(AuthError::NoTokenForUser),
            Err(e) => return Err(e.into()),
        };

        if current.is_valid(Utc::now().timestamp()) {
            return Ok(current);
        }

        let replacement = self.mint_token(user.id).await?;
        info!(user_id = %user.id, "expired token replaced");
        Ok(replacement)
    }

    /// Look a token up by its key and return the stored record verbatim.
    /// Neither the expiry nor the key's signature is interpreted here; the
    /// caller decides what to make of the returned fields.
    pub async fn validate_token_key(&self, key: &str) -> Result<Token, AuthError> {
        match self.store.token_by_key(key).await {
            Ok(token) => Ok(token),
            Err(StoreError::NotFound) => Err(AuthError::TokenNotFound),
            Err(e) => Err(e.into()),
        }
    }

    async fn mint_token(&self, user_id: Uuid) -> Result<Token, AuthError> {
        let fresh = self.signer.issue(user_id)?;
        Ok(self.store.create_token(fresh).await?)
    }
}
