use chrono::{Months, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::auth::error::AuthError;
use crate::store::NewToken;

/// Every token lives this long from the moment it is minted.
const TOKEN_TTL_MONTHS: u32 = 2;

/// Payload signed into a token key. `jti` is a per-issuance nonce, so two
/// tokens minted for the same user in the same second still get distinct
/// keys.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    jti: Uuid,
    iat: i64,
    exp: i64,
}

/// Signs token keys with the process-wide shared secret. Read-only after
/// startup.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Build an unsaved token bound to `user_id`, expiring two calendar
    /// months from now. A signing failure surfaces as
    /// [`AuthError::TokenIssuance`] and nothing may be persisted for it.
    pub fn issue(&self, user_id: Uuid) -> Result<NewToken, AuthError> {
        let now = Utc::now();
        let expires_at = (now + Months::new(TOKEN_TTL_MONTHS)).timestamp();
        let claims = Claims {
            sub: user_id,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: expires_at,
        };
        let key = encode(&Header::default(), &claims, &self.encoding)
            .map_err(AuthError::TokenIssuance)?;
        debug!(user_id = %user_id, "token signed");
        Ok(NewToken {
            key,
            user_id,
            expires_at,
        })
    }
}

#[cfg(test)]
impl TokenSigner {
    /// A signer whose key family never matches the HS256 header, so every
    /// `issue` call fails. Exercises the swallowed-failure path in
    /// registration.
    pub(crate) fn broken() -> Self {
        Self {
            encoding: EncodingKey::from_rsa_der(&[]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    const SECRET: &str = "dev-secret";

    #[test]
    fn issued_key_binds_the_user_id() {
        let signer = TokenSigner::new(SECRET);
        let user_id = Uuid::new_v4();
        let token = signer.issue(user_id).expect("issue token");

        let decoding = DecodingKey::from_secret(SECRET.as_bytes());
        let data =
            decode::<Claims>(&token.key, &decoding, &Validation::default()).expect("decode key");
        assert_eq!(data.claims.sub, user_id);
        assert_eq!(data.claims.exp, token.expires_at);
    }

    #[test]
    fn expiry_is_about_two_months_out() {
        let signer = TokenSigner::new(SECRET);
        let token = signer.issue(Uuid::new_v4()).expect("issue token");
        let ttl = token.expires_at - Utc::now().timestamp();
        // 2 calendar months is 59..=62 days depending on the start date.
        assert!(ttl > 58 * 86_400, "ttl too short: {ttl}");
        assert!(ttl <= 62 * 86_400, "ttl too long: {ttl}");
    }

    #[test]
    fn back_to_back_issuance_yields_distinct_keys() {
        let signer = TokenSigner::new(SECRET);
        let user_id = Uuid::new_v4();
        let first = signer.issue(user_id).expect("issue token");
        let second = signer.issue(user_id).expect("issue token");
        assert_ne!(first.key, second.key);
    }

    #[test]
    fn broken_signer_fails_to_issue() {
        let err = TokenSigner::broken().issue(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AuthError::TokenIssuance(_)));
    }
}
