use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::store::StoreError;

/// Authentication errors.
///
/// None of the variants carry a plaintext password or the signing secret.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("user not found")]
    UserNotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("no token on record for user")]
    NoTokenForUser,

    #[error("token not found")]
    TokenNotFound,

    #[error("token signing failed")]
    TokenIssuance(#[source] jsonwebtoken::errors::Error),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            // Identical outcome for unknown user and wrong password, so a
            // failure message never confirms that an account exists.
            AuthError::UserNotFound | AuthError::InvalidCredentials => {
                warn!("login rejected");
                (StatusCode::UNAUTHORIZED, "login failed".to_string())
            }
            AuthError::TokenNotFound => (StatusCode::NOT_FOUND, "token not found".to_string()),
            AuthError::Store(StoreError::Conflict) => {
                (StatusCode::CONFLICT, "username already taken".to_string())
            }
            AuthError::NoTokenForUser
            | AuthError::TokenIssuance(_)
            | AuthError::Hash(_)
            | AuthError::Store(_) => {
                error!(error = %self, "auth request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn status_and_body(err: AuthError) -> (StatusCode, String) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, String::from_utf8(bytes.to_vec()).expect("utf8 body"))
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_are_indistinguishable() {
        let a = status_and_body(AuthError::UserNotFound).await;
        let b = status_and_body(AuthError::InvalidCredentials).await;
        assert_eq!(a, b);
        assert_eq!(a.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_token_key_is_not_found() {
        let (status, _) = status_and_body(AuthError::TokenNotFound).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn store_backend_failures_stay_opaque() {
        let err = AuthError::Store(StoreError::Backend(anyhow::anyhow!(
            "connection refused (host=db)"
        )));
        let (status, body) = status_and_body(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "internal error");
    }
}
