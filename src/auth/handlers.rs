use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, RegisterRequest},
        error::AuthError,
    },
    state::AppState,
    store::Token,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/token/:key", get(validate_token))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AuthError> {
    payload.username = payload.username.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(AuthError::Validation(
            "username and password are required".into(),
        ));
    }
    if !is_valid_email(&payload.email) {
        return Err(AuthError::Validation("invalid email".into()));
    }

    let user = state
        .auth
        .register(&payload.username, &payload.password, &payload.email)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PublicUser {
            id: user.id,
            username: user.username,
            email: user.email,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Token>, AuthError> {
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err(AuthError::Validation(
            "username and password are required".into(),
        ));
    }

    let token = state.auth.login(username, &payload.password).await?;
    Ok(Json(token))
}

#[instrument(skip(state))]
pub async fn validate_token(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Token>, AuthError> {
    let token = state.auth.validate_token_key(&key).await?;
    Ok(Json(token))
}
