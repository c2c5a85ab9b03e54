use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;

use wasatext_types::api::{Claims, LoginRequest, LoginResponse};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::{AppState, run_db};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 17;

/// POST /session: log in, registering the username on first use.
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_username(&req.username)?;

    let username = req.username.clone();
    let user_id = run_db(&state, move |db| db.login(&username)).await?;

    let token = create_token(&state.jwt_secret, user_id, state.token_ttl_days)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!("Authenticated {} as user {}", req.username, user_id);

    Ok((
        StatusCode::CREATED,
        Json(LoginResponse {
            identifier: user_id,
            token,
        }),
    ))
}

/// 3 to 17 characters from `[A-Za-z0-9_]`.
pub fn validate_username(username: &str) -> Result<(), ApiError> {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(ApiError::BadRequest(format!(
            "username must be {}-{} characters",
            USERNAME_MIN, USERNAME_MAX
        )));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ApiError::BadRequest(
            "username may only contain letters, digits and '_'".into(),
        ));
    }
    Ok(())
}

pub fn create_token(secret: &str, user_id: i64, ttl_days: i64) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        exp: (chrono::Utc::now() + chrono::Duration::days(ttl_days)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
