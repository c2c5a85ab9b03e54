use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, info};
use wasatext_types::RequestContext;
use wasatext_types::api::{EditPhotoRequest, EditUsernameRequest, UserSearchQuery};

use crate::auth::validate_username;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::{AppState, run_db};

/// GET /users?username=q
pub async fn search_users(
    State(state): State<AppState>,
    Extension(_ctx): Extension<RequestContext>,
    Query(query): Query<UserSearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let users = run_db(&state, move |db| db.search_users(&query.username)).await?;
    debug!("User search returned {} results", users.len());
    Ok(Json(users))
}

/// GET /users/me
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, ApiError> {
    let user = run_db(&state, move |db| db.get_user(ctx.user_id)).await?;
    Ok(Json(user))
}

/// PUT /users/me/username
pub async fn edit_username(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    JsonBody(req): JsonBody<EditUsernameRequest>,
) -> Result<StatusCode, ApiError> {
    validate_username(&req.username)?;
    let username = req.username;
    run_db(&state, move |db| db.edit_username(&ctx, &username)).await?;
    info!("Username updated");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /users/me/photo
pub async fn edit_profile_photo(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    JsonBody(req): JsonBody<EditPhotoRequest>,
) -> Result<StatusCode, ApiError> {
    run_db(&state, move |db| db.edit_profile_photo(&ctx, &req.photo)).await?;
    info!("Profile photo updated");
    Ok(StatusCode::NO_CONTENT)
}
