use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use wasatext_db::NewConversation;
use wasatext_types::RequestContext;
use wasatext_types::api::{
    AddMemberRequest, CreateConversationRequest, CreateConversationResponse, EditGroupNameRequest,
    EditGroupPhotoRequest,
};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::{AppState, run_db};

/// GET /conversations
pub async fn list_previews(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, ApiError> {
    let previews = run_db(&state, move |db| db.list_previews(&ctx)).await?;
    Ok(Json(previews))
}

/// POST /conversations
pub async fn create_conversation(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    JsonBody(req): JsonBody<CreateConversationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new = NewConversation {
        kind: req.kind,
        group_name: req.group_name,
        peer: req.participant,
    };
    let id = run_db(&state, move |db| db.create_conversation(&ctx, &new)).await?;

    info!("Conversation {} created ({})", id, req.kind);
    Ok((StatusCode::CREATED, Json(CreateConversationResponse { id })))
}

// -- Groups --

/// PUT /conversations/{conversation_id}/name
pub async fn edit_group_name(
    State(state): State<AppState>,
    Path(conversation_id): Path<i64>,
    Extension(ctx): Extension<RequestContext>,
    JsonBody(req): JsonBody<EditGroupNameRequest>,
) -> Result<StatusCode, ApiError> {
    run_db(&state, move |db| {
        db.edit_group_name(&ctx, conversation_id, &req.group_name)
    })
    .await?;
    info!("Group {} renamed", conversation_id);
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /conversations/{conversation_id}/photo
pub async fn edit_group_photo(
    State(state): State<AppState>,
    Path(conversation_id): Path<i64>,
    Extension(ctx): Extension<RequestContext>,
    JsonBody(req): JsonBody<EditGroupPhotoRequest>,
) -> Result<StatusCode, ApiError> {
    run_db(&state, move |db| {
        db.edit_group_photo(&ctx, conversation_id, &req.group_photo)
    })
    .await?;
    info!("Group {} photo updated", conversation_id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /conversations/{conversation_id}/members
pub async fn list_members(
    State(state): State<AppState>,
    Path(conversation_id): Path<i64>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, ApiError> {
    let members = run_db(&state, move |db| db.list_members(&ctx, conversation_id)).await?;
    Ok(Json(members))
}

/// POST /conversations/{conversation_id}/members
pub async fn add_member(
    State(state): State<AppState>,
    Path(conversation_id): Path<i64>,
    Extension(ctx): Extension<RequestContext>,
    JsonBody(req): JsonBody<AddMemberRequest>,
) -> Result<StatusCode, ApiError> {
    let username = req.username.clone();
    run_db(&state, move |db| db.add_member(&ctx, conversation_id, &username)).await?;
    info!("{} added to group {}", req.username, conversation_id);
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /conversations/{conversation_id}/members/{user_id}
pub async fn remove_member(
    State(state): State<AppState>,
    Path((conversation_id, user_id)): Path<(i64, i64)>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<StatusCode, ApiError> {
    run_db(&state, move |db| db.remove_member(&ctx, conversation_id, user_id)).await?;
    info!("User {} removed from group {}", user_id, conversation_id);
    Ok(StatusCode::NO_CONTENT)
}
