use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use wasatext_types::RequestContext;
use wasatext_types::api::CreateCommentRequest;

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::{AppState, run_db};

/// GET /conversations/{conversation_id}/messages/{message_id}/comments
pub async fn list_comments(
    State(state): State<AppState>,
    Path((conversation_id, message_id)): Path<(i64, i64)>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = run_db(&state, move |db| {
        db.list_comments(&ctx, conversation_id, message_id)
    })
    .await?;
    Ok(Json(comments))
}

/// POST /conversations/{conversation_id}/messages/{message_id}/comments
pub async fn create_comment(
    State(state): State<AppState>,
    Path((conversation_id, message_id)): Path<(i64, i64)>,
    Extension(ctx): Extension<RequestContext>,
    JsonBody(req): JsonBody<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = run_db(&state, move |db| {
        db.create_comment(&ctx, conversation_id, message_id, &req.content)
    })
    .await?;
    info!("Comment {} added to message {}", comment.id, message_id);
    Ok((StatusCode::CREATED, Json(comment)))
}

/// DELETE /conversations/{conversation_id}/messages/{message_id}/comments/{comment_id}
pub async fn delete_comment(
    State(state): State<AppState>,
    Path((conversation_id, message_id, comment_id)): Path<(i64, i64, i64)>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<StatusCode, ApiError> {
    run_db(&state, move |db| {
        db.delete_comment(&ctx, conversation_id, message_id, comment_id)
    })
    .await?;
    info!("Comment {} deleted", comment_id);
    Ok(StatusCode::NO_CONTENT)
}
