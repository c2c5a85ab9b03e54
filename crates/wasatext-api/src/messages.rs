use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, info};
use wasatext_db::NewMessage;
use wasatext_types::RequestContext;
use wasatext_types::api::{ForwardMessageRequest, SendMessageRequest};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::{AppState, run_db};

fn new_message(req: SendMessageRequest) -> NewMessage {
    NewMessage {
        kind: req.kind,
        content: req.content,
        media: req.media,
    }
}

/// GET /conversations/{conversation_id}: also marks incoming messages read.
pub async fn list_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<i64>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = run_db(&state, move |db| db.list_messages(&ctx, conversation_id)).await?;
    debug!("Conversation {}: {} messages", conversation_id, messages.len());
    Ok(Json(messages))
}

/// POST /conversations/{conversation_id}/messages
pub async fn send_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<i64>,
    Extension(ctx): Extension<RequestContext>,
    JsonBody(req): JsonBody<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let msg = new_message(req);
    let message = run_db(&state, move |db| db.create_message(&ctx, conversation_id, &msg)).await?;
    info!("Message {} sent to conversation {}", message.id, conversation_id);
    Ok((StatusCode::CREATED, Json(message)))
}

/// DELETE /conversations/{conversation_id}/messages/{message_id}
pub async fn delete_message(
    State(state): State<AppState>,
    Path((conversation_id, message_id)): Path<(i64, i64)>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<StatusCode, ApiError> {
    run_db(&state, move |db| {
        db.delete_message(&ctx, conversation_id, message_id)
    })
    .await?;
    info!("Message {} deleted", message_id);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /conversations/{conversation_id}/messages/{message_id}/forward
pub async fn forward_message(
    State(state): State<AppState>,
    Path((conversation_id, message_id)): Path<(i64, i64)>,
    Extension(ctx): Extension<RequestContext>,
    JsonBody(req): JsonBody<ForwardMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let target = req.conversation_id;
    let message = run_db(&state, move |db| {
        db.forward_message(&ctx, conversation_id, message_id, target)
    })
    .await?;
    info!(
        "Message {} forwarded from {} to {} as {}",
        message_id, conversation_id, target, message.id
    );
    Ok((StatusCode::CREATED, Json(message)))
}

/// POST /conversations/{conversation_id}/messages/{message_id}/reply
pub async fn reply_to_message(
    State(state): State<AppState>,
    Path((conversation_id, message_id)): Path<(i64, i64)>,
    Extension(ctx): Extension<RequestContext>,
    JsonBody(req): JsonBody<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let msg = new_message(req);
    let message = run_db(&state, move |db| {
        db.reply_to_message(&ctx, conversation_id, message_id, &msg)
    })
    .await?;
    info!("Message {} replies to {}", message.id, message_id);
    Ok((StatusCode::CREATED, Json(message)))
}
