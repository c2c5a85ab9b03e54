use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::middleware::require_auth;
use crate::state::{AppState, run_db};
use crate::{auth, comments, conversations, messages, users};

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/session", post(auth::login))
        .route("/liveness", get(liveness));

    let protected_routes = Router::new()
        .route("/users", get(users::search_users))
        .route("/users/me", get(users::get_profile))
        .route("/users/me/username", put(users::edit_username))
        .route("/users/me/photo", put(users::edit_profile_photo))
        .route(
            "/conversations",
            get(conversations::list_previews).post(conversations::create_conversation),
        )
        .route("/conversations/{conversation_id}", get(messages::list_messages))
        .route("/conversations/{conversation_id}/name", put(conversations::edit_group_name))
        .route("/conversations/{conversation_id}/photo", put(conversations::edit_group_photo))
        .route(
            "/conversations/{conversation_id}/members",
            get(conversations::list_members).post(conversations::add_member),
        )
        .route(
            "/conversations/{conversation_id}/members/{user_id}",
            delete(conversations::remove_member),
        )
        .route(
            "/conversations/{conversation_id}/messages",
            post(messages::send_message),
        )
        .route(
            "/conversations/{conversation_id}/messages/{message_id}",
            delete(messages::delete_message),
        )
        .route(
            "/conversations/{conversation_id}/messages/{message_id}/forward",
            post(messages::forward_message),
        )
        .route(
            "/conversations/{conversation_id}/messages/{message_id}/reply",
            post(messages::reply_to_message),
        )
        .route(
            "/conversations/{conversation_id}/messages/{message_id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/conversations/{conversation_id}/messages/{message_id}/comments/{comment_id}",
            delete(comments::delete_comment),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /liveness: 200 while the database answers.
async fn liveness(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    run_db(&state, |db| db.ping()).await?;
    Ok(StatusCode::OK)
}
