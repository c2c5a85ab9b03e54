use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::{Instrument, info_span};
use wasatext_types::RequestContext;
use wasatext_types::api::Claims;

use crate::error::ApiError;
use crate::state::AppState;

/// Verify the bearer token and attach a [`RequestContext`] for the handler.
/// The rest of the request runs inside a span tagged with its request id and
/// user id.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(ApiError::Unauthorized)?;

    let token_data = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?;

    let ctx = RequestContext::new(token_data.claims.sub);
    let span = info_span!(
        "request",
        request_id = %ctx.request_id,
        user_id = ctx.user_id,
    );
    req.extensions_mut().insert(ctx);

    Ok(next.run(req).instrument(span).await)
}
