use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};
use wasatext_db::DbError;

/// Everything a handler can fail with. Store errors keep their kind and are
/// mapped to a status here and nowhere else.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("internal: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Db(e) => match e {
                DbError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                DbError::NotFound(_) => StatusCode::NOT_FOUND,
                DbError::NotAuthorized(_) => StatusCode::FORBIDDEN,
                DbError::Conflict(_) => StatusCode::CONFLICT,
                DbError::Storage(_) | DbError::LockPoisoned(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!("{}", self);
            "internal server error".to_string()
        } else {
            warn!("{}", self);
            self.to_string()
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
