use std::sync::Arc;

use tracing::error;
use wasatext_db::{Database, DbResult};

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
}

impl AppStateInner {
    pub fn new(db: Database, jwt_secret: impl Into<String>, token_ttl_days: i64) -> AppState {
        Arc::new(Self {
            db,
            jwt_secret: jwt_secret.into(),
            token_ttl_days,
        })
    }
}

/// Runs a store operation off the async runtime. rusqlite is blocking, so
/// every handler goes through here.
pub async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> DbResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .map_err(ApiError::from)
}
