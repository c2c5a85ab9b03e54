pub mod auth;
pub mod comments;
pub mod conversations;
pub mod error;
pub mod extract;
pub mod messages;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod users;

pub use error::ApiError;
pub use routes::build_router;
pub use state::{AppState, AppStateInner};
