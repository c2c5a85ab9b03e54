pub mod api;
pub mod bytes;
pub mod context;
pub mod models;

pub use context::RequestContext;
