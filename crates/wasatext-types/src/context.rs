use uuid::Uuid;

/// Per-request identity handed to every core operation.
///
/// Built by the HTTP layer once the bearer token is verified; nothing about
/// the request outlives this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub user_id: i64,
}

impl RequestContext {
    pub fn new(user_id: i64) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user_id,
        }
    }
}
