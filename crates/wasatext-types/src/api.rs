use serde::{Deserialize, Serialize};

use crate::models::{ConversationKind, MessageKind};

// -- JWT Claims --

/// Bearer token claims. `sub` is the numeric user id handed out by
/// `POST /session`; the username is deliberately absent since it can change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub exp: usize,
}

// -- Session --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub identifier: i64,
    pub token: String,
}

// -- Users --

#[derive(Debug, Deserialize)]
pub struct UserSearchQuery {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditUsernameRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditPhotoRequest {
    #[serde(with = "crate::bytes")]
    pub photo: Vec<u8>,
}

// -- Conversations --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateConversationRequest {
    #[serde(rename = "type")]
    pub kind: ConversationKind,
    #[serde(default)]
    pub group_name: String,
    /// Username of the other side of a private conversation.
    #[serde(default)]
    pub participant: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateConversationResponse {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditGroupNameRequest {
    pub group_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditGroupPhotoRequest {
    #[serde(with = "crate::bytes")]
    pub group_photo: Vec<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddMemberRequest {
    pub username: String,
}

// -- Messages --

/// Body for both sending and replying.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub content: String,
    #[serde(default, with = "crate::bytes")]
    pub media: Vec<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForwardMessageRequest {
    pub conversation_id: i64,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub content: String,
}
