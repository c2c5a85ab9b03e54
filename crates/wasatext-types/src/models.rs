use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Returned when a stored or submitted discriminant is not one we know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    ($name:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $label,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    Private,
    Group,
}

string_enum!(ConversationKind, "conversation type", {
    Private => "private",
    Group => "group",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Media,
}

string_enum!(MessageKind, "message type", {
    Text => "text",
    Media => "media",
});

/// Delivery state of a message. Only ever moves `Sent -> Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Read,
}

string_enum!(MessageStatus, "message status", {
    Sent => "sent",
    Read => "read",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default, with = "crate::bytes::option")]
    pub photo: Option<Vec<u8>>,
}

/// Copy of the replied-to message taken when the reply was written.
/// Later edits or deletion of the original never touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplySnapshot {
    pub message_id: i64,
    pub sender_username: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub sender: User,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
    #[serde(with = "crate::bytes")]
    pub media: Vec<u8>,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    pub status: MessageStatus,
    pub forwarded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplySnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub message_id: i64,
    pub author: User,
    pub content: String,
    pub timestamp: i64,
}

/// One row of the conversation list: who/what the conversation is, plus its
/// most recent message when there is one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub conversation_id: i64,
    #[serde(rename = "type")]
    pub kind: ConversationKind,
    pub name: String,
    #[serde(default, with = "crate::bytes::option")]
    pub photo: Option<Vec<u8>>,
    pub latest_message: Option<Message>,
}
