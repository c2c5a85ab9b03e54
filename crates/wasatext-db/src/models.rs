//! Inputs to the write paths plus the row mappers shared by the read paths.

use std::str::FromStr;

use rusqlite::Row;
use rusqlite::types::Type;
use wasatext_types::models::{
    ConversationKind, Message, MessageKind, MessageStatus, ReplySnapshot, User,
};

use crate::{DbError, DbResult};

/// Request to open a conversation. Exactly one of `group_name` / `peer` is
/// meaningful, selected by `kind`.
#[derive(Debug, Clone)]
pub struct NewConversation {
    pub kind: ConversationKind,
    pub group_name: String,
    pub peer: String,
}

impl NewConversation {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            kind: ConversationKind::Group,
            group_name: name.into(),
            peer: String::new(),
        }
    }

    pub fn private(peer: impl Into<String>) -> Self {
        Self {
            kind: ConversationKind::Private,
            group_name: String::new(),
            peer: peer.into(),
        }
    }

    pub fn validate(&self) -> DbResult<()> {
        let ok = match self.kind {
            ConversationKind::Group => !self.group_name.trim().is_empty() && self.peer.is_empty(),
            ConversationKind::Private => self.group_name.is_empty() && !self.peer.is_empty(),
        };
        if ok {
            Ok(())
        } else {
            Err(DbError::InvalidInput(
                "a group needs a name and no participant, a private conversation the reverse",
            ))
        }
    }
}

/// Body of a new message or reply.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub kind: MessageKind,
    pub content: String,
    pub media: Vec<u8>,
}

impl NewMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Text,
            content: content.into(),
            media: Vec::new(),
        }
    }

    pub fn media(media: Vec<u8>, caption: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Media,
            content: caption.into(),
            media,
        }
    }

    /// Text needs content and no payload; media needs a payload, content is
    /// an optional caption.
    pub fn validate(&self) -> DbResult<()> {
        let ok = match self.kind {
            MessageKind::Text => !self.content.is_empty() && self.media.is_empty(),
            MessageKind::Media => !self.media.is_empty(),
        };
        if ok {
            Ok(())
        } else {
            Err(DbError::InvalidInput("message type does not match its content"))
        }
    }
}

pub(crate) fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Reads `id, username, photo` starting at column `offset`.
pub(crate) fn user_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(offset)?,
        username: row.get(offset + 1)?,
        photo: row.get(offset + 2)?,
    })
}

/// Column list matching [`message_from_row`]; expects `messages m JOIN users u`.
pub(crate) const MESSAGE_COLUMNS: &str = "m.id, m.conversation_id, m.kind, m.content, m.media, \
     m.timestamp, m.status, m.forwarded, m.reply_to_id, m.reply_sender, m.reply_content, \
     u.id, u.username, u.photo";

pub(crate) fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    let reply_to = match row.get::<_, Option<i64>>(8)? {
        Some(message_id) => Some(ReplySnapshot {
            message_id,
            sender_username: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
            content: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
        }),
        None => None,
    };

    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        kind: parse_column::<MessageKind>(row, 2)?,
        content: row.get(3)?,
        media: row.get::<_, Option<Vec<u8>>>(4)?.unwrap_or_default(),
        timestamp: row.get(5)?,
        status: parse_column::<MessageStatus>(row, 6)?,
        forwarded: row.get(7)?,
        reply_to,
        sender: user_from_row(row, 11)?,
    })
}
