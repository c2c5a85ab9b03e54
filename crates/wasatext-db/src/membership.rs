//! The one authorization primitive: is this user a participant of that
//! conversation?

use rusqlite::{Connection, params};
use wasatext_types::models::ConversationKind;

use crate::error::OptionalExt;
use crate::models::parse_column;
use crate::{Database, DbError, DbResult};

impl Database {
    /// `NotFound` when the conversation does not exist, `NotAuthorized` when
    /// `user_id` is not among its participants.
    pub fn check_participant(&self, user_id: i64, conversation_id: i64) -> DbResult<()> {
        self.with_conn(|conn| ensure_participant(conn, user_id, conversation_id).map(|_| ()))
    }
}

/// Guard used by every conversation-scoped operation. Returns the
/// conversation's type so callers can apply group-only rules without a
/// second lookup.
pub(crate) fn ensure_participant(
    conn: &Connection,
    user_id: i64,
    conversation_id: i64,
) -> DbResult<ConversationKind> {
    let kind = conversation_kind(conn, conversation_id)?.ok_or(DbError::NotFound("conversation"))?;

    if !is_participant(conn, user_id, conversation_id)? {
        return Err(DbError::NotAuthorized("user is not a participant"));
    }
    Ok(kind)
}

/// Guard plus the group-only rule.
pub(crate) fn ensure_group_participant(
    conn: &Connection,
    user_id: i64,
    conversation_id: i64,
) -> DbResult<()> {
    match ensure_participant(conn, user_id, conversation_id)? {
        ConversationKind::Group => Ok(()),
        ConversationKind::Private => Err(DbError::NotAuthorized("not a group conversation")),
    }
}

pub(crate) fn conversation_kind(
    conn: &Connection,
    conversation_id: i64,
) -> DbResult<Option<ConversationKind>> {
    conn.query_row(
        "SELECT kind FROM conversations WHERE id = ?1",
        [conversation_id],
        |row| parse_column(row, 0),
    )
    .optional()
}

pub(crate) fn is_participant(conn: &Connection, user_id: i64, conversation_id: i64) -> DbResult<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM participants WHERE user_id = ?1 AND conversation_id = ?2)",
        params![user_id, conversation_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}
