use rusqlite::{Connection, params};
use wasatext_types::RequestContext;
use wasatext_types::models::ConversationKind;

use crate::users::query_user_by_username;
use crate::{Database, DbError, DbResult, NewConversation, now_unix};

impl Database {
    /// Opens a conversation and returns its id.
    ///
    /// The creator is always a participant. A private conversation also gets
    /// the peer and is refused when the pair already has one; group members
    /// join later through `add_member`.
    pub fn create_conversation(&self, ctx: &RequestContext, req: &NewConversation) -> DbResult<i64> {
        req.validate()?;

        self.with_conn_mut(|conn| {
            let peer_id = match req.kind {
                ConversationKind::Private => {
                    let peer = query_user_by_username(conn, &req.peer)?
                        .ok_or(DbError::NotFound("participant"))?;
                    if peer.id == ctx.user_id {
                        return Err(DbError::InvalidInput(
                            "cannot open a private conversation with yourself",
                        ));
                    }
                    if find_private_conversation(conn, ctx.user_id, peer.id)?.is_some() {
                        return Err(DbError::Conflict("private conversation already exists"));
                    }
                    Some(peer.id)
                }
                ConversationKind::Group => None,
            };

            // Private conversations derive their name from the peer when listed.
            let name = match req.kind {
                ConversationKind::Group => Some(req.group_name.trim()),
                ConversationKind::Private => None,
            };

            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO conversations (kind, name, created_at) VALUES (?1, ?2, ?3)",
                params![req.kind.as_str(), name, now_unix()],
            )?;
            let conversation_id = tx.last_insert_rowid();

            let mut add = tx.prepare(
                "INSERT INTO participants (user_id, conversation_id) VALUES (?1, ?2)",
            )?;
            add.execute(params![ctx.user_id, conversation_id])?;
            if let Some(peer_id) = peer_id {
                add.execute(params![peer_id, conversation_id])?;
            }
            drop(add);
            tx.commit()?;

            Ok(conversation_id)
        })
    }
}

/// Id of the private conversation shared by the two users, whichever of them
/// created it.
pub(crate) fn find_private_conversation(
    conn: &Connection,
    user_a: i64,
    user_b: i64,
) -> DbResult<Option<i64>> {
    let mut stmt = conn.prepare(
        "SELECT c.id
         FROM conversations c
         JOIN participants p1 ON p1.conversation_id = c.id AND p1.user_id = ?1
         JOIN participants p2 ON p2.conversation_id = c.id AND p2.user_id = ?2
         WHERE c.kind = 'private'
         LIMIT 1",
    )?;
    let mut rows = stmt.query(params![user_a, user_b])?;
    match rows.next()? {
        Some(row) => Ok(Some(row.get(0)?)),
        None => Ok(None),
    }
}
