use rusqlite::params;
use wasatext_types::RequestContext;
use wasatext_types::models::User;

use crate::conversations::find_private_conversation;
use crate::error::is_unique_violation;
use crate::membership::ensure_group_participant;
use crate::models::user_from_row;
use crate::users::query_user_by_username;
use crate::{Database, DbError, DbResult};

impl Database {
    pub fn edit_group_name(&self, ctx: &RequestContext, conversation_id: i64, name: &str) -> DbResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DbError::InvalidInput("group name must not be empty"));
        }

        self.with_conn(|conn| {
            ensure_group_participant(conn, ctx.user_id, conversation_id)?;
            conn.execute(
                "UPDATE conversations SET name = ?1 WHERE id = ?2",
                params![name, conversation_id],
            )?;
            Ok(())
        })
    }

    pub fn edit_group_photo(&self, ctx: &RequestContext, conversation_id: i64, photo: &[u8]) -> DbResult<()> {
        self.with_conn(|conn| {
            ensure_group_participant(conn, ctx.user_id, conversation_id)?;
            conn.execute(
                "UPDATE conversations SET photo = ?1 WHERE id = ?2",
                params![photo, conversation_id],
            )?;
            Ok(())
        })
    }

    /// Adds `username` to a group. The requester may only invite users they
    /// already share a private conversation with.
    pub fn add_member(&self, ctx: &RequestContext, conversation_id: i64, username: &str) -> DbResult<()> {
        self.with_conn(|conn| {
            ensure_group_participant(conn, ctx.user_id, conversation_id)?;

            let target = query_user_by_username(conn, username)?.ok_or(DbError::NotFound("user"))?;
            if find_private_conversation(conn, ctx.user_id, target.id)?.is_none() {
                return Err(DbError::NotAuthorized(
                    "no private conversation with the invited user",
                ));
            }

            conn.execute(
                "INSERT INTO participants (user_id, conversation_id) VALUES (?1, ?2)",
                params![target.id, conversation_id],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DbError::Conflict("user is already a member")
                } else {
                    e.into()
                }
            })?;
            Ok(())
        })
    }

    /// Removes `user_id` from a group; with the caller's own id this is
    /// "leave group".
    pub fn remove_member(&self, ctx: &RequestContext, conversation_id: i64, user_id: i64) -> DbResult<()> {
        self.with_conn(|conn| {
            ensure_group_participant(conn, ctx.user_id, conversation_id)?;

            let removed = conn.execute(
                "DELETE FROM participants WHERE user_id = ?1 AND conversation_id = ?2",
                params![user_id, conversation_id],
            )?;
            if removed == 0 {
                return Err(DbError::NotFound("member"));
            }
            Ok(())
        })
    }

    pub fn list_members(&self, ctx: &RequestContext, conversation_id: i64) -> DbResult<Vec<User>> {
        self.with_conn(|conn| {
            ensure_group_participant(conn, ctx.user_id, conversation_id)?;

            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.photo
                 FROM participants p
                 JOIN users u ON u.id = p.user_id
                 WHERE p.conversation_id = ?1
                 ORDER BY u.id",
            )?;
            let members = stmt
                .query_map([conversation_id], |row| user_from_row(row, 0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(members)
        })
    }
}
