use rusqlite::{Connection, params};
use wasatext_types::RequestContext;
use wasatext_types::models::Comment;

use crate::error::OptionalExt;
use crate::membership::ensure_participant;
use crate::models::user_from_row;
use crate::{Database, DbError, DbResult, now_unix};

const COMMENT_COLUMNS: &str = "c.id, c.message_id, c.content, c.timestamp, u.id, u.username, u.photo";

fn comment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        message_id: row.get(1)?,
        content: row.get(2)?,
        timestamp: row.get(3)?,
        author: user_from_row(row, 4)?,
    })
}

impl Database {
    pub fn list_comments(&self, ctx: &RequestContext, conversation_id: i64, message_id: i64) -> DbResult<Vec<Comment>> {
        self.with_conn(|conn| {
            ensure_commentable(conn, ctx, conversation_id, message_id)?;

            let sql = format!(
                "SELECT {COMMENT_COLUMNS}
                 FROM comments c
                 JOIN users u ON u.id = c.author_id
                 WHERE c.message_id = ?1
                 ORDER BY c.id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let comments = stmt
                .query_map([message_id], comment_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(comments)
        })
    }

    pub fn create_comment(
        &self,
        ctx: &RequestContext,
        conversation_id: i64,
        message_id: i64,
        content: &str,
    ) -> DbResult<Comment> {
        if content.trim().is_empty() {
            return Err(DbError::InvalidInput("comment must not be empty"));
        }

        self.with_conn(|conn| {
            ensure_commentable(conn, ctx, conversation_id, message_id)?;

            conn.execute(
                "INSERT INTO comments (message_id, author_id, content, timestamp) VALUES (?1, ?2, ?3, ?4)",
                params![message_id, ctx.user_id, content, now_unix()],
            )?;
            let id = conn.last_insert_rowid();

            let sql = format!(
                "SELECT {COMMENT_COLUMNS}
                 FROM comments c
                 JOIN users u ON u.id = c.author_id
                 WHERE c.id = ?1"
            );
            Ok(conn.query_row(&sql, [id], comment_from_row)?)
        })
    }

    /// Only the author may delete; a comment outside the conversation or by
    /// someone else reads as `NotFound`.
    pub fn delete_comment(
        &self,
        ctx: &RequestContext,
        conversation_id: i64,
        message_id: i64,
        comment_id: i64,
    ) -> DbResult<()> {
        self.with_conn(|conn| {
            ensure_participant(conn, ctx.user_id, conversation_id)?;

            let deleted = conn.execute(
                "DELETE FROM comments
                 WHERE id = ?1
                   AND author_id = ?2
                   AND message_id = ?3
                   AND message_id IN (SELECT id FROM messages WHERE conversation_id = ?4)",
                params![comment_id, ctx.user_id, message_id, conversation_id],
            )?;
            if deleted == 0 {
                return Err(DbError::NotFound("comment"));
            }
            Ok(())
        })
    }
}

/// The message must exist, the caller must be a participant, and the
/// message must belong to the stated conversation.
fn ensure_commentable(
    conn: &Connection,
    ctx: &RequestContext,
    conversation_id: i64,
    message_id: i64,
) -> DbResult<()> {
    let owner: i64 = conn
        .query_row(
            "SELECT conversation_id FROM messages WHERE id = ?1",
            [message_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(DbError::NotFound("message"))?;

    ensure_participant(conn, ctx.user_id, conversation_id)?;

    if owner != conversation_id {
        return Err(DbError::NotFound("message"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ctx, setup};
    use crate::{NewConversation, NewMessage};

    fn message_setup() -> (Database, i64, i64, i64, i64) {
        let (db, alice, bob) = setup();
        let conv = db
            .create_conversation(&ctx(alice), &NewConversation::private("bob"))
            .unwrap();
        let msg = db
            .create_message(&ctx(alice), conv, &NewMessage::text("photo of my cat"))
            .unwrap();
        (db, alice, bob, conv, msg.id)
    }

    #[test]
    fn participants_comment_and_list() {
        let (db, alice, bob, conv, msg) = message_setup();

        let first = db.create_comment(&ctx(bob), conv, msg, "cute!").unwrap();
        assert_eq!(first.author.id, bob);
        assert_eq!(first.message_id, msg);
        db.create_comment(&ctx(alice), conv, msg, "thanks").unwrap();

        let comments = db.list_comments(&ctx(alice), conv, msg).unwrap();
        let authors: Vec<&str> = comments.iter().map(|c| c.author.username.as_str()).collect();
        assert_eq!(authors, vec!["bob", "alice"]);
    }

    #[test]
    fn comment_preconditions() {
        let (db, alice, _, conv, msg) = message_setup();
        let carol = db.login("carol").unwrap();

        assert!(matches!(
            db.create_comment(&ctx(alice), conv, 999, "?"),
            Err(DbError::NotFound("message"))
        ));
        assert!(matches!(
            db.list_comments(&ctx(carol), conv, msg),
            Err(DbError::NotAuthorized(_))
        ));
        assert!(matches!(
            db.create_comment(&ctx(alice), conv, msg, "  "),
            Err(DbError::InvalidInput(_))
        ));

        // a message from another conversation is not reachable through this one
        let group = db
            .create_conversation(&ctx(alice), &NewConversation::group("g"))
            .unwrap();
        assert!(matches!(
            db.list_comments(&ctx(alice), group, msg),
            Err(DbError::NotFound("message"))
        ));
    }

    #[test]
    fn only_author_deletes_comment() {
        let (db, alice, bob, conv, msg) = message_setup();
        let comment = db.create_comment(&ctx(bob), conv, msg, "mine").unwrap();

        assert!(matches!(
            db.delete_comment(&ctx(alice), conv, msg, comment.id),
            Err(DbError::NotFound("comment"))
        ));
        db.delete_comment(&ctx(bob), conv, msg, comment.id).unwrap();
        assert!(db.list_comments(&ctx(alice), conv, msg).unwrap().is_empty());
    }

    #[test]
    fn delete_comment_requires_matching_message() {
        let (db, _, bob, conv, msg) = message_setup();
        let other = db
            .create_message(&ctx(bob), conv, &NewMessage::text("another"))
            .unwrap();
        let comment = db.create_comment(&ctx(bob), conv, msg, "mine").unwrap();

        assert!(matches!(
            db.delete_comment(&ctx(bob), conv, other.id, comment.id),
            Err(DbError::NotFound("comment"))
        ));
        assert_eq!(db.list_comments(&ctx(bob), conv, msg).unwrap().len(), 1);
    }

    #[test]
    fn deleting_message_drops_its_comments() {
        let (db, alice, bob, conv, msg) = message_setup();
        db.create_comment(&ctx(bob), conv, msg, "nice").unwrap();
        db.delete_message(&ctx(alice), conv, msg).unwrap();

        let left: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM comments", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(left, 0);
    }
}
