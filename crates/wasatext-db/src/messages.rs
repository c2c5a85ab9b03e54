use std::collections::HashSet;

use rusqlite::{Connection, params};
use wasatext_types::RequestContext;
use wasatext_types::models::{Message, MessageKind, MessageStatus, ReplySnapshot};

use crate::error::OptionalExt;
use crate::membership::ensure_participant;
use crate::models::{MESSAGE_COLUMNS, message_from_row};
use crate::{Database, DbError, DbResult, NewMessage, now_unix};

struct MessageInsert<'a> {
    conversation_id: i64,
    sender_id: i64,
    kind: MessageKind,
    content: &'a str,
    media: &'a [u8],
    forwarded: bool,
    reply_to: Option<&'a ReplySnapshot>,
}

impl Database {
    /// All messages of the conversation in storage order.
    ///
    /// Reading is a read receipt: every `sent` message from someone else is
    /// flipped to `read` in a single transaction, and the returned list shows
    /// the new status. If the update fails nothing is committed and the error
    /// is returned instead of the list.
    pub fn list_messages(&self, ctx: &RequestContext, conversation_id: i64) -> DbResult<Vec<Message>> {
        self.with_conn_mut(|conn| {
            ensure_participant(conn, ctx.user_id, conversation_id)?;
            let mut messages = query_messages(conn, conversation_id)?;

            let unread: HashSet<i64> = messages
                .iter()
                .filter(|m| m.sender.id != ctx.user_id && m.status == MessageStatus::Sent)
                .map(|m| m.id)
                .collect();
            if unread.is_empty() {
                return Ok(messages);
            }

            let tx = conn.transaction()?;
            {
                let mut mark = tx.prepare(
                    "UPDATE messages SET status = 'read' WHERE id = ?1 AND status = 'sent'",
                )?;
                for id in &unread {
                    mark.execute([id])?;
                }
            }
            tx.commit()?;

            for message in messages.iter_mut().filter(|m| unread.contains(&m.id)) {
                message.status = MessageStatus::Read;
            }
            Ok(messages)
        })
    }

    pub fn create_message(&self, ctx: &RequestContext, conversation_id: i64, msg: &NewMessage) -> DbResult<Message> {
        msg.validate()?;

        self.with_conn(|conn| {
            ensure_participant(conn, ctx.user_id, conversation_id)?;
            let id = insert_message(
                conn,
                &MessageInsert {
                    conversation_id,
                    sender_id: ctx.user_id,
                    kind: msg.kind,
                    content: &msg.content,
                    media: &msg.media,
                    forwarded: false,
                    reply_to: None,
                },
            )?;
            query_message(conn, id)
        })
    }

    /// Only the sender may delete; anything else reads as `NotFound`.
    pub fn delete_message(&self, ctx: &RequestContext, conversation_id: i64, message_id: i64) -> DbResult<()> {
        self.with_conn(|conn| {
            ensure_participant(conn, ctx.user_id, conversation_id)?;
            let deleted = conn.execute(
                "DELETE FROM messages WHERE id = ?1 AND conversation_id = ?2 AND sender_id = ?3",
                params![message_id, conversation_id, ctx.user_id],
            )?;
            if deleted == 0 {
                return Err(DbError::NotFound("message"));
            }
            Ok(())
        })
    }

    /// Copies a message into another conversation as a new, forwarded
    /// message. The source stays untouched and no link back is kept.
    pub fn forward_message(
        &self,
        ctx: &RequestContext,
        source_conversation_id: i64,
        message_id: i64,
        target_conversation_id: i64,
    ) -> DbResult<Message> {
        self.with_conn(|conn| {
            ensure_participant(conn, ctx.user_id, source_conversation_id)?;
            let original = query_message_in(conn, source_conversation_id, message_id)?;
            ensure_participant(conn, ctx.user_id, target_conversation_id)?;

            let id = insert_message(
                conn,
                &MessageInsert {
                    conversation_id: target_conversation_id,
                    sender_id: ctx.user_id,
                    kind: original.kind,
                    content: &original.content,
                    media: &original.media,
                    forwarded: true,
                    reply_to: None,
                },
            )?;
            query_message(conn, id)
        })
    }

    /// Posts a reply carrying a snapshot of the original's content and
    /// sender name as they are right now.
    pub fn reply_to_message(
        &self,
        ctx: &RequestContext,
        conversation_id: i64,
        original_id: i64,
        msg: &NewMessage,
    ) -> DbResult<Message> {
        msg.validate()?;

        self.with_conn(|conn| {
            ensure_participant(conn, ctx.user_id, conversation_id)?;
            let original = query_message_in(conn, conversation_id, original_id)?;
            let snapshot = ReplySnapshot {
                message_id: original.id,
                sender_username: original.sender.username,
                content: original.content,
            };

            let id = insert_message(
                conn,
                &MessageInsert {
                    conversation_id,
                    sender_id: ctx.user_id,
                    kind: msg.kind,
                    content: &msg.content,
                    media: &msg.media,
                    forwarded: false,
                    reply_to: Some(&snapshot),
                },
            )?;
            query_message(conn, id)
        })
    }
}

fn insert_message(conn: &Connection, m: &MessageInsert<'_>) -> DbResult<i64> {
    conn.execute(
        "INSERT INTO messages
            (conversation_id, sender_id, kind, content, media, timestamp, status, forwarded,
             reply_to_id, reply_sender, reply_content)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'sent', ?7, ?8, ?9, ?10)",
        params![
            m.conversation_id,
            m.sender_id,
            m.kind.as_str(),
            m.content,
            m.media,
            now_unix(),
            m.forwarded,
            m.reply_to.map(|r| r.message_id),
            m.reply_to.map(|r| r.sender_username.as_str()),
            m.reply_to.map(|r| r.content.as_str()),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn query_messages(conn: &Connection, conversation_id: i64) -> DbResult<Vec<Message>> {
    let sql = format!(
        "SELECT {MESSAGE_COLUMNS}
         FROM messages m
         JOIN users u ON u.id = m.sender_id
         WHERE m.conversation_id = ?1
         ORDER BY m.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([conversation_id], message_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_message(conn: &Connection, message_id: i64) -> DbResult<Message> {
    let sql = format!(
        "SELECT {MESSAGE_COLUMNS}
         FROM messages m
         JOIN users u ON u.id = m.sender_id
         WHERE m.id = ?1"
    );
    conn.query_row(&sql, [message_id], message_from_row)
        .optional()?
        .ok_or(DbError::NotFound("message"))
}

/// `NotFound` unless the message exists inside `conversation_id`.
fn query_message_in(conn: &Connection, conversation_id: i64, message_id: i64) -> DbResult<Message> {
    let message = query_message(conn, message_id)?;
    if message.conversation_id != conversation_id {
        return Err(DbError::NotFound("message"));
    }
    Ok(message)
}

/// Most recent message by timestamp, ties broken by id.
pub(crate) fn latest_message(conn: &Connection, conversation_id: i64) -> DbResult<Option<Message>> {
    let sql = format!(
        "SELECT {MESSAGE_COLUMNS}
         FROM messages m
         JOIN users u ON u.id = m.sender_id
         WHERE m.conversation_id = ?1
         ORDER BY m.timestamp DESC, m.id DESC
         LIMIT 1"
    );
    conn.query_row(&sql, [conversation_id], message_from_row)
        .optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NewConversation;
    use crate::test_support::{ctx, setup};

    fn private_setup() -> (Database, i64, i64, i64) {
        let (db, alice, bob) = setup();
        let conv = db
            .create_conversation(&ctx(alice), &NewConversation::private("bob"))
            .unwrap();
        (db, alice, bob, conv)
    }

    #[test]
    fn create_message_validates_type() {
        let (db, alice, _, conv) = private_setup();

        assert!(matches!(
            db.create_message(&ctx(alice), conv, &NewMessage::text("")),
            Err(DbError::InvalidInput(_))
        ));

        let text = db
            .create_message(&ctx(alice), conv, &NewMessage::text("hi"))
            .unwrap();
        assert_eq!(text.kind, MessageKind::Text);
        assert_eq!(text.status, MessageStatus::Sent);
        assert!(!text.forwarded);
        assert_eq!(text.sender.username, "alice");

        let media = db
            .create_message(&ctx(alice), conv, &NewMessage::media(vec![1, 2, 3], "look"))
            .unwrap();
        assert_eq!(media.media, vec![1, 2, 3]);
        assert_eq!(media.content, "look");
    }

    #[test]
    fn outsiders_cannot_post_or_read() {
        let (db, _, _, conv) = private_setup();
        let carol = db.login("carol").unwrap();

        assert!(matches!(
            db.create_message(&ctx(carol), conv, &NewMessage::text("hey")),
            Err(DbError::NotAuthorized(_))
        ));
        assert!(matches!(
            db.list_messages(&ctx(carol), conv),
            Err(DbError::NotAuthorized(_))
        ));
        assert!(matches!(
            db.list_messages(&ctx(carol), 77),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn listing_marks_others_messages_read() {
        let (db, alice, bob, conv) = private_setup();
        let sent = db
            .create_message(&ctx(alice), conv, &NewMessage::text("hi"))
            .unwrap();
        let reply = db
            .create_message(&ctx(bob), conv, &NewMessage::text("hello"))
            .unwrap();

        // the sender viewing does not mark their own message
        let seen_by_alice = db.list_messages(&ctx(alice), conv).unwrap();
        let own = seen_by_alice.iter().find(|m| m.id == sent.id).unwrap();
        assert_eq!(own.status, MessageStatus::Sent);
        let bobs = seen_by_alice.iter().find(|m| m.id == reply.id).unwrap();
        assert_eq!(bobs.status, MessageStatus::Read);

        let seen_by_bob = db.list_messages(&ctx(bob), conv).unwrap();
        assert!(seen_by_bob.iter().all(|m| m.status == MessageStatus::Read));

        // persisted, and never reverts
        let again = db.list_messages(&ctx(alice), conv).unwrap();
        assert!(again.iter().all(|m| m.status == MessageStatus::Read));
    }

    #[test]
    fn failed_read_receipt_marks_nothing() {
        let (db, alice, bob, conv) = private_setup();
        let first = db
            .create_message(&ctx(alice), conv, &NewMessage::text("one"))
            .unwrap();
        let second = db
            .create_message(&ctx(alice), conv, &NewMessage::text("two"))
            .unwrap();

        db.with_conn(|conn| {
            conn.execute_batch(&format!(
                "CREATE TRIGGER fail_read BEFORE UPDATE OF status ON messages
                 WHEN OLD.id = {}
                 BEGIN SELECT RAISE(ABORT, 'boom'); END;",
                second.id
            ))?;
            Ok(())
        })
        .unwrap();

        assert!(matches!(
            db.list_messages(&ctx(bob), conv),
            Err(DbError::Storage(_))
        ));

        let status: String = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT status FROM messages WHERE id = ?1",
                    [first.id],
                    |r| r.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(status, "sent");
    }

    #[test]
    fn messages_come_back_in_storage_order() {
        let (db, alice, bob, conv) = private_setup();
        for text in ["one", "two", "three"] {
            db.create_message(&ctx(alice), conv, &NewMessage::text(text))
                .unwrap();
        }
        let contents: Vec<String> = db
            .list_messages(&ctx(bob), conv)
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[test]
    fn only_sender_can_delete() {
        let (db, alice, bob, conv) = private_setup();
        let msg = db
            .create_message(&ctx(alice), conv, &NewMessage::text("mine"))
            .unwrap();

        assert!(matches!(
            db.delete_message(&ctx(bob), conv, msg.id),
            Err(DbError::NotFound(_))
        ));
        assert_eq!(db.list_messages(&ctx(alice), conv).unwrap().len(), 1);

        db.delete_message(&ctx(alice), conv, msg.id).unwrap();
        assert!(db.list_messages(&ctx(alice), conv).unwrap().is_empty());
        assert!(matches!(
            db.delete_message(&ctx(alice), conv, msg.id),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn forward_copies_into_target() {
        let (db, alice, _, conv) = private_setup();
        let group = db
            .create_conversation(&ctx(alice), &NewConversation::group("notes"))
            .unwrap();
        let original = db
            .create_message(&ctx(alice), conv, &NewMessage::media(vec![5, 6], "pic"))
            .unwrap();

        let forwarded = db
            .forward_message(&ctx(alice), conv, original.id, group)
            .unwrap();
        assert_ne!(forwarded.id, original.id);
        assert_eq!(forwarded.conversation_id, group);
        assert!(forwarded.forwarded);
        assert_eq!(forwarded.kind, original.kind);
        assert_eq!(forwarded.content, original.content);
        assert_eq!(forwarded.media, original.media);
        assert_eq!(forwarded.status, MessageStatus::Sent);

        let source = db.list_messages(&ctx(alice), conv).unwrap();
        assert_eq!(source, vec![original]);
    }

    #[test]
    fn forward_checks_both_sides() {
        let (db, alice, bob, conv) = private_setup();
        let group = db
            .create_conversation(&ctx(alice), &NewConversation::group("private notes"))
            .unwrap();
        let msg = db
            .create_message(&ctx(alice), conv, &NewMessage::text("fwd me"))
            .unwrap();

        // bob can read the source but is not in the target
        assert!(matches!(
            db.forward_message(&ctx(bob), conv, msg.id, group),
            Err(DbError::NotAuthorized(_))
        ));
        // message must live in the stated source conversation
        assert!(matches!(
            db.forward_message(&ctx(alice), group, msg.id, conv),
            Err(DbError::NotFound("message"))
        ));
    }

    #[test]
    fn reply_keeps_snapshot_of_original() {
        let (db, alice, bob, conv) = private_setup();
        let original = db
            .create_message(&ctx(alice), conv, &NewMessage::text("question?"))
            .unwrap();

        let reply = db
            .reply_to_message(&ctx(bob), conv, original.id, &NewMessage::text("answer"))
            .unwrap();
        let snapshot = reply.reply_to.clone().unwrap();
        assert_eq!(snapshot.message_id, original.id);
        assert_eq!(snapshot.sender_username, "alice");
        assert_eq!(snapshot.content, "question?");

        // deleting the original and renaming its sender leave the snapshot as is
        db.delete_message(&ctx(alice), conv, original.id).unwrap();
        db.edit_username(&ctx(alice), "alicia").unwrap();
        let listed = db.list_messages(&ctx(bob), conv).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].reply_to, Some(snapshot));
    }

    #[test]
    fn reply_target_must_be_in_conversation() {
        let (db, alice, _, conv) = private_setup();
        let group = db
            .create_conversation(&ctx(alice), &NewConversation::group("elsewhere"))
            .unwrap();
        let elsewhere = db
            .create_message(&ctx(alice), group, &NewMessage::text("not here"))
            .unwrap();

        assert!(matches!(
            db.reply_to_message(&ctx(alice), conv, elsewhere.id, &NewMessage::text("re")),
            Err(DbError::NotFound("message"))
        ));
        assert!(matches!(
            db.reply_to_message(&ctx(alice), conv, 404, &NewMessage::text("re")),
            Err(DbError::NotFound("message"))
        ));
        assert!(matches!(
            db.reply_to_message(&ctx(alice), group, elsewhere.id, &NewMessage::text("")),
            Err(DbError::InvalidInput(_))
        ));
    }

    #[test]
    fn login_to_read_receipt_scenario() {
        let db = Database::open_in_memory().unwrap();
        let alice = db.login("alice").unwrap();
        let bob = db.login("bob").unwrap();
        assert_eq!((alice, bob), (1, 2));

        let conv = db
            .create_conversation(&ctx(alice), &NewConversation::private("bob"))
            .unwrap();
        assert!(matches!(
            db.create_conversation(&ctx(alice), &NewConversation::private("bob")),
            Err(DbError::Conflict(_))
        ));

        let hi = db
            .create_message(&ctx(alice), conv, &NewMessage::text("hi"))
            .unwrap();
        assert_eq!(hi.status, MessageStatus::Sent);

        let seen = db.list_messages(&ctx(bob), conv).unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, hi.id);
        assert_eq!(seen[0].status, MessageStatus::Read);
    }
}
