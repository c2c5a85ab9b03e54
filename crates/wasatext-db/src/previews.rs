use rusqlite::{Connection, params};
use wasatext_types::RequestContext;
use wasatext_types::models::{ConversationKind, Preview, User};

use crate::error::OptionalExt;
use crate::messages::latest_message;
use crate::models::{parse_column, user_from_row};
use crate::users::query_user_by_id;
use crate::{Database, DbError, DbResult};

struct ConversationRow {
    id: i64,
    kind: ConversationKind,
    name: Option<String>,
    photo: Option<Vec<u8>>,
    created_at: i64,
}

impl Database {
    /// One preview per conversation the caller participates in, most
    /// recently active first. A group shows its own name and photo, a private
    /// conversation the peer's.
    pub fn list_previews(&self, ctx: &RequestContext) -> DbResult<Vec<Preview>> {
        self.with_conn(|conn| {
            if query_user_by_id(conn, ctx.user_id)?.is_none() {
                return Err(DbError::NotFound("user"));
            }

            let mut stmt = conn.prepare(
                "SELECT c.id, c.kind, c.name, c.photo, c.created_at
                 FROM conversations c
                 JOIN participants p ON p.conversation_id = c.id
                 WHERE p.user_id = ?1",
            )?;
            let rows = stmt
                .query_map([ctx.user_id], |row| {
                    Ok(ConversationRow {
                        id: row.get(0)?,
                        kind: parse_column(row, 1)?,
                        name: row.get(2)?,
                        photo: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let mut previews = Vec::with_capacity(rows.len());
            for row in rows {
                let (name, photo) = match row.kind {
                    ConversationKind::Group => (row.name.unwrap_or_default(), row.photo),
                    ConversationKind::Private => match query_peer(conn, row.id, ctx.user_id)? {
                        Some(peer) => (peer.username, peer.photo),
                        None => (String::new(), None),
                    },
                };
                let latest = latest_message(conn, row.id)?;
                let activity = latest.as_ref().map_or(row.created_at, |m| m.timestamp);

                previews.push((
                    activity,
                    Preview {
                        conversation_id: row.id,
                        kind: row.kind,
                        name,
                        photo,
                        latest_message: latest,
                    },
                ));
            }

            previews.sort_by(|(a_time, a), (b_time, b)| {
                b_time
                    .cmp(a_time)
                    .then(b.conversation_id.cmp(&a.conversation_id))
            });
            Ok(previews.into_iter().map(|(_, preview)| preview).collect())
        })
    }
}

fn query_peer(conn: &Connection, conversation_id: i64, user_id: i64) -> DbResult<Option<User>> {
    conn.query_row(
        "SELECT u.id, u.username, u.photo
         FROM participants p
         JOIN users u ON u.id = p.user_id
         WHERE p.conversation_id = ?1 AND p.user_id != ?2
         LIMIT 1",
        params![conversation_id, user_id],
        |row| user_from_row(row, 0),
    )
    .optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ctx, setup};
    use crate::{NewConversation, NewMessage};

    #[test]
    fn private_preview_shows_the_peer() {
        let (db, alice, bob) = setup();
        db.edit_profile_photo(&ctx(bob), &[1, 1]).unwrap();
        let conv = db
            .create_conversation(&ctx(alice), &NewConversation::private("bob"))
            .unwrap();

        let alice_view = db.list_previews(&ctx(alice)).unwrap();
        assert_eq!(alice_view.len(), 1);
        assert_eq!(alice_view[0].conversation_id, conv);
        assert_eq!(alice_view[0].kind, ConversationKind::Private);
        assert_eq!(alice_view[0].name, "bob");
        assert_eq!(alice_view[0].photo, Some(vec![1, 1]));
        assert!(alice_view[0].latest_message.is_none());

        let bob_view = db.list_previews(&ctx(bob)).unwrap();
        assert_eq!(bob_view[0].name, "alice");
        assert_eq!(bob_view[0].photo, None);
    }

    #[test]
    fn preview_carries_latest_message() {
        let (db, alice, bob) = setup();
        let conv = db
            .create_conversation(&ctx(alice), &NewConversation::private("bob"))
            .unwrap();
        db.create_message(&ctx(alice), conv, &NewMessage::text("first"))
            .unwrap();
        let last = db
            .create_message(&ctx(bob), conv, &NewMessage::text("second"))
            .unwrap();

        let previews = db.list_previews(&ctx(alice)).unwrap();
        let latest = previews[0].latest_message.as_ref().unwrap();
        assert_eq!(latest.id, last.id);
        assert_eq!(latest.sender.username, "bob");
    }

    #[test]
    fn previews_only_cover_own_conversations() {
        let (db, alice, bob) = setup();
        let carol = db.login("carol").unwrap();
        db.create_conversation(&ctx(alice), &NewConversation::private("bob"))
            .unwrap();
        let group = db
            .create_conversation(&ctx(carol), &NewConversation::group("carols"))
            .unwrap();

        assert_eq!(db.list_previews(&ctx(bob)).unwrap().len(), 1);
        let carols = db.list_previews(&ctx(carol)).unwrap();
        assert_eq!(carols.len(), 1);
        assert_eq!(carols[0].conversation_id, group);
        assert_eq!(carols[0].name, "carols");
        assert_eq!(carols[0].kind, ConversationKind::Group);
    }

    #[test]
    fn unknown_user_has_no_previews() {
        let (db, _, _) = setup();
        assert!(matches!(
            db.list_previews(&ctx(1234)),
            Err(DbError::NotFound("user"))
        ));
    }
}
