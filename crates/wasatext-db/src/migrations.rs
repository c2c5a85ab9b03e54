use rusqlite::Connection;
use tracing::info;

use crate::DbResult;

pub fn run(conn: &Connection) -> DbResult<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                username    TEXT NOT NULL UNIQUE,
                photo       BLOB
            );

            CREATE TABLE conversations (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                kind        TEXT NOT NULL CHECK (kind IN ('private', 'group')),
                name        TEXT,
                photo       BLOB,
                created_at  INTEGER NOT NULL
            );

            CREATE TABLE participants (
                user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                conversation_id INTEGER NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                PRIMARY KEY (user_id, conversation_id)
            );

            CREATE INDEX idx_participants_conversation
                ON participants(conversation_id);

            CREATE TABLE messages (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                sender_id       INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                kind            TEXT NOT NULL CHECK (kind IN ('text', 'media')),
                content         TEXT NOT NULL DEFAULT '',
                media           BLOB,
                timestamp       INTEGER NOT NULL,
                status          TEXT NOT NULL DEFAULT 'sent' CHECK (status IN ('sent', 'read')),
                forwarded       INTEGER NOT NULL DEFAULT 0,
                -- reply snapshot: copied values, no foreign key
                reply_to_id     INTEGER,
                reply_sender    TEXT,
                reply_content   TEXT
            );

            CREATE INDEX idx_messages_conversation
                ON messages(conversation_id, timestamp);

            CREATE TABLE comments (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id  INTEGER NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
                author_id   INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content     TEXT NOT NULL,
                timestamp   INTEGER NOT NULL
            );

            CREATE INDEX idx_comments_message
                ON comments(message_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rerunning_is_a_no_op() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }
}
