use rusqlite::{Connection, params};
use wasatext_types::RequestContext;
use wasatext_types::models::User;

use crate::error::{OptionalExt, is_unique_violation};
use crate::models::user_from_row;
use crate::{Database, DbError, DbResult};

impl Database {
    // -- Identity --

    /// Login-or-register: returns the id of `username`, creating the user on
    /// first sight. Format checks belong to the caller.
    pub fn login(&self, username: &str) -> DbResult<i64> {
        self.with_conn(|conn| {
            if let Some(user) = query_user_by_username(conn, username)? {
                return Ok(user.id);
            }
            conn.execute("INSERT INTO users (username) VALUES (?1)", [username])?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user(&self, user_id: i64) -> DbResult<User> {
        self.with_conn(|conn| query_user_by_id(conn, user_id)?.ok_or(DbError::NotFound("user")))
    }

    // -- Search --

    /// Case-insensitive substring search over usernames; an empty query
    /// lists everyone.
    pub fn search_users(&self, query: &str) -> DbResult<Vec<User>> {
        let pattern = format!("%{}%", escape_like(query.trim()));
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, photo FROM users
                 WHERE username LIKE ?1 ESCAPE '\\'
                 ORDER BY username",
            )?;
            let users = stmt
                .query_map([pattern], |row| user_from_row(row, 0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(users)
        })
    }

    // -- Profile --

    pub fn edit_username(&self, ctx: &RequestContext, username: &str) -> DbResult<()> {
        self.with_conn(|conn| {
            let taken: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 AND id != ?2)",
                params![username, ctx.user_id],
                |row| row.get(0),
            )?;
            if taken {
                return Err(DbError::Conflict("username already exists"));
            }

            let updated = conn
                .execute(
                    "UPDATE users SET username = ?1 WHERE id = ?2",
                    params![username, ctx.user_id],
                )
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        DbError::Conflict("username already exists")
                    } else {
                        e.into()
                    }
                })?;
            if updated == 0 {
                return Err(DbError::NotFound("user"));
            }
            Ok(())
        })
    }

    pub fn edit_profile_photo(&self, ctx: &RequestContext, photo: &[u8]) -> DbResult<()> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET photo = ?1 WHERE id = ?2",
                params![photo, ctx.user_id],
            )?;
            if updated == 0 {
                return Err(DbError::NotFound("user"));
            }
            Ok(())
        })
    }
}

pub(crate) fn query_user_by_id(conn: &Connection, id: i64) -> DbResult<Option<User>> {
    conn.query_row(
        "SELECT id, username, photo FROM users WHERE id = ?1",
        [id],
        |row| user_from_row(row, 0),
    )
    .optional()
}

pub(crate) fn query_user_by_username(conn: &Connection, username: &str) -> DbResult<Option<User>> {
    conn.query_row(
        "SELECT id, username, photo FROM users WHERE username = ?1",
        [username],
        |row| user_from_row(row, 0),
    )
    .optional()
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
