use thiserror::Error;

/// Outcome classes of every store operation.
///
/// Callers branch on the variant; the messages are for logs only.
#[derive(Debug, Error)]
pub enum DbError {
    /// Missing, malformed or mutually inconsistent fields.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Not a participant, not the owner, or a group-only operation on a
    /// private conversation.
    #[error("not authorized: {0}")]
    NotAuthorized(&'static str),

    #[error("conflict: {0}")]
    Conflict(&'static str),

    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("storage failure: connection lock poisoned: {0}")]
    LockPoisoned(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// True when the statement failed on a UNIQUE or PRIMARY KEY constraint.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> DbResult<Option<T>>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> DbResult<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
