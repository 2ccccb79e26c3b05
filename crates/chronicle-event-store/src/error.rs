//! SQLSTATE-based classification of backend errors.

use chronicle_core::error::EventStoreError;

/// Standard SQLSTATE reported when two concurrent transactions cannot both
/// be serialized consistently.
const SQLSTATE_SERIALIZATION_FAILURE: &str = "40001";

/// Legacy `CockroachDB` "retriable transaction" code. The server-side
/// extension has been removed, but older backends still emit it.
const SQLSTATE_RETRIABLE_TRANSACTION: &str = "CR000";

/// SQLSTATE reported when an insert violates a unique constraint.
pub(crate) const SQLSTATE_UNIQUE_VIOLATION: &str = "23505";

/// Capability of errors that carry a structured SQLSTATE code.
///
/// Classification depends only on this capability, not on a concrete
/// driver error type.
pub(crate) trait SqlState {
    /// The five-character SQLSTATE code, if one is attached.
    fn sql_state(&self) -> Option<String>;
}

impl SqlState for sqlx::Error {
    fn sql_state(&self) -> Option<String> {
        match self {
            sqlx::Error::Database(db_err) => db_err.code().map(|code| code.into_owned()),
            _ => None,
        }
    }
}

/// Whether the backend reported a conflict that re-executing the failed
/// statement inside the same transaction can resolve.
pub(crate) fn is_retryable(err: &impl SqlState) -> bool {
    matches!(
        err.sql_state().as_deref(),
        Some(SQLSTATE_SERIALIZATION_FAILURE | SQLSTATE_RETRIABLE_TRANSACTION)
    )
}

/// Maps a backend failure onto the caller-facing storage error.
pub(crate) fn storage_error(err: sqlx::Error) -> EventStoreError {
    EventStoreError::Storage(err.to_string())
}
