//! Transactional uniqueness bookkeeping.
//!
//! Events may claim or release domain-unique values (user names, domains).
//! Claims live in their own table and are written in the same transaction
//! as the events, so a conflicting batch aborts as a whole.

use sqlx::{Postgres, Transaction};

use chronicle_core::command::{Command, UniqueConstraint, UniqueConstraintAction};
use chronicle_core::error::EventStoreError;

use crate::error::{SQLSTATE_UNIQUE_VIOLATION, SqlState as _, storage_error};

const ADD_CONSTRAINT_STMT: &str =
    "INSERT INTO unique_constraints (instance_id, unique_type, unique_field) VALUES ($1, $2, $3)";

const REMOVE_CONSTRAINT_STMT: &str = "DELETE FROM unique_constraints \
     WHERE instance_id = $1 AND unique_type = $2 AND unique_field = $3";

/// Applies every command's uniqueness rules inside the push transaction.
///
/// One statement per constraint, so a violation identifies the offending
/// constraint exactly. A violation aborts the whole push; it is not
/// retried at this layer.
pub(crate) async fn handle_unique_constraints(
    tx: &mut Transaction<'_, Postgres>,
    commands: &[Box<dyn Command>],
) -> Result<(), EventStoreError> {
    for command in commands {
        let instance_id = &command.aggregate().instance_id;
        for constraint in command.unique_constraints() {
            let stmt = match constraint.action {
                UniqueConstraintAction::Add => ADD_CONSTRAINT_STMT,
                UniqueConstraintAction::Remove => REMOVE_CONSTRAINT_STMT,
            };
            sqlx::query(stmt)
                .bind(instance_id)
                .bind(&constraint.unique_type)
                .bind(&constraint.unique_field)
                .execute(&mut **tx)
                .await
                .map_err(|err| constraint_error(err, &constraint))?;
        }
    }
    Ok(())
}

fn constraint_error(err: sqlx::Error, constraint: &UniqueConstraint) -> EventStoreError {
    if err.sql_state().as_deref() == Some(SQLSTATE_UNIQUE_VIOLATION) {
        return EventStoreError::UniqueViolation {
            unique_type: constraint.unique_type.clone(),
            unique_field: constraint.unique_field.clone(),
        };
    }
    storage_error(err)
}
