//! Batched event insertion with savepoint-scoped retry.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use sqlx::{Acquire as _, Postgres, Row as _, Transaction};

use chronicle_core::error::EventStoreError;
use chronicle_core::event::Event;

use crate::error::{SqlState, is_retryable, storage_error};
use crate::sequence::EventDraft;

/// Columns bound per event in the push statement.
const COLUMNS_PER_EVENT: usize = 9;

/// Upper bound on attempts of the push statement within one transaction.
const MAX_PUSH_ATTEMPTS: usize = 5;

/// Inserts the whole batch with one multi-row statement and scans the
/// backend-assigned creation timestamps into the drafts positionally.
///
/// The statement executes inside a savepoint. A serialization conflict
/// rolls back to the savepoint, keeping the outer transaction (and the
/// baseline locks it holds) alive, and re-executes the identical statement.
/// Sequences are not re-assigned on retry: a genuine sequence collision
/// with a concurrent writer surfaces as a primary-key violation, which is
/// not retryable and fails this transaction outright.
pub(crate) async fn insert_events(
    tx: &mut Transaction<'_, Postgres>,
    drafts: Vec<EventDraft>,
) -> Result<Vec<Event>, EventStoreError> {
    let stmt = push_statement(drafts.len());

    let mut attempt = 0;
    let rows = loop {
        attempt += 1;

        let mut savepoint = tx.begin().await.map_err(storage_error)?;

        let mut query = sqlx::query(&stmt);
        for draft in &drafts {
            query = query
                .bind(&draft.aggregate.instance_id)
                .bind(&draft.aggregate.resource_owner)
                .bind(&draft.aggregate.aggregate_type)
                .bind(&draft.aggregate.aggregate_id)
                .bind(draft.aggregate.version)
                .bind(&draft.creator)
                .bind(&draft.event_type)
                .bind(&draft.payload)
                .bind(draft.sequence);
        }

        match query.fetch_all(&mut *savepoint).await {
            Ok(rows) => {
                savepoint.commit().await.map_err(storage_error)?;
                break rows;
            }
            Err(err) if should_retry(attempt, &err) => {
                tracing::debug!(error = %err, attempt, "retrying event insert");
                if let Err(rollback_err) = savepoint.rollback().await {
                    tracing::debug!(error = %rollback_err, "savepoint rollback failed");
                }
            }
            Err(err) => return Err(storage_error(err)),
        }
    };

    if rows.len() != drafts.len() {
        return Err(EventStoreError::Storage(format!(
            "push statement returned {} rows for {} events",
            rows.len(),
            drafts.len()
        )));
    }

    let mut events = Vec::with_capacity(drafts.len());
    for (draft, row) in drafts.into_iter().zip(rows) {
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(storage_error)?;
        events.push(draft.into_event(created_at));
    }

    Ok(events)
}

fn should_retry(attempt: usize, err: &impl SqlState) -> bool {
    attempt < MAX_PUSH_ATTEMPTS && is_retryable(err)
}

fn push_statement(events: usize) -> String {
    let mut values = String::new();
    for i in 0..events {
        if i > 0 {
            values.push_str(", ");
        }
        let base = i * COLUMNS_PER_EVENT;
        let _ = write!(
            values,
            "(${}, ${}, ${}, ${}, ${}, ${}, ${}, ${}, ${})",
            base + 1,
            base + 2,
            base + 3,
            base + 4,
            base + 5,
            base + 6,
            base + 7,
            base + 8,
            base + 9,
        );
    }
    format!(
        "INSERT INTO events (instance_id, resource_owner, aggregate_type, aggregate_id, \
         aggregate_version, creator, event_type, payload, sequence) VALUES {values} \
         RETURNING created_at"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSqlState(Option<&'static str>);

    impl SqlState for FakeSqlState {
        fn sql_state(&self) -> Option<String> {
            self.0.map(str::to_owned)
        }
    }

    #[test]
    fn test_push_statement_single_event() {
        assert_eq!(
            push_statement(1),
            "INSERT INTO events (instance_id, resource_owner, aggregate_type, aggregate_id, \
             aggregate_version, creator, event_type, payload, sequence) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING created_at"
        );
    }

    #[test]
    fn test_push_statement_numbers_placeholders_across_rows() {
        let stmt = push_statement(3);
        assert!(stmt.contains("($10, $11, $12, $13, $14, $15, $16, $17, $18)"));
        assert!(stmt.contains("($19, $20, $21, $22, $23, $24, $25, $26, $27)"));
        assert!(stmt.ends_with("RETURNING created_at"));
    }

    #[test]
    fn test_retryable_conflict_is_retried_until_the_attempt_bound() {
        let conflict = FakeSqlState(Some("40001"));
        for attempt in 1..MAX_PUSH_ATTEMPTS {
            assert!(should_retry(attempt, &conflict), "attempt {attempt}");
        }
        assert!(!should_retry(MAX_PUSH_ATTEMPTS, &conflict));
    }

    #[test]
    fn test_non_retryable_failure_stops_on_first_attempt() {
        assert!(!should_retry(1, &FakeSqlState(Some("23505"))));
        assert!(!should_retry(1, &FakeSqlState(None)));
    }
}
