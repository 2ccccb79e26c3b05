//! `PostgreSQL` implementation of the `EventStore` trait.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use chronicle_core::command::Command;
use chronicle_core::error::EventStoreError;
use chronicle_core::event::Event;
use chronicle_core::store::EventStore;

use crate::error::storage_error;
use crate::push::insert_events;
use crate::sequence::{assign_sequences, latest_sequences};
use crate::unique_constraint::handle_unique_constraints;

/// `PostgreSQL`-backed event store.
///
/// Each push owns one transaction for its whole lifetime. Concurrency
/// correctness is delegated to the backend: the baseline query locks each
/// referenced stream's latest row, and the events primary key rejects the
/// loser of any remaining race. No in-process locking is involved.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Creates a new `PgEventStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn push_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        commands: &[Box<dyn Command>],
    ) -> Result<Vec<Event>, EventStoreError> {
        let baselines = latest_sequences(tx, commands).await?;
        let drafts = assign_sequences(baselines, commands)?;
        let events = insert_events(tx, drafts).await?;
        handle_unique_constraints(tx, commands).await?;
        Ok(events)
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn push(&self, commands: &[Box<dyn Command>]) -> Result<Vec<Event>, EventStoreError> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        match Self::push_in_tx(&mut tx, commands).await {
            Ok(events) => {
                tx.commit().await.map_err(storage_error)?;
                Ok(events)
            }
            Err(err) => {
                // Surface the push failure, not the cleanup failure.
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::debug!(error = %rollback_err, "unable to roll back push transaction");
                }
                Err(err)
            }
        }
    }
}
