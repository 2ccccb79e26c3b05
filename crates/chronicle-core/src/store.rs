//! Event store abstraction.

use async_trait::async_trait;

use crate::command::Command;
use crate::error::EventStoreError;
use crate::event::Event;

/// Append-side contract of the event store.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Atomically appends one event per command, in input order.
    ///
    /// Either every command becomes a durable event and all uniqueness
    /// bookkeeping applies, or nothing is persisted. The returned events
    /// match the input order one-to-one, each carrying its assigned
    /// sequence and a backend-assigned creation timestamp. An empty batch
    /// is accepted trivially and returns an empty vec.
    ///
    /// # Errors
    ///
    /// Returns [`EventStoreError::UniqueViolation`] if a uniqueness rule
    /// rejects the batch, [`EventStoreError::MissingBaseline`] on an
    /// internal contract breach, and [`EventStoreError::Storage`] for
    /// backend failures.
    async fn push(&self, commands: &[Box<dyn Command>]) -> Result<Vec<Event>, EventStoreError>;
}
