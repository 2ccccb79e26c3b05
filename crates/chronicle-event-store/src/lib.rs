//! Chronicle Event Store — transactional append pipeline over `PostgreSQL`.
//!
//! A push runs as one atomic operation: fetch per-stream sequence baselines
//! (locking the streams' latest rows), assign contiguous sequences in
//! memory, insert the whole batch with a single multi-row statement that is
//! retried inside a savepoint on serialization conflicts, and apply domain
//! uniqueness bookkeeping before commit.

pub mod pg_event_store;
pub mod schema;

mod error;
mod push;
mod sequence;
mod unique_constraint;
