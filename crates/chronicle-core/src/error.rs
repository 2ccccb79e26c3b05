//! Event store error types.

use thiserror::Error;

/// Top-level error type for append operations.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// A command referenced an aggregate that the sequence baseline fetch
    /// did not cover. This is a contract breach between the push phases,
    /// never a data-driven or transient failure; it aborts the whole push
    /// immediately and is never retried.
    #[error(
        "no sequence baseline for aggregate {aggregate_type}/{aggregate_id} in instance {instance_id}"
    )]
    MissingBaseline {
        /// Instance of the uncovered aggregate.
        instance_id: String,
        /// Type of the uncovered aggregate.
        aggregate_type: String,
        /// Identifier of the uncovered aggregate.
        aggregate_id: String,
    },

    /// A domain uniqueness rule rejected the batch.
    #[error("unique constraint violated: {unique_field} already taken in {unique_type}")]
    UniqueViolation {
        /// Namespace of the violated rule.
        unique_type: String,
        /// The value that was already claimed.
        unique_field: String,
    },

    /// An infrastructure/persistence error.
    #[error("storage error: {0}")]
    Storage(String),
}
