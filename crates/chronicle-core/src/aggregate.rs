//! Aggregate stream references.

use serde::{Deserialize, Serialize};

/// Reference to the event stream a command appends to.
///
/// Supplied by the caller with every command and copied verbatim onto the
/// persisted event. Sequencing partitions on `(instance_id, aggregate_type,
/// aggregate_id)`; `resource_owner` and `version` travel with the event but
/// do not split the sequence space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    /// Instance the aggregate lives in.
    pub instance_id: String,
    /// Organization or tenant that owns the aggregate.
    pub resource_owner: String,
    /// Aggregate type name (e.g. `"user"`).
    pub aggregate_type: String,
    /// Identifier of the aggregate within its type.
    pub aggregate_id: String,
    /// Schema revision of the aggregate's event model.
    pub version: i16,
}

impl Aggregate {
    /// Creates an aggregate reference.
    #[must_use]
    pub fn new(
        instance_id: impl Into<String>,
        resource_owner: impl Into<String>,
        aggregate_type: impl Into<String>,
        aggregate_id: impl Into<String>,
        version: i16,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            resource_owner: resource_owner.into(),
            aggregate_type: aggregate_type.into(),
            aggregate_id: aggregate_id.into(),
            version,
        }
    }
}
