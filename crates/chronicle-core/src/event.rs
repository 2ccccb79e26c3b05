//! Persisted domain events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

/// The durable, immutable record produced from a command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// The stream this event belongs to.
    pub aggregate: Aggregate,
    /// Identity of the user or service that issued the command.
    pub creator: String,
    /// Event type name.
    pub event_type: String,
    /// Serialized event payload, if any.
    pub payload: Option<serde_json::Value>,
    /// Position within the aggregate stream; contiguous, starting at 1.
    pub sequence: i64,
    /// Creation timestamp assigned by the storage backend at insert time.
    pub created_at: DateTime<Utc>,
}
