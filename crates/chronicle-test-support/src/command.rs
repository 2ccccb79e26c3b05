//! Test commands — configurable `Command` implementations.

use uuid::Uuid;

use chronicle_core::aggregate::Aggregate;
use chronicle_core::command::{Command, UniqueConstraint};

/// An append command with every field configurable.
#[derive(Debug, Clone)]
pub struct TestCommand {
    aggregate: Aggregate,
    creator: String,
    event_type: String,
    payload: Option<serde_json::Value>,
    unique_constraints: Vec<UniqueConstraint>,
}

impl TestCommand {
    /// Creates a command appending `event_type` to `aggregate` with no
    /// payload and no uniqueness rules.
    #[must_use]
    pub fn new(aggregate: Aggregate, event_type: impl Into<String>) -> Self {
        Self {
            aggregate,
            creator: "test-user".to_owned(),
            event_type: event_type.into(),
            payload: None,
            unique_constraints: Vec::new(),
        }
    }

    /// Sets the serialized event payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sets the creator identity.
    #[must_use]
    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = creator.into();
        self
    }

    /// Adds a uniqueness rule to the command.
    #[must_use]
    pub fn with_unique_constraint(mut self, constraint: UniqueConstraint) -> Self {
        self.unique_constraints.push(constraint);
        self
    }

    /// Boxes the command for a push batch.
    #[must_use]
    pub fn boxed(self) -> Box<dyn Command> {
        Box::new(self)
    }
}

impl Command for TestCommand {
    fn aggregate(&self) -> &Aggregate {
        &self.aggregate
    }

    fn creator(&self) -> &str {
        &self.creator
    }

    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn payload(&self) -> Option<serde_json::Value> {
        self.payload.clone()
    }

    fn unique_constraints(&self) -> Vec<UniqueConstraint> {
        self.unique_constraints.clone()
    }
}

/// An aggregate reference with a freshly generated id, so tests never
/// collide on streams.
#[must_use]
pub fn fresh_aggregate(instance_id: &str, aggregate_type: &str) -> Aggregate {
    Aggregate::new(
        instance_id,
        "test-org",
        aggregate_type,
        Uuid::new_v4().to_string(),
        1,
    )
}
