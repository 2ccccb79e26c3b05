//! Command abstractions.

use crate::aggregate::Aggregate;

/// Trait that all append commands implement.
///
/// A command is a caller's request to append exactly one event to an
/// aggregate stream. The payload arrives already serialized; Chronicle
/// treats it as opaque.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The stream this command appends to.
    fn aggregate(&self) -> &Aggregate;

    /// Identity of the user or service issuing the command.
    fn creator(&self) -> &str;

    /// The event type name (used for routing on the read side).
    fn event_type(&self) -> &str;

    /// The serialized event payload, if the event carries one.
    fn payload(&self) -> Option<serde_json::Value>;

    /// Domain uniqueness bookkeeping this event carries, applied in the
    /// same transaction as the append.
    fn unique_constraints(&self) -> Vec<UniqueConstraint>;
}

/// A single domain uniqueness rule carried by a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueConstraint {
    /// Namespace of the rule (e.g. `"user_names"`).
    pub unique_type: String,
    /// The value that must be unique within the namespace.
    pub unique_field: String,
    /// Whether the value is being claimed or released.
    pub action: UniqueConstraintAction,
}

/// What a [`UniqueConstraint`] does to its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueConstraintAction {
    /// Claim the value; fails if another aggregate holds it.
    Add,
    /// Release a previously claimed value.
    Remove,
}

impl UniqueConstraint {
    /// A constraint claiming `unique_field` within `unique_type`.
    #[must_use]
    pub fn new_add(unique_type: impl Into<String>, unique_field: impl Into<String>) -> Self {
        Self {
            unique_type: unique_type.into(),
            unique_field: unique_field.into(),
            action: UniqueConstraintAction::Add,
        }
    }

    /// A constraint releasing `unique_field` within `unique_type`.
    #[must_use]
    pub fn new_remove(unique_type: impl Into<String>, unique_field: impl Into<String>) -> Self {
        Self {
            unique_type: unique_type.into(),
            unique_field: unique_field.into(),
            action: UniqueConstraintAction::Remove,
        }
    }
}
