//! In-memory `EventStore` — a database-free double with the same
//! observable push semantics as the `PostgreSQL` implementation.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use chronicle_core::aggregate::Aggregate;
use chronicle_core::command::{Command, UniqueConstraintAction};
use chronicle_core::error::EventStoreError;
use chronicle_core::event::Event;
use chronicle_core::store::EventStore;

type StreamKey = (String, String, String);
type Claim = (String, String, String);

/// An event store that keeps everything in memory. Sequences are
/// contiguous per stream, uniqueness rules are enforced, and a failing
/// batch leaves no trace — the same contract callers observe against the
/// real backend.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    events: Vec<Event>,
    claims: HashSet<Claim>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every pushed event, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }
}

fn stream_key(aggregate: &Aggregate) -> StreamKey {
    (
        aggregate.instance_id.clone(),
        aggregate.aggregate_type.clone(),
        aggregate.aggregate_id.clone(),
    )
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn push(&self, commands: &[Box<dyn Command>]) -> Result<Vec<Event>, EventStoreError> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }

        let mut state = self.state.lock().unwrap();

        let mut counters: HashMap<StreamKey, i64> = HashMap::new();
        for event in &state.events {
            let counter = counters.entry(stream_key(&event.aggregate)).or_insert(0);
            *counter = (*counter).max(event.sequence);
        }

        // Stage the whole batch before touching stored state, so a
        // uniqueness violation leaves nothing behind.
        let mut staged_events = Vec::with_capacity(commands.len());
        let mut staged_claims = state.claims.clone();

        for command in commands {
            let aggregate = command.aggregate();

            for constraint in command.unique_constraints() {
                let claim = (
                    aggregate.instance_id.clone(),
                    constraint.unique_type.clone(),
                    constraint.unique_field.clone(),
                );
                match constraint.action {
                    UniqueConstraintAction::Add => {
                        if !staged_claims.insert(claim) {
                            return Err(EventStoreError::UniqueViolation {
                                unique_type: constraint.unique_type,
                                unique_field: constraint.unique_field,
                            });
                        }
                    }
                    UniqueConstraintAction::Remove => {
                        staged_claims.remove(&claim);
                    }
                }
            }

            let counter = counters.entry(stream_key(aggregate)).or_insert(0);
            *counter += 1;

            staged_events.push(Event {
                aggregate: aggregate.clone(),
                creator: command.creator().to_owned(),
                event_type: command.event_type().to_owned(),
                payload: command.payload(),
                sequence: *counter,
                created_at: Utc::now(),
            });
        }

        state.events.extend(staged_events.iter().cloned());
        state.claims = staged_claims;

        Ok(staged_events)
    }
}
