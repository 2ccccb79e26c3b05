//! Sequence baselines and per-stream sequence assignment.

use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use sqlx::{Postgres, Row as _, Transaction};

use chronicle_core::aggregate::Aggregate;
use chronicle_core::command::Command;
use chronicle_core::error::EventStoreError;
use chronicle_core::event::Event;

use crate::error::storage_error;

/// Identity of a sequence stream. Sequencing partitions on this triple;
/// `resource_owner` and `version` do not split the sequence space.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct StreamKey {
    instance_id: String,
    aggregate_type: String,
    aggregate_id: String,
}

impl StreamKey {
    pub(crate) fn of(aggregate: &Aggregate) -> Self {
        Self {
            instance_id: aggregate.instance_id.clone(),
            aggregate_type: aggregate.aggregate_type.clone(),
            aggregate_id: aggregate.aggregate_id.clone(),
        }
    }
}

/// An event with its sequence assigned but no creation timestamp yet.
#[derive(Debug, Clone)]
pub(crate) struct EventDraft {
    pub(crate) aggregate: Aggregate,
    pub(crate) creator: String,
    pub(crate) event_type: String,
    pub(crate) payload: Option<serde_json::Value>,
    pub(crate) sequence: i64,
}

impl EventDraft {
    pub(crate) fn into_event(self, created_at: DateTime<Utc>) -> Event {
        Event {
            aggregate: self.aggregate,
            creator: self.creator,
            event_type: self.event_type,
            payload: self.payload,
            sequence: self.sequence,
            created_at,
        }
    }
}

/// Fetches the highest stored sequence for every stream referenced by the
/// batch, locking each stream's latest row so concurrent writers on the
/// same streams serialize behind this transaction.
///
/// Every referenced stream gets an entry; streams with no stored events
/// baseline at 0.
pub(crate) async fn latest_sequences(
    tx: &mut Transaction<'_, Postgres>,
    commands: &[Box<dyn Command>],
) -> Result<HashMap<StreamKey, i64>, EventStoreError> {
    let mut baselines: HashMap<StreamKey, i64> = HashMap::new();
    for command in commands {
        baselines.entry(StreamKey::of(command.aggregate())).or_insert(0);
    }

    let streams: Vec<StreamKey> = baselines.keys().cloned().collect();
    let stmt = latest_sequences_statement(streams.len());
    let mut query = sqlx::query(&stmt);
    for stream in &streams {
        query = query
            .bind(&stream.instance_id)
            .bind(&stream.aggregate_type)
            .bind(&stream.aggregate_id);
    }

    let rows = query.fetch_all(&mut **tx).await.map_err(storage_error)?;
    for row in rows {
        let key = StreamKey {
            instance_id: row.try_get("instance_id").map_err(storage_error)?,
            aggregate_type: row.try_get("aggregate_type").map_err(storage_error)?,
            aggregate_id: row.try_get("aggregate_id").map_err(storage_error)?,
        };
        let sequence: i64 = row.try_get("sequence").map_err(storage_error)?;
        baselines.insert(key, sequence);
    }

    Ok(baselines)
}

fn latest_sequences_statement(streams: usize) -> String {
    let mut placeholders = String::new();
    for i in 0..streams {
        if i > 0 {
            placeholders.push_str(", ");
        }
        let base = i * 3;
        let _ = write!(placeholders, "(${}, ${}, ${})", base + 1, base + 2, base + 3);
    }
    format!(
        "SELECT instance_id, aggregate_type, aggregate_id, sequence FROM events \
         WHERE (instance_id, aggregate_type, aggregate_id, sequence) IN (\
         SELECT instance_id, aggregate_type, aggregate_id, MAX(sequence) FROM events \
         WHERE (instance_id, aggregate_type, aggregate_id) IN ({placeholders}) \
         GROUP BY instance_id, aggregate_type, aggregate_id) \
         FOR UPDATE"
    )
}

/// Assigns contiguous per-stream sequences to the batch, in input order.
///
/// Pure: the counters are owned by this call and seeded from `baselines`.
/// A command whose stream has no baseline entry is a contract breach by the
/// calling orchestration and aborts the whole push; it is never retried or
/// silently defaulted.
pub(crate) fn assign_sequences(
    mut baselines: HashMap<StreamKey, i64>,
    commands: &[Box<dyn Command>],
) -> Result<Vec<EventDraft>, EventStoreError> {
    let mut drafts = Vec::with_capacity(commands.len());
    for command in commands {
        let aggregate = command.aggregate();
        let Some(counter) = baselines.get_mut(&StreamKey::of(aggregate)) else {
            return Err(EventStoreError::MissingBaseline {
                instance_id: aggregate.instance_id.clone(),
                aggregate_type: aggregate.aggregate_type.clone(),
                aggregate_id: aggregate.aggregate_id.clone(),
            });
        };
        *counter += 1;

        drafts.push(EventDraft {
            aggregate: aggregate.clone(),
            creator: command.creator().to_owned(),
            event_type: command.event_type().to_owned(),
            payload: command.payload(),
            sequence: *counter,
        });
    }
    Ok(drafts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_test_support::TestCommand;

    fn aggregate(id: &str) -> Aggregate {
        Aggregate::new("instance-1", "org-1", "user", id, 1)
    }

    fn commands(aggregates: &[&Aggregate]) -> Vec<Box<dyn Command>> {
        aggregates
            .iter()
            .map(|agg| Box::new(TestCommand::new((*agg).clone(), "user.added")) as Box<dyn Command>)
            .collect()
    }

    fn baselines(entries: &[(&Aggregate, i64)]) -> HashMap<StreamKey, i64> {
        entries
            .iter()
            .map(|&(agg, seq)| (StreamKey::of(agg), seq))
            .collect()
    }

    #[test]
    fn test_sequences_start_after_baseline_and_are_contiguous() {
        let agg = aggregate("a");
        let drafts = assign_sequences(
            baselines(&[(&agg, 4)]),
            &commands(&[&agg, &agg, &agg]),
        )
        .unwrap();

        let sequences: Vec<i64> = drafts.iter().map(|d| d.sequence).collect();
        assert_eq!(sequences, vec![5, 6, 7]);
    }

    #[test]
    fn test_fresh_stream_starts_at_one() {
        let agg = aggregate("a");
        let drafts = assign_sequences(baselines(&[(&agg, 0)]), &commands(&[&agg, &agg])).unwrap();

        assert_eq!(drafts[0].sequence, 1);
        assert_eq!(drafts[1].sequence, 2);
    }

    #[test]
    fn test_interleaved_streams_are_assigned_independently() {
        let agg_a = aggregate("a");
        let agg_b = aggregate("b");
        let drafts = assign_sequences(
            baselines(&[(&agg_a, 2), (&agg_b, 0)]),
            &commands(&[&agg_a, &agg_b, &agg_a, &agg_a, &agg_b]),
        )
        .unwrap();

        let sequences: Vec<i64> = drafts.iter().map(|d| d.sequence).collect();
        assert_eq!(sequences, vec![3, 1, 4, 5, 2]);
    }

    #[test]
    fn test_output_order_matches_input_order() {
        let agg_a = aggregate("a");
        let agg_b = aggregate("b");
        let drafts = assign_sequences(
            baselines(&[(&agg_a, 0), (&agg_b, 0)]),
            &commands(&[&agg_b, &agg_a]),
        )
        .unwrap();

        assert_eq!(drafts[0].aggregate.aggregate_id, "b");
        assert_eq!(drafts[1].aggregate.aggregate_id, "a");
    }

    #[test]
    fn test_missing_baseline_is_a_fatal_contract_breach() {
        let covered = aggregate("a");
        let uncovered = aggregate("b");
        let result = assign_sequences(
            baselines(&[(&covered, 0)]),
            &commands(&[&covered, &uncovered]),
        );

        match result {
            Err(EventStoreError::MissingBaseline {
                instance_id,
                aggregate_type,
                aggregate_id,
            }) => {
                assert_eq!(instance_id, "instance-1");
                assert_eq!(aggregate_type, "user");
                assert_eq!(aggregate_id, "b");
            }
            other => panic!("expected MissingBaseline, got {other:?}"),
        }
    }

    #[test]
    fn test_version_and_owner_do_not_split_the_sequence_space() {
        let mut v1 = aggregate("a");
        let mut v2 = aggregate("a");
        v1.version = 1;
        v2.version = 2;
        v2.resource_owner = "org-2".to_owned();

        let drafts = assign_sequences(baselines(&[(&v1, 0)]), &commands(&[&v1, &v2])).unwrap();

        assert_eq!(drafts[0].sequence, 1);
        assert_eq!(drafts[1].sequence, 2);
    }

    #[test]
    fn test_latest_sequences_statement_shape() {
        assert_eq!(
            latest_sequences_statement(2),
            "SELECT instance_id, aggregate_type, aggregate_id, sequence FROM events \
             WHERE (instance_id, aggregate_type, aggregate_id, sequence) IN (\
             SELECT instance_id, aggregate_type, aggregate_id, MAX(sequence) FROM events \
             WHERE (instance_id, aggregate_type, aggregate_id) IN (($1, $2, $3), ($4, $5, $6)) \
             GROUP BY instance_id, aggregate_type, aggregate_id) \
             FOR UPDATE"
        );
    }
}
