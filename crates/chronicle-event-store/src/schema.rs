//! Event store database schema.

/// SQL to create the events table.
///
/// `created_at` is assigned by the backend at insert time so concurrent
/// writers get a consistent wall-clock ordering. The primary key rejects a
/// concurrent writer that assigned the same sequence from a stale baseline.
pub const CREATE_EVENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS events (
    instance_id       TEXT NOT NULL,
    resource_owner    TEXT NOT NULL,
    aggregate_type    TEXT NOT NULL,
    aggregate_id      TEXT NOT NULL,
    aggregate_version SMALLINT NOT NULL,
    creator           TEXT NOT NULL,
    event_type        TEXT NOT NULL,
    payload           JSONB,
    sequence          BIGINT NOT NULL,
    created_at        TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
    PRIMARY KEY (instance_id, aggregate_type, aggregate_id, sequence)
);

CREATE INDEX IF NOT EXISTS idx_events_resource_owner
    ON events (instance_id, resource_owner);
";

/// SQL to create the unique constraints table.
pub const CREATE_UNIQUE_CONSTRAINTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS unique_constraints (
    instance_id  TEXT NOT NULL,
    unique_type  TEXT NOT NULL,
    unique_field TEXT NOT NULL,
    PRIMARY KEY (instance_id, unique_type, unique_field)
);
";
