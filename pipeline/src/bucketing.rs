use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};

use crate::granularity::Granularity;
use crate::record::EventRecord;
use crate::series::Series;

/// Which timestamp of a record places it in a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampField {
    Created,
    Closed,
    ActionAt,
}

impl TimestampField {
    pub fn of(self, record: &EventRecord) -> Option<DateTime<Utc>> {
        match self {
            TimestampField::Created => Some(record.created_at),
            TimestampField::Closed => record.closed_at,
            TimestampField::ActionAt => record.assignment.map(|a| a.at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyField {
    Entity,
    Actor,
}

impl KeyField {
    pub fn of(self, record: &EventRecord) -> Option<&str> {
        match self {
            KeyField::Entity => record.entity_id.as_deref(),
            KeyField::Actor => record.actor_id.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Count,
    /// Distinct non-null values of the key per bucket.
    DistinctCount(KeyField),
}

/// Groups records by the bucket their `field` falls into.
///
/// Records without a value for `field` are skipped. Within a bucket, records
/// keep their ascending timestamp order, ties in input order.
pub fn bucket_events<'a>(
    events: &'a [EventRecord],
    granularity: Granularity,
    field: TimestampField,
) -> Vec<(DateTime<Utc>, Vec<&'a EventRecord>)> {
    let mut stamped: Vec<(DateTime<Utc>, &EventRecord)> = events
        .iter()
        .filter_map(|e| field.of(e).map(|ts| (ts, e)))
        .collect();
    stamped.sort_by_key(|(ts, _)| *ts);

    let mut buckets: BTreeMap<DateTime<Utc>, Vec<&EventRecord>> = BTreeMap::new();
    for (ts, event) in stamped {
        buckets
            .entry(granularity.bucket_start(ts))
            .or_default()
            .push(event);
    }
    buckets.into_iter().collect()
}

pub fn aggregate_count(
    granularity: Granularity,
    buckets: &[(DateTime<Utc>, Vec<&EventRecord>)],
) -> Series {
    let mut series = Series::new(granularity);
    for (ts, events) in buckets {
        series.push(*ts, events.len() as i64);
    }
    series
}

pub fn aggregate_distinct(
    granularity: Granularity,
    buckets: &[(DateTime<Utc>, Vec<&EventRecord>)],
    key: KeyField,
) -> Series {
    let mut series = Series::new(granularity);
    for (ts, events) in buckets {
        let distinct: HashSet<&str> = events.iter().filter_map(|e| key.of(e)).collect();
        series.push(*ts, distinct.len() as i64);
    }
    series
}

/// Sparse bucketed series: only buckets holding at least one record appear.
pub fn bucket_series(
    events: &[EventRecord],
    granularity: Granularity,
    field: TimestampField,
    reduction: Reduction,
) -> Series {
    let buckets = bucket_events(events, granularity, field);
    match reduction {
        Reduction::Count => aggregate_count(granularity, &buckets),
        Reduction::DistinctCount(key) => aggregate_distinct(granularity, &buckets, key),
    }
}
