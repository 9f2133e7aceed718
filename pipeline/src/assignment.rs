use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::granularity::Granularity;
use crate::record::{AssignmentAction, EventRecord};
use crate::series::Series;

/// Net number of entities assigned to `actor_id` that were alive during
/// `[window_start, window_end]`.
///
/// Counts assignments minus unassignments recorded by `window_end`, among
/// entities created by `window_end` and not closed before `window_start`.
/// The result is negative when the log holds an unassignment without its
/// matching assignment; that is passed through rather than clamped.
pub fn assignments_in_window(
    events: &[EventRecord],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    actor_id: &str,
) -> i64 {
    let net = net_assignments(events, window_start, window_end, actor_id);
    if net < 0 {
        warn!(
            actor_id,
            %window_start,
            %window_end,
            net,
            "negative assignment count; the log has unassignments without matching assignments"
        );
    }
    net
}

fn net_assignments(
    events: &[EventRecord],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    actor_id: &str,
) -> i64 {
    let mut assigned = 0i64;
    let mut unassigned = 0i64;

    let in_scope = events
        .iter()
        .filter(|e| e.actor_id.as_deref() == Some(actor_id))
        .filter(|e| e.created_at <= window_end)
        .filter(|e| e.closed_at.is_none_or(|closed| closed > window_start));

    for event in in_scope {
        let Some(assignment) = event.assignment else {
            continue;
        };
        if assignment.at > window_end {
            continue;
        }
        match assignment.action {
            AssignmentAction::Assigned => assigned += 1,
            AssignmentAction::Unassigned => unassigned += 1,
        }
    }

    assigned - unassigned
}

/// Per-bucket assignment census for one actor, from the bucket of their
/// first record through the bucket of their last assignment action.
///
/// Each bucket is evaluated over `[start, next_start)`. Negative buckets
/// are kept and reported with a single warning for the whole series.
pub fn assignment_series(
    events: &[EventRecord],
    granularity: Granularity,
    actor_id: &str,
) -> Series {
    let mut series = Series::new(granularity);

    let actor_events: Vec<&EventRecord> = events
        .iter()
        .filter(|e| e.actor_id.as_deref() == Some(actor_id))
        .collect();
    let Some(first) = actor_events.iter().map(|e| e.created_at).min() else {
        return series;
    };
    let last = actor_events
        .iter()
        .filter_map(|e| e.assignment.map(|a| a.at))
        .max()
        .unwrap_or(first)
        .max(first);

    let mut negative = Vec::new();
    for start in granularity.buckets_between(first, last) {
        let Some(next) = granularity.next_bucket(start) else {
            break;
        };
        let end = next - Duration::nanoseconds(1);
        let net = net_assignments(events, start, end, actor_id);
        if net < 0 {
            debug!(actor_id, bucket = %start, net, "negative assignment bucket");
            negative.push(start);
        }
        series.push(start, net);
    }

    if let Some(first_negative) = negative.first() {
        warn!(
            actor_id,
            %granularity,
            buckets = negative.len(),
            first = %first_negative,
            "negative assignment counts; the log has unassignments without matching assignments"
        );
    }
    series
}
