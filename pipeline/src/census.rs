//! Counting entities that are open at a given instant.

use chrono::{DateTime, Utc};

use crate::granularity::Granularity;
use crate::record::EventRecord;
use crate::series::Series;

/// Created at or before `instant` and not closed at or before it.
pub fn is_open_at(record: &EventRecord, instant: DateTime<Utc>) -> bool {
    record.created_at <= instant && record.closed_at.is_none_or(|closed| closed > instant)
}

pub fn open_count_at(events: &[EventRecord], instant: DateTime<Utc>) -> u64 {
    events.iter().filter(|e| is_open_at(e, instant)).count() as u64
}

/// Open counts sampled at every bucket boundary from the bucket holding the
/// first creation up to the first boundary after the last recorded event.
///
/// Computed as a single sweep over sorted open/close instants; each point
/// equals `open_count_at` at its `bucket_start`.
pub fn open_count_series(events: &[EventRecord], granularity: Granularity) -> Series {
    let mut series = Series::new(granularity);

    let mut opened: Vec<DateTime<Utc>> = events.iter().map(|e| e.created_at).collect();
    // A record stops counting once both its creation and its close are behind
    // the instant, which keeps the sweep exact even if closed < created.
    let mut closed: Vec<DateTime<Utc>> = events
        .iter()
        .filter_map(|e| e.closed_at.map(|c| c.max(e.created_at)))
        .collect();
    opened.sort_unstable();
    closed.sort_unstable();

    let (Some(&first), Some(&last_opened)) = (opened.first(), opened.last()) else {
        return series;
    };
    let last = closed.last().map_or(last_opened, |&c| c.max(last_opened));
    let Some(end) = granularity.next_bucket(granularity.bucket_start(last)) else {
        return series;
    };

    let (mut opened_idx, mut closed_idx) = (0, 0);
    for boundary in granularity.buckets_between(first, end) {
        while opened_idx < opened.len() && opened[opened_idx] <= boundary {
            opened_idx += 1;
        }
        while closed_idx < closed.len() && closed[closed_idx] <= boundary {
            closed_idx += 1;
        }
        series.push(boundary, (opened_idx - closed_idx) as i64);
    }
    series
}
