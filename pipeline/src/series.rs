use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::granularity::Granularity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub bucket_start: DateTime<Utc>,
    pub value: i64,
}

/// Bucketed values in ascending `bucket_start` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Series {
    pub granularity: Granularity,
    pub points: Vec<SeriesPoint>,
}

impl Series {
    pub fn new(granularity: Granularity) -> Self {
        Series {
            granularity,
            points: Vec::new(),
        }
    }

    pub fn push(&mut self, bucket_start: DateTime<Utc>, value: i64) {
        self.points.push(SeriesPoint {
            bucket_start,
            value,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn total(&self) -> i64 {
        self.points.iter().map(|p| p.value).sum()
    }

    pub fn values(&self) -> Vec<i64> {
        self.points.iter().map(|p| p.value).collect()
    }
}
