use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Months, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Calendar bucket width. Buckets are aligned in UTC; weeks start on Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
    Year,
}

impl Granularity {
    pub const ALL: [Granularity; 4] = [
        Granularity::Day,
        Granularity::Week,
        Granularity::Month,
        Granularity::Year,
    ];

    /// Resolves the dashboard's interval selector (`D`, `W`, `M`, `Y`, or the
    /// spelled-out name). Returns `None` for anything else.
    pub fn from_selector(selector: &str) -> Option<Self> {
        match selector.trim().to_ascii_lowercase().as_str() {
            "d" | "day" => Some(Granularity::Day),
            "w" | "week" => Some(Granularity::Week),
            "m" | "month" => Some(Granularity::Month),
            "y" | "year" => Some(Granularity::Year),
            _ => None,
        }
    }

    pub fn selector(self) -> &'static str {
        match self {
            Granularity::Day => "D",
            Granularity::Week => "W",
            Granularity::Month => "M",
            Granularity::Year => "Y",
        }
    }

    /// Truncates `ts` to the start of its bucket.
    pub fn bucket_start(self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let date = ts.date_naive();
        let start = match self {
            Granularity::Day => date,
            Granularity::Week => date - Days::new(u64::from(date.weekday().num_days_from_monday())),
            Granularity::Month => date - Days::new(u64::from(date.day0())),
            Granularity::Year => date - Days::new(u64::from(date.ordinal0())),
        };
        start.and_time(NaiveTime::MIN).and_utc()
    }

    /// Start of the bucket following the one that begins at `start`.
    /// `None` only past the end of the representable calendar.
    pub fn next_bucket(self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Granularity::Day => start.checked_add_days(Days::new(1)),
            Granularity::Week => start.checked_add_days(Days::new(7)),
            Granularity::Month => start.checked_add_months(Months::new(1)),
            Granularity::Year => start.checked_add_months(Months::new(12)),
        }
    }

    /// Bucket starts from the bucket containing `first` through the bucket
    /// containing `last`, inclusive.
    pub fn buckets_between(self, first: DateTime<Utc>, last: DateTime<Utc>) -> BucketStarts {
        BucketStarts {
            granularity: self,
            next: Some(self.bucket_start(first)),
            last: self.bucket_start(last),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Year => "year",
        };
        f.write_str(name)
    }
}

impl FromStr for Granularity {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Granularity::from_selector(s).ok_or_else(|| PipelineError::UnknownGranularity(s.to_owned()))
    }
}

pub struct BucketStarts {
    granularity: Granularity,
    next: Option<DateTime<Utc>>,
    last: DateTime<Utc>,
}

impl Iterator for BucketStarts {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.filter(|start| *start <= self.last)?;
        self.next = self.granularity.next_bucket(current);
        Some(current)
    }
}
