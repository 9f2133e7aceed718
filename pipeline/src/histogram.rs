use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PipelineError;
use crate::granularity::Granularity;
use crate::record::EventRecord;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Equal-width histogram. `bin_edges` has one more entry than `counts`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub counts: Vec<u64>,
    pub bin_edges: Vec<f64>,
}

impl Histogram {
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// `"lo-hi"` label per bin, edges truncated to whole hours.
    pub fn bin_labels(&self) -> Vec<String> {
        self.bin_edges
            .windows(2)
            .map(|w| format!("{}-{}", w[0] as i64, w[1] as i64))
            .collect()
    }
}

/// Bin count per requested granularity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinTable {
    /// One bin per hour of a day.
    pub day: usize,
    /// One bin per day of a week.
    pub week: usize,
    pub month: usize,
    pub year: usize,
    /// Used when the selector names no known granularity.
    pub fallback: usize,
}

impl Default for BinTable {
    fn default() -> Self {
        BinTable {
            day: 24,
            week: 7,
            month: 30,
            year: 365,
            fallback: 100,
        }
    }
}

/// Outlier window and bin table for closure-time histograms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramConfig {
    pub min_hours: f64,
    pub max_hours: f64,
    pub bins: BinTable,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        HistogramConfig {
            min_hours: 0.0,
            max_hours: 1000.0,
            bins: BinTable::default(),
        }
    }
}

impl HistogramConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, PipelineError> {
        Ok(toml::from_str(content)?)
    }

    pub fn bin_count(&self, granularity: Option<Granularity>) -> usize {
        match granularity {
            Some(Granularity::Day) => self.bins.day,
            Some(Granularity::Week) => self.bins.week,
            Some(Granularity::Month) => self.bins.month,
            Some(Granularity::Year) => self.bins.year,
            None => self.bins.fallback,
        }
    }

    /// Bin count for a raw interval selector such as `"W"`.
    pub fn bin_count_for_selector(&self, selector: &str) -> usize {
        self.bin_count(Granularity::from_selector(selector))
    }

    /// Closure durations in hours that fall inside the outlier window.
    /// Open records contribute nothing.
    pub fn durations(&self, events: &[EventRecord]) -> Vec<f64> {
        events
            .iter()
            .filter_map(duration_hours)
            .filter(|h| *h >= self.min_hours && *h <= self.max_hours)
            .collect()
    }

    pub fn histogram(
        &self,
        events: &[EventRecord],
        bin_count: usize,
    ) -> Result<Histogram, PipelineError> {
        let closed = events.iter().filter(|e| e.closed_at.is_some()).count();
        let durations = self.durations(events);
        if durations.is_empty() {
            return Err(if closed == 0 {
                PipelineError::NoData
            } else {
                PipelineError::DegenerateHistogram { discarded: closed }
            });
        }
        debug!(
            kept = durations.len(),
            discarded = closed - durations.len(),
            bin_count,
            "building closure-time histogram"
        );
        equal_width(&durations, bin_count)
    }
}

/// Elapsed hours from creation to close, if the record is closed.
pub fn duration_hours(record: &EventRecord) -> Option<f64> {
    let closed = record.closed_at?;
    Some((closed - record.created_at).num_milliseconds() as f64 / MILLIS_PER_HOUR)
}

/// Closure-time histogram with the default outlier window.
pub fn duration_histogram(
    events: &[EventRecord],
    bin_count: usize,
) -> Result<Histogram, PipelineError> {
    HistogramConfig::default().histogram(events, bin_count)
}

/// Bins `values` into `bin_count` equal-width bins over `[min, max]`.
///
/// The last bin is closed on the right so `max` is counted. When every value
/// is equal the range is widened by half a unit on each side.
pub fn equal_width(values: &[f64], bin_count: usize) -> Result<Histogram, PipelineError> {
    if bin_count == 0 {
        return Err(PipelineError::InvalidBinCount);
    }
    if values.is_empty() {
        return Err(PipelineError::NoData);
    }

    let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bin_count as f64;

    let mut bin_edges: Vec<f64> = (0..bin_count).map(|i| lo + i as f64 * width).collect();
    bin_edges.push(hi);

    let mut counts = vec![0u64; bin_count];
    for &v in values {
        let idx = ((v - lo) / width) as usize;
        counts[idx.min(bin_count - 1)] += 1;
    }

    Ok(Histogram { counts, bin_edges })
}
