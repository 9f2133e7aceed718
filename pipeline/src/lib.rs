//! Transformations behind the repository activity charts.
//!
//! Every stage is a pure function over an immutable, already-fetched table:
//! calendar bucketing, open-entity census, assignment census, and
//! closure-time histograms. Fetching the table is the job of a
//! [`TableSource`]; this crate never waits on one.

pub mod assignment;
pub mod bucketing;
pub mod census;
pub mod chart;
pub mod error;
pub mod granularity;
pub mod histogram;
pub mod record;
pub mod series;
pub mod source;

pub use assignment::{assignment_series, assignments_in_window};
pub use bucketing::{KeyField, Reduction, TimestampField, bucket_series};
pub use census::{open_count_at, open_count_series};
pub use chart::{ChartData, ChartKind, build_chart};
pub use error::PipelineError;
pub use granularity::Granularity;
pub use histogram::{BinTable, Histogram, HistogramConfig, duration_histogram};
pub use record::{AssignmentAction, EventRecord, RawRow, Table, TableKind};
pub use series::{Series, SeriesPoint};
pub use source::{Query, RepoId, SourceError, StaticSource, TableSource};
