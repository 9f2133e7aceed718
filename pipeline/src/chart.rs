use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::assignment::assignment_series;
use crate::bucketing::{KeyField, Reduction, TimestampField, bucket_series};
use crate::census::open_count_series;
use crate::error::PipelineError;
use crate::granularity::Granularity;
use crate::histogram::{Histogram, HistogramConfig};
use crate::record::{RawRow, Table};
use crate::series::Series;
use crate::source::Query;

/// Series granularity used when the interval selector is not recognised.
pub const DEFAULT_GRANULARITY: Granularity = Granularity::Month;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    ContributorCount,
    CommitFrequency,
    IssuesClosed,
    OpenIssues,
    PrClosureTime,
    ContributorAssignments,
}

impl ChartKind {
    pub const ALL: [ChartKind; 6] = [
        ChartKind::ContributorCount,
        ChartKind::CommitFrequency,
        ChartKind::IssuesClosed,
        ChartKind::OpenIssues,
        ChartKind::PrClosureTime,
        ChartKind::ContributorAssignments,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            ChartKind::ContributorCount => "contributor-count",
            ChartKind::CommitFrequency => "commit-frequency",
            ChartKind::IssuesClosed => "issues-closed",
            ChartKind::OpenIssues => "open-issues",
            ChartKind::PrClosureTime => "pr-closure-time",
            ChartKind::ContributorAssignments => "contributor-assignments",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ChartKind::ContributorCount => "Contributor Count Over Time",
            ChartKind::CommitFrequency => "Commit Frequency",
            ChartKind::IssuesClosed => "Issues Closed Over Time",
            ChartKind::OpenIssues => "Open Issues Over Time",
            ChartKind::PrClosureTime => "Pull Request Closure Time Distribution",
            ChartKind::ContributorAssignments => "Contributor Assignments Over Time",
        }
    }

    /// The cached table this chart is computed from.
    pub fn query(self) -> Query {
        match self {
            ChartKind::ContributorCount | ChartKind::ContributorAssignments => Query::PrAssignees,
            ChartKind::CommitFrequency => Query::Commits,
            ChartKind::IssuesClosed | ChartKind::OpenIssues => Query::Issues,
            ChartKind::PrClosureTime => Query::PullRequests,
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ChartKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartKind::ALL
            .into_iter()
            .find(|k| k.slug() == s)
            .ok_or_else(|| PipelineError::UnknownChart(s.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartData {
    Series(Series),
    Histogram(Histogram),
}

/// Runs the pipeline stage behind `kind` over freshly fetched rows.
///
/// `interval` is the dashboard's selector (`D`, `W`, `M`, `Y`). `actor` is
/// only consulted by [`ChartKind::ContributorAssignments`].
pub fn build_chart(
    kind: ChartKind,
    rows: &[RawRow],
    interval: &str,
    config: &HistogramConfig,
    actor: Option<&str>,
) -> Result<ChartData, PipelineError> {
    if rows.is_empty() {
        return Err(PipelineError::NoData);
    }
    let table = Table::from_rows(kind.query().table_kind(), rows);
    if table.is_empty() {
        return Err(PipelineError::NoData);
    }
    let events = table.records();
    let granularity = Granularity::from_selector(interval).unwrap_or(DEFAULT_GRANULARITY);

    let series = match kind {
        ChartKind::ContributorCount => bucket_series(
            events,
            granularity,
            TimestampField::Created,
            Reduction::DistinctCount(KeyField::Actor),
        ),
        ChartKind::CommitFrequency => bucket_series(
            events,
            Granularity::Week,
            TimestampField::Created,
            Reduction::Count,
        ),
        ChartKind::IssuesClosed => {
            bucket_series(events, granularity, TimestampField::Closed, Reduction::Count)
        }
        ChartKind::OpenIssues => open_count_series(events, granularity),
        ChartKind::ContributorAssignments => {
            let actor = actor.ok_or(PipelineError::MissingActor(kind.slug()))?;
            assignment_series(events, granularity, actor)
        }
        ChartKind::PrClosureTime => {
            let bin_count = config.bin_count_for_selector(interval);
            return config.histogram(events, bin_count).map(ChartData::Histogram);
        }
    };

    if series.is_empty() {
        return Err(PipelineError::NoData);
    }
    Ok(ChartData::Series(series))
}
