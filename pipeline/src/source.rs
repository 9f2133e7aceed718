use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::{RawRow, TableKind};

pub type RepoId = u64;

/// A cached query, keyed together with a repo list in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    Commits,
    Issues,
    PullRequests,
    PrAssignees,
}

impl Query {
    pub const ALL: [Query; 4] = [
        Query::Commits,
        Query::Issues,
        Query::PullRequests,
        Query::PrAssignees,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Query::Commits => "commits",
            Query::Issues => "issues",
            Query::PullRequests => "prs",
            Query::PrAssignees => "pr_assignees",
        }
    }

    pub fn table_kind(self) -> TableKind {
        match self {
            Query::Commits => TableKind::Commits,
            Query::Issues => TableKind::Issues,
            Query::PullRequests => TableKind::PullRequests,
            Query::PrAssignees => TableKind::Assignments,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Query {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Query::ALL
            .into_iter()
            .find(|q| q.name() == s)
            .ok_or_else(|| SourceError::UnknownQuery(s.to_owned()))
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("unknown query {0:?}")]
    UnknownQuery(String),
    #[error("failed to read {location}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed record at {location}: {message}")]
    Decode { location: String, message: String },
}

/// The external cache of precomputed tables.
///
/// `Ok(None)` means the table for this query and repo list is still being
/// computed; callers decide whether and how long to wait.
pub trait TableSource: Send + Sync {
    fn fetch(&self, query: Query, repos: &[RepoId]) -> Result<Option<Vec<RawRow>>, SourceError>;
}

/// In-memory source keyed by query and per-repo rows. A query is ready once
/// any rows, even an empty set, have been published for it.
#[derive(Default)]
pub struct StaticSource {
    tables: RwLock<HashMap<Query, HashMap<RepoId, Vec<RawRow>>>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, query: Query, repo: RepoId, rows: Vec<RawRow>) {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        tables.entry(query).or_default().insert(repo, rows);
    }

    pub fn mark_ready(&self, query: Query) {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        tables.entry(query).or_default();
    }
}

impl TableSource for StaticSource {
    fn fetch(&self, query: Query, repos: &[RepoId]) -> Result<Option<Vec<RawRow>>, SourceError> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        let Some(per_repo) = tables.get(&query) else {
            return Ok(None);
        };
        let rows = repos
            .iter()
            .filter_map(|repo| per_repo.get(repo))
            .flatten()
            .cloned()
            .collect();
        Ok(Some(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpublished_query_is_not_ready() {
        let source = StaticSource::new();
        assert!(source.fetch(Query::Issues, &[1]).unwrap().is_none());
    }

    #[test]
    fn rows_are_concatenated_across_repos() {
        let source = StaticSource::new();
        source.publish(Query::Commits, 1, vec![RawRow::default()]);
        source.publish(Query::Commits, 2, vec![RawRow::default(), RawRow::default()]);
        let rows = source.fetch(Query::Commits, &[1, 2, 3]).unwrap().unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn ready_query_without_rows_is_empty() {
        let source = StaticSource::new();
        source.mark_ready(Query::PrAssignees);
        assert_eq!(
            source.fetch(Query::PrAssignees, &[7]).unwrap(),
            Some(Vec::new())
        );
    }

    #[test]
    fn query_names_round_trip() {
        for query in Query::ALL {
            assert_eq!(query.name().parse::<Query>().unwrap(), query);
        }
        assert!("stars".parse::<Query>().is_err());
    }
}
