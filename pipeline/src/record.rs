use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// A row as delivered by the cache, before any validation.
///
/// Column names follow the cached query tables; commit logs call their
/// timestamp `date` or `timestamp`, which is read into `created`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    #[serde(default, alias = "id", alias = "issue_id", alias = "pull_request_id")]
    pub entity_id: Option<String>,
    #[serde(default, alias = "date", alias = "timestamp")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed: Option<DateTime<Utc>>,
    #[serde(default, alias = "cntrb_id")]
    pub assignee: Option<String>,
    #[serde(default)]
    pub assignment_action: Option<String>,
    #[serde(default)]
    pub assign_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentAction {
    Assigned,
    Unassigned,
}

impl FromStr for AssignmentAction {
    type Err = MalformedRow;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assigned" => Ok(AssignmentAction::Assigned),
            "unassigned" => Ok(AssignmentAction::Unassigned),
            other => Err(MalformedRow::UnknownAction(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub action: AssignmentAction,
    pub at: DateTime<Utc>,
}

/// One validated state-change of a tracked entity.
///
/// `closed_at == None` means the entity was still open when the data was
/// collected.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub entity_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub actor_id: Option<String>,
    pub assignment: Option<Assignment>,
}

impl EventRecord {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        EventRecord {
            entity_id: None,
            created_at,
            closed_at: None,
            actor_id: None,
            assignment: None,
        }
    }

    pub fn closed(mut self, closed_at: DateTime<Utc>) -> Self {
        self.closed_at = Some(closed_at);
        self
    }

    pub fn entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn assignment(mut self, action: AssignmentAction, at: DateTime<Utc>) -> Self {
        self.assignment = Some(Assignment { action, at });
        self
    }
}

/// Why a raw row was excluded from aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRow {
    #[error("missing required column `{0}`")]
    MissingField(&'static str),
    #[error("closed before it was created")]
    ClosedBeforeCreated,
    #[error("assignment action recorded before the entity was created")]
    ActionBeforeCreated,
    #[error("unknown assignment action {0:?}")]
    UnknownAction(String),
}

/// The shape of a cached table, which decides the columns a row must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Commits,
    Issues,
    PullRequests,
    Assignments,
}

impl TableKind {
    pub fn parse_row(self, row: &RawRow) -> Result<EventRecord, MalformedRow> {
        let created_at = row.created.ok_or(MalformedRow::MissingField("created"))?;
        let mut record = EventRecord {
            entity_id: row.entity_id.clone(),
            created_at,
            closed_at: None,
            actor_id: row.assignee.clone(),
            assignment: None,
        };

        if self == TableKind::Commits {
            return Ok(record);
        }

        if let Some(closed_at) = row.closed {
            if closed_at < created_at {
                return Err(MalformedRow::ClosedBeforeCreated);
            }
            record.closed_at = Some(closed_at);
        }

        if self == TableKind::Assignments {
            if record.actor_id.is_none() {
                return Err(MalformedRow::MissingField("assignee"));
            }
            let action = row
                .assignment_action
                .as_deref()
                .ok_or(MalformedRow::MissingField("assignment_action"))?
                .parse::<AssignmentAction>()?;
            let at = row
                .assign_date
                .ok_or(MalformedRow::MissingField("assign_date"))?;
            if at < created_at {
                return Err(MalformedRow::ActionBeforeCreated);
            }
            record.assignment = Some(Assignment { action, at });
        }

        Ok(record)
    }
}

/// A validated, immutable view over one fetched table.
#[derive(Debug, Clone)]
pub struct Table {
    kind: TableKind,
    records: Vec<EventRecord>,
    dropped: usize,
}

impl Table {
    /// Validates every row, silently excluding the ones that are malformed.
    pub fn from_rows(kind: TableKind, rows: &[RawRow]) -> Self {
        let mut records = Vec::with_capacity(rows.len());
        let mut dropped = 0;
        for (index, row) in rows.iter().enumerate() {
            match kind.parse_row(row) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    debug!(?kind, index, %reason, "excluding malformed row");
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            debug!(?kind, dropped, kept = records.len(), "table normalised");
        }
        Table {
            kind,
            records,
            dropped,
        }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Number of rows excluded as malformed.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, day, 0, 0, 0).unwrap()
    }

    fn assignment_row(action: &str) -> RawRow {
        RawRow {
            entity_id: Some("pr-1".to_owned()),
            created: Some(ts(1)),
            closed: None,
            assignee: Some("alice".to_owned()),
            assignment_action: Some(action.to_owned()),
            assign_date: Some(ts(2)),
        }
    }

    #[test]
    fn rows_without_created_are_dropped() {
        let rows = vec![
            RawRow {
                created: Some(ts(1)),
                ..Default::default()
            },
            RawRow::default(),
        ];
        let table = Table::from_rows(TableKind::Issues, &rows);
        assert_eq!(table.records().len(), 1);
        assert_eq!(table.dropped(), 1);
    }

    #[test]
    fn closed_before_created_is_malformed() {
        let row = RawRow {
            created: Some(ts(3)),
            closed: Some(ts(2)),
            ..Default::default()
        };
        assert_eq!(
            TableKind::PullRequests.parse_row(&row),
            Err(MalformedRow::ClosedBeforeCreated)
        );
    }

    #[test]
    fn commit_rows_ignore_close_columns() {
        let row = RawRow {
            created: Some(ts(3)),
            closed: Some(ts(2)),
            ..Default::default()
        };
        let record = TableKind::Commits.parse_row(&row).unwrap();
        assert_eq!(record.closed_at, None);
    }

    #[test]
    fn assignment_rows_parse_action() {
        let record = TableKind::Assignments
            .parse_row(&assignment_row("unassigned"))
            .unwrap();
        assert_eq!(
            record.assignment,
            Some(Assignment {
                action: AssignmentAction::Unassigned,
                at: ts(2),
            })
        );
        assert_eq!(record.actor_id.as_deref(), Some("alice"));
    }

    #[test]
    fn unknown_assignment_action_is_malformed() {
        assert_eq!(
            TableKind::Assignments.parse_row(&assignment_row("reviewed")),
            Err(MalformedRow::UnknownAction("reviewed".to_owned()))
        );
    }

    #[test]
    fn assignment_rows_require_assignee() {
        let mut row = assignment_row("assigned");
        row.assignee = None;
        assert_eq!(
            TableKind::Assignments.parse_row(&row),
            Err(MalformedRow::MissingField("assignee"))
        );
    }

    #[test]
    fn action_before_created_is_malformed() {
        let mut row = assignment_row("assigned");
        row.created = Some(ts(3));
        assert_eq!(
            TableKind::Assignments.parse_row(&row),
            Err(MalformedRow::ActionBeforeCreated)
        );
    }

    #[test]
    fn rows_with_early_assignment_are_dropped() {
        let mut early = assignment_row("assigned");
        early.created = Some(ts(3));
        let rows = vec![assignment_row("assigned"), early];
        let table = Table::from_rows(TableKind::Assignments, &rows);
        assert_eq!(table.records().len(), 1);
        assert_eq!(table.dropped(), 1);
        assert_eq!(table.records()[0].created_at, ts(1));
    }

    #[test]
    fn raw_rows_accept_commit_column_names() {
        let row: RawRow =
            serde_json::from_str(r#"{"date": "2023-01-05T10:00:00Z", "cntrb_id": "bob"}"#)
                .unwrap();
        assert_eq!(
            row.created,
            Some(Utc.with_ymd_and_hms(2023, 1, 5, 10, 0, 0).unwrap())
        );
        assert_eq!(row.assignee.as_deref(), Some("bob"));
    }

    #[test]
    fn null_closed_reads_as_still_open() {
        let row: RawRow =
            serde_json::from_str(r#"{"created": "2023-01-05T10:00:00Z", "closed": null}"#)
                .unwrap();
        let record = TableKind::Issues.parse_row(&row).unwrap();
        assert_eq!(record.closed_at, None);
    }
}
