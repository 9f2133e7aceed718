use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use pipeline::{ChartData, ChartKind, PipelineError, RepoId, build_chart};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::{DEFAULT_INTERVAL, MAX_REPOS_PER_REQUEST};
use crate::fetch::{FetchError, wait_for_table};
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/charts/{kind}", get(chart))
        .with_state(state)
}

pub async fn health() -> &'static str {
    "ok"
}

#[derive(Deserialize)]
pub struct ChartQuery {
    /// Comma-separated repo ids.
    #[serde(default)]
    repos: String,
    interval: Option<String>,
    actor: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChartResponse {
    Ok {
        chart: ChartKind,
        title: &'static str,
        interval: String,
        data: ChartData,
    },
    NoData {
        chart: ChartKind,
        title: &'static str,
    },
}

type ApiError = (StatusCode, String);

fn parse_repos(raw: &str) -> Result<Vec<RepoId>, ApiError> {
    let repos = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<RepoId>()
                .map_err(|_| (StatusCode::BAD_REQUEST, format!("invalid repo id {s:?}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if repos.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "no repos selected".to_owned()));
    }
    if repos.len() > MAX_REPOS_PER_REQUEST {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("at most {MAX_REPOS_PER_REQUEST} repos per request"),
        ));
    }
    Ok(repos)
}

pub async fn chart(
    Path(kind): Path<String>,
    Query(query): Query<ChartQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ChartResponse>, ApiError> {
    let kind: ChartKind = kind
        .parse()
        .map_err(|e: PipelineError| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let repos = parse_repos(&query.repos)?;
    let interval = query.interval.unwrap_or_else(|| DEFAULT_INTERVAL.to_owned());

    let rows = wait_for_table(Arc::clone(&state.source), kind.query(), &repos, state.poll)
        .await
        .map_err(|e| match e {
            FetchError::NotReady { .. } => {
                warn!(chart = %kind, "{e}");
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            }
            FetchError::Source(_) | FetchError::Join(_) => {
                error!(chart = %kind, "{e}");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        })?;

    let start = Instant::now();
    info!(chart = %kind, repos = repos.len(), %interval, "START");

    let data = match build_chart(
        kind,
        &rows,
        &interval,
        &state.histogram,
        query.actor.as_deref(),
    ) {
        Ok(data) => data,
        Err(e) if e.is_no_data() => {
            info!(chart = %kind, "NO DATA AVAILABLE");
            return Ok(Json(ChartResponse::NoData {
                chart: kind,
                title: kind.display_name(),
            }));
        }
        Err(e @ PipelineError::MissingActor(_)) => {
            return Err((StatusCode::BAD_REQUEST, e.to_string()));
        }
        Err(e) => {
            error!(chart = %kind, "{e}");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    info!(chart = %kind, elapsed = ?start.elapsed(), "END");
    Ok(Json(ChartResponse::Ok {
        chart: kind,
        title: kind.display_name(),
        interval,
        data,
    }))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use pipeline::{HistogramConfig, Query as TableQuery, RawRow, StaticSource};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::fetch::PollSettings;

    fn app(source: StaticSource) -> Router {
        router(Arc::new(AppState::new(
            Arc::new(source),
            HistogramConfig::default(),
            PollSettings {
                interval: Duration::from_millis(5),
                timeout: Duration::from_millis(40),
            },
        )))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn issue(day: u32, closed: Option<u32>) -> RawRow {
        RawRow {
            created: Some(Utc.with_ymd_and_hms(2023, 1, day, 0, 0, 0).unwrap()),
            closed: closed.map(|d| Utc.with_ymd_and_hms(2023, 1, d, 0, 0, 0).unwrap()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn open_issues_series() {
        let source = StaticSource::new();
        source.publish(TableQuery::Issues, 1, vec![issue(1, Some(3))]);
        source.publish(TableQuery::Issues, 2, vec![issue(2, None)]);

        let (status, body) =
            get_json(app(source), "/charts/open-issues?repos=1,2&interval=D").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["chart"], "open-issues");
        assert_eq!(body["title"], ChartKind::OpenIssues.display_name());
        assert_eq!(body["interval"], "D");
        assert_eq!(body["data"]["type"], "series");
        let values: Vec<i64> = body["data"]["points"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["value"].as_i64().unwrap())
            .collect();
        assert_eq!(values, vec![1, 2, 1, 1]);
    }

    #[tokio::test]
    async fn empty_table_reports_no_data() {
        let source = StaticSource::new();
        source.mark_ready(TableQuery::PullRequests);

        let (status, body) = get_json(app(source), "/charts/pr-closure-time?repos=5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "no_data");
        assert_eq!(body["chart"], "pr-closure-time");
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn unready_table_is_unavailable() {
        let (status, _) =
            get_json(app(StaticSource::new()), "/charts/issues-closed?repos=1").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn unknown_chart_is_bad_request() {
        let (status, _) = get_json(app(StaticSource::new()), "/charts/stars?repos=1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_repo_list_is_bad_request() {
        let (status, _) =
            get_json(app(StaticSource::new()), "/charts/open-issues?repos=1,x").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = get_json(app(StaticSource::new()), "/charts/open-issues").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn assignments_without_actor_is_bad_request() {
        let source = StaticSource::new();
        source.publish(
            TableQuery::PrAssignees,
            1,
            vec![RawRow {
                created: Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()),
                assignee: Some("alice".to_owned()),
                assignment_action: Some("assigned".to_owned()),
                assign_date: Some(Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap()),
                ..Default::default()
            }],
        );
        let (status, _) =
            get_json(app(source), "/charts/contributor-assignments?repos=1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn closure_histogram_uses_interval_bins() {
        let source = StaticSource::new();
        source.publish(
            TableQuery::PullRequests,
            1,
            vec![issue(1, Some(2)), issue(1, Some(4))],
        );
        let (status, body) =
            get_json(app(source), "/charts/pr-closure-time?repos=1&interval=W").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["type"], "histogram");
        assert_eq!(body["data"]["counts"].as_array().unwrap().len(), 7);
        assert_eq!(body["data"]["bin_edges"].as_array().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn health_is_ok() {
        let response = app(StaticSource::new())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
