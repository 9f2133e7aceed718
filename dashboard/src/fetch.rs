use std::sync::Arc;
use std::time::Duration;

use pipeline::{Query, RawRow, RepoId, SourceError, TableSource};
use thiserror::Error;
use tracing::debug;

/// Floor for the poll period; `tokio::time::interval` rejects zero.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{query} table not ready after {waited:?}")]
    NotReady { query: Query, waited: Duration },
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("table fetch task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Polls `source` until the table for `query` over `repos` is ready.
///
/// Sources may do blocking file I/O, so each attempt runs on the blocking
/// pool rather than the calling worker thread.
pub async fn wait_for_table(
    source: Arc<dyn TableSource>,
    query: Query,
    repos: &[RepoId],
    poll: PollSettings,
) -> Result<Vec<RawRow>, FetchError> {
    let repos: Arc<[RepoId]> = repos.into();
    let attempt = async {
        let mut interval = tokio::time::interval(poll.interval.max(MIN_POLL_INTERVAL));
        let mut attempts = 0u32;
        loop {
            interval.tick().await;
            attempts += 1;
            let source = Arc::clone(&source);
            let repos = Arc::clone(&repos);
            let fetched =
                tokio::task::spawn_blocking(move || source.fetch(query, &repos)).await??;
            if let Some(rows) = fetched {
                debug!(%query, attempts, rows = rows.len(), "table ready");
                return Ok::<_, FetchError>(rows);
            }
        }
    };

    tokio::time::timeout(poll.timeout, attempt)
        .await
        .unwrap_or(Err(FetchError::NotReady {
            query,
            waited: poll.timeout,
        }))
}
