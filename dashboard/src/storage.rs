use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pipeline::{Query, RawRow, RepoId, SourceError, TableSource};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::paths;

/// Reads cached query tables written as one JSON object per line.
///
/// A query is ready for a repo list once every repo in it has a table file;
/// until then `fetch` reports "not ready" so the caller can poll.
pub struct JsonlTableSource {
    data_dir: PathBuf,
}

impl JsonlTableSource {
    pub fn new(data_dir: PathBuf) -> Self {
        JsonlTableSource { data_dir }
    }
}

impl TableSource for JsonlTableSource {
    fn fetch(&self, query: Query, repos: &[RepoId]) -> Result<Option<Vec<RawRow>>, SourceError> {
        let mut rows = Vec::new();
        for &repo in repos {
            let path = paths::table_path(&self.data_dir, query, repo);
            match load_lines::<RawRow>(&path) {
                Ok(mut repo_rows) => rows.append(&mut repo_rows),
                Err(SourceError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                    debug!(%query, repo, "table not cached yet");
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Some(rows))
    }
}

/// Parses every non-blank line of `path` as a `T`.
pub fn load_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, SourceError> {
    let content = fs::read_to_string(path).map_err(|source| SourceError::Io {
        location: path.display().to_string(),
        source,
    })?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|e| SourceError::Decode {
                location: format!("{}:{}", path.display(), idx + 1),
                message: e.to_string(),
            })
        })
        .collect()
}
