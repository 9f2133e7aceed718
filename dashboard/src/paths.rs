//! Layout of the cached tables under the data directory.

use std::path::{Path, PathBuf};

use pipeline::{Query, RepoId};

pub const TABLE_EXTENSION: &str = "jsonl";

/// `<data_dir>/<query>/<repo>.jsonl`
pub fn table_path(data_dir: &Path, query: Query, repo: RepoId) -> PathBuf {
    data_dir
        .join(query.name())
        .join(format!("{repo}.{TABLE_EXTENSION}"))
}
