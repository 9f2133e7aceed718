use std::{env, path::Path, path::PathBuf, time::Duration};

use anyhow::{Context, Result, ensure};

pub const DEFAULT_DATA_DIR: &str = "data/cache";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(60);

pub struct ServiceConfig {
    /// Root of the cached query tables
    pub data_dir: PathBuf,
    /// Address the chart-data service listens on
    pub bind_addr: String,
    /// How often to re-check the cache for a table that is not ready yet
    pub poll_interval: Duration,
    /// How long to wait for a table before giving up on a request
    pub poll_timeout: Duration,
    /// Optional TOML file overriding histogram outlier bounds and bin counts
    pub histogram_config: Option<PathBuf>,
}

impl ServiceConfig {
    pub fn load(manifest_dir: &Path) -> Result<Self> {
        #[cfg(debug_assertions)]
        if let Err(e) = dotenvy::from_path(manifest_dir.join(".env")) {
            if !e.not_found() {
                return Err(e).context("Can't read .env file");
            }
        }
        #[cfg(not(debug_assertions))]
        let _ = manifest_dir;

        Self::from_env()
    }

    pub fn from_env() -> Result<Self> {
        let poll_interval = duration_var("ACTIVITY_POLL_INTERVAL_MS", Duration::from_millis)?
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        ensure!(
            !poll_interval.is_zero(),
            "ACTIVITY_POLL_INTERVAL_MS must be greater than zero"
        );

        Ok(Self {
            data_dir: env::var_os("ACTIVITY_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            bind_addr: env::var("ACTIVITY_BIND_ADDR")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_owned()),
            poll_interval,
            poll_timeout: duration_var("ACTIVITY_POLL_TIMEOUT_SECS", Duration::from_secs)?
                .unwrap_or(DEFAULT_POLL_TIMEOUT),
            histogram_config: env::var_os("ACTIVITY_HISTOGRAM_CONFIG").map(PathBuf::from),
        })
    }
}

fn duration_var(name: &str, unit: fn(u64) -> Duration) -> Result<Option<Duration>> {
    match env::var(name) {
        Ok(raw) => {
            let value: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("Expected {name} to be a whole number, got {raw:?}"))?;
            Ok(Some(unit(value)))
        }
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Can't read {name}")),
    }
}

/// Load service config using the calling crate's manifest directory.
#[macro_export]
macro_rules! load_service_config {
    () => {
        $crate::config::ServiceConfig::load(std::path::Path::new(env!("CARGO_MANIFEST_DIR")))
    };
}
