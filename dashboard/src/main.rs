use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use pipeline::HistogramConfig;
use tracing::info;

use crate::fetch::PollSettings;
use crate::state::AppState;
use crate::storage::JsonlTableSource;

mod config;
mod fetch;
mod paths;
mod routes;
mod state;
mod storage;

#[tokio::main]
async fn main() -> Result<()> {
    shared::init_tracing!()?;
    let config = shared::load_service_config!()?;

    let histogram = match &config.histogram_config {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            HistogramConfig::from_toml_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        }
        None => HistogramConfig::default(),
    };

    let state = Arc::new(AppState::new(
        Arc::new(JsonlTableSource::new(config.data_dir.clone())),
        histogram,
        PollSettings {
            interval: config.poll_interval,
            timeout: config.poll_timeout,
        },
    ));

    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!(
        addr = %config.bind_addr,
        data_dir = %config.data_dir.display(),
        "serving chart data"
    );
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
