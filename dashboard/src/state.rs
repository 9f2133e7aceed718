use std::sync::Arc;

use pipeline::{HistogramConfig, TableSource};

use crate::fetch::PollSettings;

pub struct AppState {
    pub source: Arc<dyn TableSource>,
    pub histogram: HistogramConfig,
    pub poll: PollSettings,
}

impl AppState {
    pub fn new(
        source: Arc<dyn TableSource>,
        histogram: HistogramConfig,
        poll: PollSettings,
    ) -> Self {
        AppState {
            source,
            histogram,
            poll,
        }
    }
}
