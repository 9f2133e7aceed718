use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The source table had no usable rows for the requested chart.
    #[error("no data available")]
    NoData,
    /// Every duration fell outside the outlier window.
    #[error("all {discarded} durations fell outside the outlier window")]
    DegenerateHistogram { discarded: usize },
    #[error("bin count must be at least 1")]
    InvalidBinCount,
    #[error("unknown granularity selector {0:?}")]
    UnknownGranularity(String),
    #[error("unknown chart kind {0:?}")]
    UnknownChart(String),
    #[error("chart {0} requires an actor id")]
    MissingActor(&'static str),
    #[error("invalid histogram config")]
    Config(#[from] toml::de::Error),
}

impl PipelineError {
    /// True for outcomes a caller should render as a "no data" placeholder
    /// rather than treat as a fault.
    pub fn is_no_data(&self) -> bool {
        matches!(
            self,
            PipelineError::NoData | PipelineError::DegenerateHistogram { .. }
        )
    }
}
