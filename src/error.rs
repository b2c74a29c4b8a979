use thiserror::Error;

/// Container-level failure. Absorbed by the driver: the container is skipped.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("container {index}: {reason}")]
    ContainerExtractionFailed { index: usize, reason: String },
}

/// Session-level failure. Ends the session in `error`.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a scrape session is already in progress")]
    Busy,

    #[error("page context unavailable: {0}")]
    ContextUnavailable(String),

    #[error("ingestion endpoint URL not configured")]
    MissingConfig,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("ingestion endpoint rejected the batch: {0}")]
    Rejected(String),

    #[error("settings store: {0}")]
    Store(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("interval must be at least {floor} minutes (got {got})")]
    IntervalBelowFloor { got: u32, floor: u32 },

    #[error("invalid endpoint URL '{0}'")]
    InvalidEndpoint(String),
}
