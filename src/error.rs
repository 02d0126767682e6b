use thiserror::Error;

/// Errors raised by the aggregation and indicator core.
///
/// Every variant is local to the call that produced it; the engine state is
/// left exactly as it was before the rejected input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Tick bucket precedes the open (or last emitted) bucket.
    #[error("out-of-order tick: bucket {bucket_start} precedes open bucket {open_bucket}")]
    OutOfOrderTick { bucket_start: i64, open_bucket: i64 },

    /// Base bar does not advance past the last bar merged into the window.
    #[error("out-of-order bar: open time {open_time} does not follow {last_open_time}")]
    OutOfOrderBar { open_time: i64, last_open_time: i64 },

    #[error("interval mismatch: expected {expected} bars, got {found}")]
    IntervalMismatch { expected: String, found: String },

    /// More history was requested than the buffer currently retains.
    #[error("insufficient data: need {required} entries, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("invalid window configuration: {0}")]
    InvalidWindowConfig(String),

    #[error("invalid tick: {0}")]
    InvalidTick(String),

    /// Replayed bar with non-finite prices, a broken high/low envelope or an
    /// unrepresentable bucket.
    #[error("invalid bar: {0}")]
    InvalidBar(String),
}

impl EngineError {
    pub(crate) fn invalid_config(msg: impl Into<String>) -> Self {
        EngineError::InvalidWindowConfig(msg.into())
    }
}

/// Errors raised while loading an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error(transparent)]
    Invalid(#[from] EngineError),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
