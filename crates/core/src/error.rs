use thiserror::Error;

/// Invalid engine configuration. Raised before any scoring work is done.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("horizon must be at least one month (got {0})")]
    InvalidHorizon(u32),
    #[error("horizon must not exceed {max} months (got {got})")]
    HorizonTooLong { got: u32, max: u32 },
    #[error("{field} must be positive (got {value})")]
    NonPositiveCount { field: &'static str, value: usize },
    #[error("min_per_month ({min}) must not exceed top_per_month ({top})")]
    MinExceedsTop { min: usize, top: usize },
    #[error("score threshold must be within 0..=100 (got {0})")]
    ThresholdOutOfRange(u32),
    #[error("invalid scoring params: {0}")]
    InvalidParams(String),
    #[error("invalid calendar event {name:?}: {reason}")]
    InvalidEvent { name: String, reason: String },
    #[error("duplicate calendar event name {0:?}")]
    DuplicateEvent(String),
}
