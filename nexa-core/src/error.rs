use thiserror::Error;

/// All errors produced by nexa-core.
#[derive(Debug, Error)]
pub enum NexaError {
    #[error("input error: {0}")]
    Input(InputFailure),

    #[error("didn't understand the format: {0}")]
    Format(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("malformed data: {0}")]
    Data(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Why a command capture produced nothing usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFailure {
    /// Audio or text was captured but could not be understood.
    Unrecognized,
    /// The recognition backend could not be reached.
    ServiceUnavailable,
    /// Nothing was captured before the listener gave up.
    Timeout,
}

impl std::fmt::Display for InputFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Unrecognized => "unrecognized",
            Self::ServiceUnavailable => "service unavailable",
            Self::Timeout => "timed out",
        };
        f.write_str(text)
    }
}

impl NexaError {
    pub fn upstream(detail: impl std::fmt::Display) -> Self {
        Self::Upstream(detail.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NexaError>;
