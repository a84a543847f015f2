use thiserror::Error;

#[derive(Debug, Error)]
pub enum PwfailError {
    #[error("failed to run fetch tool '{tool}': {reason}")]
    FetchSpawnFailed { tool: String, reason: String },

    #[error("fetch tool exited with {status}: {hint}")]
    FetchFailed { status: String, hint: String },

    #[error("malformed response from fetch tool: {0}")]
    MalformedEnvelope(String),

    #[error("no failed summary line found in job log")]
    NoSummaryLine,

    #[error("failed summary line found but no failing tests listed")]
    NoFailingTests,

    #[error("failed to extract error block for test '{0}'")]
    ErrorBlockNotFound(String),

    #[error("invalid arguments: {0}")]
    Usage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PwfailError>;
