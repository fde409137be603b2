use thiserror::Error;

/// Main error type for the analysis pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid file identity: {0}")]
    InvalidIdentity(String),

    #[error("Analyzer error: {0}")]
    Producer(String),

    #[error("Malformed analyzer output: {0}")]
    MalformedPayload(String),

    #[error("Analyzer not available: {0}")]
    AnalyzerUnavailable(String),

    #[error("Analyzer timed out after {0} ms")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
