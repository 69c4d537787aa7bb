use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Conversion failed for {video}: {reason}")]
    ConversionFailed { video: String, reason: String },

    #[error("Transcript unavailable at {key}: {reason}")]
    TranscriptUnavailable { key: String, reason: String },

    #[error("Both model backends failed (primary {primary}, fallback {fallback}): {reason}")]
    ModelBackendExhausted {
        primary: String,
        fallback: String,
        reason: String,
    },

    #[error("Model response is missing the <{tag}> section")]
    MissingSection { tag: &'static str },

    #[error("Fusion failed for {record_id}: {reason}")]
    FusionFailed { record_id: String, reason: String },

    #[error("Record {record_id} not found")]
    RecordNotFound { record_id: String },

    #[error("Storage error for {key}: {reason}")]
    StorageFailed { key: String, reason: String },

    #[error("Unexpected service response: {reason}")]
    UnexpectedResponse { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
