use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Missing field in job context: {field}")]
    MissingField { field: String },

    #[error("Checkout action references unknown step: {step_id}")]
    UnknownStep { step_id: String },

    #[error("Step {step_id} declares a repository input without a literal value")]
    MalformedRepository { step_id: String },

    #[error("Invalid timestamp: {value}")]
    InvalidTimestamp { value: String },

    #[error("Telemetry request failed: {0}")]
    Telemetry(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
