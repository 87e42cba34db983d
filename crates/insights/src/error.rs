use thiserror::Error;

/// Any failure of an analysis request. Callers surface all of them as a
/// single "analysis failed" condition; there are no partial results.
#[derive(Debug, Error)]
pub enum InsightError {
    #[error("invalid analysis input: {0}")]
    InvalidInput(String),
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid model output: {0}")]
    InvalidOutput(String),
    #[error("invalid model endpoint: {0}")]
    Endpoint(String),
}

impl From<serde_json::Error> for InsightError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidOutput(value.to_string())
    }
}
