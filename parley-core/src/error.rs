use thiserror::Error;

/// Rejection raised while validating data at a wire boundary
/// (relay commands, control-channel frames).
#[derive(Debug, Error)]
pub enum WireError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing field `{0}`")]
    Missing(&'static str),

    #[error("malformed session description: {0}")]
    MalformedDescription(String),

    #[error("invalid {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

impl WireError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
