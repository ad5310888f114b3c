use std::time::Duration;

use crate::stage::StageKind;

/// Typed error hierarchy for pipeline execution. Every variant is terminal
/// for the current request: nothing is retried or recovered locally.
#[derive(Clone, Debug, thiserror::Error)]
pub enum StageError {
    /// The backend could not be reached at all.
    #[error("unable to send request to: {stage}")]
    Unreachable { stage: StageKind },

    /// The backend responded with a non-success status.
    #[error("error with {stage} (status code: {status})")]
    BackendStatus { stage: StageKind, status: u16 },

    /// The per-stage deadline elapsed before a response arrived.
    #[error("timed out waiting for {stage} after {elapsed:?}")]
    Timeout { stage: StageKind, elapsed: Duration },

    /// A response body failed to parse into the expected shape.
    #[error("cannot decode response from {stage}: {message}")]
    Decode { stage: StageKind, message: String },

    /// A request body was missing an expected field or carried the wrong type.
    #[error("invalid request: {message}")]
    Validation { message: String },
}

impl StageError {
    /// The stage the error occurred at, where one is identifiable.
    pub fn stage(&self) -> Option<StageKind> {
        match self {
            Self::Unreachable { stage }
            | Self::BackendStatus { stage, .. }
            | Self::Timeout { stage, .. }
            | Self::Decode { stage, .. } => Some(*stage),
            Self::Validation { .. } => None,
        }
    }

    /// Short classification string for logging/metrics labels.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Unreachable { .. } => "unreachable",
            Self::BackendStatus { .. } => "backend_status",
            Self::Timeout { .. } => "timeout",
            Self::Decode { .. } => "decode",
            Self::Validation { .. } => "validation",
        }
    }

    /// HTTP status for the single error response written to the caller.
    /// The error message is always the full response body.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Timeout { .. } => 504,
            Self::Unreachable { .. } | Self::BackendStatus { .. } => 502,
            Self::Decode { .. } => 500,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn decode(stage: StageKind, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            stage,
            message: err.to_string(),
        }
    }
}
