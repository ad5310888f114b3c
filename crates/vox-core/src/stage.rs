use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::errors::StageError;

/// The three fixed stages of the pipeline, in invocation order.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    SpeechToText,
    KnowledgeEngine,
    SpeechSynthesis,
}

impl StageKind {
    /// All stages in pipeline order.
    pub const ALL: [StageKind; 3] = [
        StageKind::SpeechToText,
        StageKind::KnowledgeEngine,
        StageKind::SpeechSynthesis,
    ];

    /// Short label for logging and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SpeechToText => "stt",
            Self::KnowledgeEngine => "alpha",
            Self::SpeechSynthesis => "tts",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SpeechToText => f.write_str("speech-to-text service"),
            Self::KnowledgeEngine => f.write_str("knowledge-engine service"),
            Self::SpeechSynthesis => f.write_str("speech-synthesis service"),
        }
    }
}

/// One discrete transformation in the pipeline. The orchestrator never
/// inspects the payload beyond handing the response body to the next stage.
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    async fn invoke(&self, input: Bytes) -> Result<Bytes, StageError>;
}
