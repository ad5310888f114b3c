use base64::Engine;
use serde::{Deserialize, Serialize};

/// JSON envelope carrying audio across a service boundary.
/// Wire shape: `{"speech": "<base64 waveform>"}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpeechPayload {
    pub speech: String,
}

impl SpeechPayload {
    /// Wrap raw audio bytes in the transport encoding.
    pub fn from_audio(audio: &[u8]) -> Self {
        Self {
            speech: base64::engine::general_purpose::STANDARD.encode(audio),
        }
    }

    /// Recover the raw audio bytes from the transport encoding.
    pub fn decode_audio(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.speech)
    }
}

/// JSON envelope carrying text across a service boundary.
/// Wire shape: `{"text": "<utterance or answer>"}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TextPayload {
    pub text: String,
}

impl TextPayload {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}
