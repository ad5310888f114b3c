use std::time::Duration;

use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;

use vox_core::config::{env_duration_secs, DEFAULT_STAGE_TIMEOUT};
use vox_core::{ApiKey, StageError, StageKind};

use crate::http::classify_send_error;

const STAGE: StageKind = StageKind::SpeechToText;
const WAV_CONTENT_TYPE: &str = "audio/wav;codecs=audio/pcm;samplerate=16000";

/// Configuration for the speech-recognition cloud API.
#[derive(Clone, Debug)]
pub struct RecognizerConfig {
    /// Full recognition endpoint URL.
    pub endpoint: String,
    /// Subscription key for the cloud service.
    pub key: ApiKey,
    pub language: String,
    pub timeout: Duration,
}

impl RecognizerConfig {
    /// Standard endpoint for a given service region.
    pub fn for_region(region: &str, key: ApiKey) -> Self {
        Self {
            endpoint: format!(
                "https://{region}.stt.speech.microsoft.com/speech/recognition/conversation/cognitiveservices/v1"
            ),
            key,
            language: "en-US".into(),
            timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    /// Build from `VOX_STT_*` environment variables.
    pub fn from_env() -> Result<Self, StageError> {
        let key = std::env::var("VOX_STT_KEY")
            .map_err(|_| StageError::validation("VOX_STT_KEY is not set"))?;
        let region = std::env::var("VOX_STT_REGION").unwrap_or_else(|_| "uksouth".into());
        let mut config = Self::for_region(&region, ApiKey::new(key));
        if let Ok(endpoint) = std::env::var("VOX_STT_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Some(timeout) = env_duration_secs("VOX_STT_TIMEOUT_SECS") {
            config.timeout = timeout;
        }
        Ok(config)
    }
}

/// Response body of the recognition API. Parsed structurally; the service
/// returns more fields but only the display text matters here.
#[derive(Debug, Deserialize)]
struct RecognitionResponse {
    #[serde(rename = "DisplayText")]
    display_text: Option<String>,
    #[serde(rename = "RecognitionStatus")]
    recognition_status: Option<String>,
}

/// Adapter over the speech-recognition cloud API.
pub struct SpeechRecognizer {
    client: Client,
    config: RecognizerConfig,
}

impl SpeechRecognizer {
    pub fn new(config: RecognizerConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Recognize one utterance. Input is raw WAV bytes.
    #[instrument(skip(self, audio), fields(bytes = audio.len()))]
    pub async fn recognize(&self, audio: &[u8]) -> Result<String, StageError> {
        let resp = self
            .client
            .post(&self.config.endpoint)
            .query(&[("language", self.config.language.as_str())])
            .header("content-type", WAV_CONTENT_TYPE)
            .header("ocp-apim-subscription-key", self.config.key.0.expose_secret())
            .timeout(self.config.timeout)
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| classify_send_error(STAGE, &e, self.config.timeout))?;

        if !resp.status().is_success() {
            return Err(StageError::BackendStatus {
                stage: STAGE,
                status: resp.status().as_u16(),
            });
        }

        let body: RecognitionResponse = resp
            .json()
            .await
            .map_err(|e| StageError::decode(STAGE, e))?;

        match body.display_text {
            Some(text) => Ok(text),
            None => Err(StageError::decode(
                STAGE,
                format!(
                    "no DisplayText in response (status: {})",
                    body.recognition_status.as_deref().unwrap_or("unknown")
                ),
            )),
        }
    }
}
