use std::time::Duration;

use reqwest::Client;
use secrecy::ExposeSecret;
use tracing::instrument;

use vox_core::config::{env_duration_secs, DEFAULT_STAGE_TIMEOUT};
use vox_core::{ApiKey, StageError, StageKind};

use crate::http::classify_send_error;

const STAGE: StageKind = StageKind::SpeechSynthesis;
const SSML_CONTENT_TYPE: &str = "application/ssml+xml";
const DEFAULT_VOICE: &str = "en-US-JennyNeural";
const DEFAULT_OUTPUT_FORMAT: &str = "riff-16khz-16bit-mono-pcm";

/// Configuration for the speech-synthesis cloud API.
#[derive(Clone, Debug)]
pub struct SynthesizerConfig {
    pub endpoint: String,
    pub key: ApiKey,
    pub voice: String,
    pub output_format: String,
    pub timeout: Duration,
}

impl SynthesizerConfig {
    /// Standard endpoint for a given service region.
    pub fn for_region(region: &str, key: ApiKey) -> Self {
        Self {
            endpoint: format!("https://{region}.tts.speech.microsoft.com/cognitiveservices/v1"),
            key,
            voice: DEFAULT_VOICE.into(),
            output_format: DEFAULT_OUTPUT_FORMAT.into(),
            timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    /// Build from `VOX_TTS_*` environment variables.
    pub fn from_env() -> Result<Self, StageError> {
        let key = std::env::var("VOX_TTS_KEY")
            .map_err(|_| StageError::validation("VOX_TTS_KEY is not set"))?;
        let region = std::env::var("VOX_TTS_REGION").unwrap_or_else(|_| "uksouth".into());
        let mut config = Self::for_region(&region, ApiKey::new(key));
        if let Ok(endpoint) = std::env::var("VOX_TTS_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Ok(voice) = std::env::var("VOX_TTS_VOICE") {
            config.voice = voice;
        }
        if let Some(timeout) = env_duration_secs("VOX_TTS_TIMEOUT_SECS") {
            config.timeout = timeout;
        }
        Ok(config)
    }
}

/// Adapter over the speech-synthesis cloud API. Text in, raw audio out.
pub struct SpeechSynthesizer {
    client: Client,
    config: SynthesizerConfig,
}

impl SpeechSynthesizer {
    pub fn new(config: SynthesizerConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Render one SSML document around the answer text.
    fn ssml(&self, text: &str) -> String {
        format!(
            "<speak version='1.0' xml:lang='en-US'> \
             <voice xml:lang='en-US' name='{}'>{}</voice> </speak>",
            self.config.voice,
            escape_xml(text)
        )
    }

    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>, StageError> {
        let resp = self
            .client
            .post(&self.config.endpoint)
            .header("content-type", SSML_CONTENT_TYPE)
            .header("ocp-apim-subscription-key", self.config.key.0.expose_secret())
            .header("x-microsoft-outputformat", &self.config.output_format)
            .timeout(self.config.timeout)
            .body(self.ssml(text))
            .send()
            .await
            .map_err(|e| classify_send_error(STAGE, &e, self.config.timeout))?;

        if !resp.status().is_success() {
            return Err(StageError::BackendStatus {
                stage: STAGE,
                status: resp.status().as_u16(),
            });
        }

        let audio = resp
            .bytes()
            .await
            .map_err(|e| StageError::decode(STAGE, e))?;
        Ok(audio.to_vec())
    }
}

/// Minimal XML escaping for text interpolated into the SSML body.
fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
