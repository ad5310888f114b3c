use std::time::Duration;

use secrecy::SecretString;

use crate::stage::StageKind;

/// Wraps a backend credential with secrecy protection (zeroized on drop,
/// redacted in Debug).
#[derive(Clone)]
pub struct ApiKey(pub SecretString);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::from(key.into()))
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

/// Where one stage's backend lives and how long to wait for it.
#[derive(Clone, Debug)]
pub struct StageEndpoint {
    /// Full URL of the backend's listener (e.g. `http://localhost:3002/stt`).
    pub base_url: String,
    /// Credential forwarded to the backend, if it requires one.
    pub credential: Option<ApiKey>,
    /// Upper bound on one stage invocation.
    pub timeout: Duration,
}

impl StageEndpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credential: None,
            timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Injected configuration for the orchestrator: one endpoint per stage.
/// Never hard-coded at call sites.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub stt: StageEndpoint,
    pub alpha: StageEndpoint,
    pub tts: StageEndpoint,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stt: StageEndpoint::new("http://localhost:3002/stt"),
            alpha: StageEndpoint::new("http://localhost:3001/alpha"),
            tts: StageEndpoint::new("http://localhost:3003/tts"),
        }
    }
}

impl PipelineConfig {
    /// Build from `VOX_*` environment variables, falling back to the
    /// default local deployment layout.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("VOX_STT_URL") {
            config.stt.base_url = url;
        }
        if let Ok(url) = std::env::var("VOX_ALPHA_URL") {
            config.alpha.base_url = url;
        }
        if let Ok(url) = std::env::var("VOX_TTS_URL") {
            config.tts.base_url = url;
        }
        if let Some(timeout) = env_duration_secs("VOX_STAGE_TIMEOUT_SECS") {
            config.stt.timeout = timeout;
            config.alpha.timeout = timeout;
            config.tts.timeout = timeout;
        }
        config
    }

    pub fn endpoint(&self, kind: StageKind) -> &StageEndpoint {
        match kind {
            StageKind::SpeechToText => &self.stt,
            StageKind::KnowledgeEngine => &self.alpha,
            StageKind::SpeechSynthesis => &self.tts,
        }
    }
}

/// Read a duration in whole seconds from the environment.
pub fn env_duration_secs(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}
