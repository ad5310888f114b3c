use std::time::Duration;

use reqwest::Client;
use secrecy::ExposeSecret;
use tracing::instrument;

use vox_core::config::{env_duration_secs, DEFAULT_STAGE_TIMEOUT};
use vox_core::{ApiKey, StageError, StageKind};

use crate::http::classify_send_error;

const STAGE: StageKind = StageKind::KnowledgeEngine;
const DEFAULT_ENDPOINT: &str = "http://api.wolframalpha.com/v1/result";

/// Configuration for the knowledge-engine short-answers API.
#[derive(Clone, Debug)]
pub struct KnowledgeConfig {
    pub endpoint: String,
    /// Application id credential for the API.
    pub app_id: ApiKey,
    pub timeout: Duration,
}

impl KnowledgeConfig {
    pub fn new(app_id: ApiKey) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            app_id,
            timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    /// Build from `VOX_ALPHA_*` environment variables.
    pub fn from_env() -> Result<Self, StageError> {
        let app_id = std::env::var("VOX_ALPHA_APP_ID")
            .map_err(|_| StageError::validation("VOX_ALPHA_APP_ID is not set"))?;
        let mut config = Self::new(ApiKey::new(app_id));
        if let Ok(endpoint) = std::env::var("VOX_ALPHA_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Some(timeout) = env_duration_secs("VOX_ALPHA_TIMEOUT_SECS") {
            config.timeout = timeout;
        }
        Ok(config)
    }
}

/// Adapter over the knowledge-engine API. One question in, one short
/// plain-text answer out.
pub struct KnowledgeClient {
    client: Client,
    config: KnowledgeConfig,
}

impl KnowledgeClient {
    pub fn new(config: KnowledgeConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[instrument(skip(self, question))]
    pub async fn ask(&self, question: &str) -> Result<String, StageError> {
        let resp = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("appid", self.config.app_id.0.expose_secret()),
                ("i", question),
            ])
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| classify_send_error(STAGE, &e, self.config.timeout))?;

        if !resp.status().is_success() {
            return Err(StageError::BackendStatus {
                stage: STAGE,
                status: resp.status().as_u16(),
            });
        }

        resp.text().await.map_err(|e| StageError::decode(STAGE, e))
    }
}
