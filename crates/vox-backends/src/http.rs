use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use secrecy::ExposeSecret;
use tracing::instrument;

use vox_core::{Stage, StageEndpoint, StageError, StageKind};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client with the standard connect timeout. Share one across stages for
/// connection reuse.
pub fn default_client() -> Client {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .expect("failed to build HTTP client")
}

/// Classify a reqwest send failure into the pipeline error taxonomy.
pub(crate) fn classify_send_error(
    stage: StageKind,
    err: &reqwest::Error,
    deadline: Duration,
) -> StageError {
    if err.is_timeout() {
        StageError::Timeout {
            stage,
            elapsed: deadline,
        }
    } else {
        StageError::Unreachable { stage }
    }
}

/// Production `Stage` implementation: one POST to the configured backend
/// listener, opaque bytes in, opaque bytes out.
pub struct HttpStage {
    kind: StageKind,
    client: Client,
    endpoint: StageEndpoint,
}

impl HttpStage {
    pub fn new(kind: StageKind, endpoint: StageEndpoint) -> Self {
        Self::with_client(default_client(), kind, endpoint)
    }

    /// Share one client across stages for connection reuse.
    pub fn with_client(client: Client, kind: StageKind, endpoint: StageEndpoint) -> Self {
        Self {
            kind,
            client,
            endpoint,
        }
    }
}

#[async_trait]
impl Stage for HttpStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    #[instrument(skip(self, input), fields(stage = self.kind.label()))]
    async fn invoke(&self, input: Bytes) -> Result<Bytes, StageError> {
        let mut req = self
            .client
            .post(&self.endpoint.base_url)
            .header("content-type", "application/json")
            .timeout(self.endpoint.timeout)
            .body(input);

        if let Some(credential) = &self.endpoint.credential {
            req = req.header(
                "authorization",
                format!("Bearer {}", credential.0.expose_secret()),
            );
        }

        let resp = req
            .send()
            .await
            .map_err(|e| classify_send_error(self.kind, &e, self.endpoint.timeout))?;

        if !resp.status().is_success() {
            return Err(StageError::BackendStatus {
                stage: self.kind,
                status: resp.status().as_u16(),
            });
        }

        resp.bytes()
            .await
            .map_err(|e| StageError::decode(self.kind, e))
    }
}
