use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use vox_core::payloads::TextPayload;
use vox_core::{Stage, StageError, StageKind};

/// Pre-programmed responses for deterministic testing without network calls.
#[derive(Clone)]
pub enum MockResponse {
    /// Return these bytes as the stage output.
    Output(Bytes),
    /// Fail the invocation with this error.
    Error(StageError),
    /// Wait a duration, then yield the inner response.
    Delay(Duration, Box<MockResponse>),
}

impl MockResponse {
    /// Convenience: a `{"text": …}` JSON output.
    pub fn text(text: &str) -> Self {
        let body = serde_json::to_vec(&TextPayload::new(text)).expect("serialize text payload");
        Self::Output(Bytes::from(body))
    }

    /// Convenience: an arbitrary JSON document output.
    pub fn json(value: &serde_json::Value) -> Self {
        let body = serde_json::to_vec(value).expect("serialize json value");
        Self::Output(Bytes::from(body))
    }

    /// Convenience: wrap any response with a delay.
    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Mock stage that returns pre-programmed responses in sequence. Once the
/// script is exhausted the last response repeats.
pub struct MockStage {
    kind: StageKind,
    responses: Vec<MockResponse>,
    call_count: AtomicUsize,
}

impl MockStage {
    pub fn new(kind: StageKind, responses: Vec<MockResponse>) -> Self {
        Self {
            kind,
            responses,
            call_count: AtomicUsize::new(0),
        }
    }

    /// A stage that always echoes its input back.
    pub fn echo(kind: StageKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Stage for MockStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    async fn invoke(&self, input: Bytes) -> Result<Bytes, StageError> {
        let index = self.call_count.fetch_add(1, Ordering::Relaxed);

        // Empty script = echo stage
        if self.responses.is_empty() {
            return Ok(input);
        }

        let mut response = self
            .responses
            .get(index)
            .unwrap_or_else(|| self.responses.last().expect("non-empty script"))
            .clone();

        loop {
            match response {
                MockResponse::Output(bytes) => return Ok(bytes),
                MockResponse::Error(err) => return Err(err),
                MockResponse::Delay(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    response = *inner;
                }
            }
        }
    }
}
