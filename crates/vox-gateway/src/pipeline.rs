//! The sequential pipeline driver at the heart of the orchestrator.
//!
//! One inbound request is driven through speech-to-text, the knowledge
//! engine, and speech synthesis in fixed order. An error at any stage
//! aborts before the next stage is invoked; no transition ever returns to
//! an earlier stage.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;

use vox_backends::{default_client, HttpStage};
use vox_core::{PipelineConfig, Stage, StageError, StageKind};
use vox_telemetry::MetricsRecorder;

/// Drives one request through the three stages. Stateless across requests:
/// concurrent executions share only the HTTP connection pool and the
/// metrics recorder.
pub struct VoicePipeline {
    stt: Arc<dyn Stage>,
    alpha: Arc<dyn Stage>,
    tts: Arc<dyn Stage>,
    metrics: Option<Arc<MetricsRecorder>>,
}

impl VoicePipeline {
    pub fn new(stt: Arc<dyn Stage>, alpha: Arc<dyn Stage>, tts: Arc<dyn Stage>) -> Self {
        Self {
            stt,
            alpha,
            tts,
            metrics: None,
        }
    }

    /// Production wiring: one HTTP stage per configured backend, sharing a
    /// single client for connection reuse.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let client = default_client();

        Self::new(
            Arc::new(HttpStage::with_client(
                client.clone(),
                StageKind::SpeechToText,
                config.stt.clone(),
            )),
            Arc::new(HttpStage::with_client(
                client.clone(),
                StageKind::KnowledgeEngine,
                config.alpha.clone(),
            )),
            Arc::new(HttpStage::with_client(
                client,
                StageKind::SpeechSynthesis,
                config.tts.clone(),
            )),
        )
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Run the full chain. Returns the decoded final answer document, or
    /// the first stage error encountered.
    pub async fn run(&self, audio: Bytes) -> Result<serde_json::Value, StageError> {
        let result = self.run_chain(audio).await;

        if let Some(metrics) = &self.metrics {
            let outcome = match &result {
                Ok(_) => "ok",
                Err(err) => err.error_kind(),
            };
            metrics.increment_counter("vox_pipeline_requests_total", &[("outcome", outcome)], 1);
        }

        result
    }

    async fn run_chain(&self, audio: Bytes) -> Result<serde_json::Value, StageError> {
        let text = self.run_stage(&*self.stt, audio).await?;
        let answer = self.run_stage(&*self.alpha, text).await?;
        let speech = self.run_stage(&*self.tts, answer).await?;

        serde_json::from_slice(&speech)
            .map_err(|e| StageError::decode(StageKind::SpeechSynthesis, e))
    }

    async fn run_stage(&self, stage: &dyn Stage, input: Bytes) -> Result<Bytes, StageError> {
        let started = Instant::now();
        let result = stage.invoke(input).await;
        let elapsed = started.elapsed();

        if let Some(metrics) = &self.metrics {
            metrics.observe_histogram(
                "vox_stage_latency_ms",
                &[("stage", stage.kind().label())],
                elapsed.as_secs_f64() * 1000.0,
            );
        }

        match &result {
            Ok(output) => {
                tracing::debug!(
                    stage = stage.kind().label(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    bytes = output.len(),
                    "stage completed"
                );
            }
            Err(err) => {
                tracing::warn!(
                    stage = stage.kind().label(),
                    kind = err.error_kind(),
                    "stage failed"
                );
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vox_backends::mock::{MockResponse, MockStage};

    fn speech_json(b64: &str) -> serde_json::Value {
        serde_json::json!({ "speech": b64 })
    }

    fn pipeline(
        stt: MockStage,
        alpha: MockStage,
        tts: MockStage,
    ) -> (VoicePipeline, Arc<MockStage>, Arc<MockStage>, Arc<MockStage>) {
        let stt = Arc::new(stt);
        let alpha = Arc::new(alpha);
        let tts = Arc::new(tts);
        let pipeline = VoicePipeline::new(stt.clone(), alpha.clone(), tts.clone());
        (pipeline, stt, alpha, tts)
    }

    #[tokio::test]
    async fn all_stages_succeed_yields_decoded_answer() {
        let (pipeline, stt, alpha, tts) = pipeline(
            MockStage::new(StageKind::SpeechToText, vec![MockResponse::text("question")]),
            MockStage::new(StageKind::KnowledgeEngine, vec![MockResponse::text("42")]),
            MockStage::new(
                StageKind::SpeechSynthesis,
                vec![MockResponse::json(&speech_json("YXVkaW8="))],
            ),
        );

        let out = pipeline.run(Bytes::from_static(b"audio")).await.unwrap();
        assert_eq!(out, speech_json("YXVkaW8="));
        assert_eq!(stt.call_count(), 1);
        assert_eq!(alpha.call_count(), 1);
        assert_eq!(tts.call_count(), 1);
    }

    #[tokio::test]
    async fn stage_one_failure_skips_later_stages() {
        let (pipeline, stt, alpha, tts) = pipeline(
            MockStage::new(
                StageKind::SpeechToText,
                vec![MockResponse::Error(StageError::Unreachable {
                    stage: StageKind::SpeechToText,
                })],
            ),
            MockStage::echo(StageKind::KnowledgeEngine),
            MockStage::echo(StageKind::SpeechSynthesis),
        );

        let err = pipeline.run(Bytes::from_static(b"audio")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "unable to send request to: speech-to-text service"
        );
        assert_eq!(stt.call_count(), 1);
        assert_eq!(alpha.call_count(), 0);
        assert_eq!(tts.call_count(), 0);
    }

    #[tokio::test]
    async fn stage_two_status_error_skips_stage_three() {
        let (pipeline, _, alpha, tts) = pipeline(
            MockStage::new(StageKind::SpeechToText, vec![MockResponse::text("q")]),
            MockStage::new(
                StageKind::KnowledgeEngine,
                vec![MockResponse::Error(StageError::BackendStatus {
                    stage: StageKind::KnowledgeEngine,
                    status: 500,
                })],
            ),
            MockStage::echo(StageKind::SpeechSynthesis),
        );

        let err = pipeline.run(Bytes::from_static(b"audio")).await.unwrap_err();
        assert!(err.to_string().contains("knowledge-engine service"));
        assert!(err.to_string().contains("500"));
        assert_eq!(alpha.call_count(), 1);
        assert_eq!(tts.call_count(), 0);
    }

    #[tokio::test]
    async fn undecodable_final_body_is_decode_error() {
        let (pipeline, _, _, _) = pipeline(
            MockStage::new(StageKind::SpeechToText, vec![MockResponse::text("q")]),
            MockStage::new(StageKind::KnowledgeEngine, vec![MockResponse::text("a")]),
            MockStage::new(
                StageKind::SpeechSynthesis,
                vec![MockResponse::Output(Bytes::from_static(b"not json"))],
            ),
        );

        let err = pipeline.run(Bytes::from_static(b"audio")).await.unwrap_err();
        assert!(matches!(
            err,
            StageError::Decode {
                stage: StageKind::SpeechSynthesis,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn echoing_knowledge_engine_preserves_text() {
        // Stage 2 echoes its input; the text payload from stage 1 passes
        // through unchanged to stage 3.
        let (pipeline, _, _, _) = pipeline(
            MockStage::new(StageKind::SpeechToText, vec![MockResponse::text("T")]),
            MockStage::echo(StageKind::KnowledgeEngine),
            MockStage::echo(StageKind::SpeechSynthesis),
        );

        let out = pipeline.run(Bytes::from_static(b"audio")).await.unwrap();
        assert_eq!(out, serde_json::json!({ "text": "T" }));
    }

    #[tokio::test]
    async fn identical_input_classifies_identically() {
        let (pipeline, _, _, _) = pipeline(
            MockStage::echo(StageKind::SpeechToText),
            MockStage::echo(StageKind::KnowledgeEngine),
            MockStage::echo(StageKind::SpeechSynthesis),
        );

        let input = Bytes::from_static(br#"{"speech":"YQ=="}"#);
        let first = pipeline.run(input.clone()).await;
        let second = pipeline.run(input).await;
        assert_eq!(first.is_ok(), second.is_ok());
        assert_eq!(first.unwrap(), second.unwrap());
    }

    #[tokio::test]
    async fn metrics_record_stage_latency_and_outcome() {
        let recorder = Arc::new(MetricsRecorder::new());
        let (pipeline, _, _, _) = pipeline(
            MockStage::new(StageKind::SpeechToText, vec![MockResponse::text("q")]),
            MockStage::new(StageKind::KnowledgeEngine, vec![MockResponse::text("a")]),
            MockStage::new(
                StageKind::SpeechSynthesis,
                vec![MockResponse::json(&speech_json("YQ=="))],
            ),
        );
        let pipeline = pipeline.with_metrics(recorder.clone());

        pipeline.run(Bytes::from_static(b"audio")).await.unwrap();

        assert_eq!(
            recorder.counter_value("vox_pipeline_requests_total", &[("outcome", "ok")]),
            1
        );
        assert_eq!(
            recorder
                .histogram_summary("vox_stage_latency_ms", &[("stage", "stt")])
                .count,
            1
        );
    }
}
