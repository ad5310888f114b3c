use std::sync::Arc;

use clap::{Parser, Subcommand};

use vox_backends::service::{alpha_router, stt_router, tts_router};
use vox_backends::{
    KnowledgeClient, KnowledgeConfig, RecognizerConfig, SpeechRecognizer, SpeechSynthesizer,
    SynthesizerConfig,
};
use vox_core::PipelineConfig;
use vox_gateway::{GatewayConfig, VoicePipeline};
use vox_telemetry::{init_telemetry, TelemetryConfig};

#[derive(Parser)]
#[command(name = "vox", about = "Voice-assistant request pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the orchestrator gateway
    Gateway {
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
    /// Run the speech-to-text backend listener
    Stt {
        #[arg(long, default_value_t = 3002)]
        port: u16,
    },
    /// Run the knowledge-engine backend listener
    Alpha {
        #[arg(long, default_value_t = 3001)]
        port: u16,
    },
    /// Run the speech-synthesis backend listener
    Tts {
        #[arg(long, default_value_t = 3003)]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let telemetry = init_telemetry(TelemetryConfig::default());

    match cli.command {
        Command::Gateway { port } => {
            let config = PipelineConfig::from_env();
            let mut pipeline = VoicePipeline::from_config(&config);
            if let Some(metrics) = telemetry.metrics() {
                pipeline = pipeline.with_metrics(metrics);
            }

            let handle = vox_gateway::start(
                GatewayConfig {
                    port,
                    ..Default::default()
                },
                Arc::new(pipeline),
                telemetry.metrics(),
            )
            .await
            .expect("failed to start gateway");
            tracing::info!(port = handle.port, "vox gateway ready");
        }
        Command::Stt { port } => {
            let config = RecognizerConfig::from_env().expect("recognizer configuration");
            let recognizer = Arc::new(SpeechRecognizer::new(config));
            let handle = vox_backends::start_service(stt_router(recognizer), port)
                .await
                .expect("failed to start stt listener");
            tracing::info!(port = handle.port, "speech-to-text listener ready");
        }
        Command::Alpha { port } => {
            let config = KnowledgeConfig::from_env().expect("knowledge-engine configuration");
            let client = Arc::new(KnowledgeClient::new(config));
            let handle = vox_backends::start_service(alpha_router(client), port)
                .await
                .expect("failed to start alpha listener");
            tracing::info!(port = handle.port, "knowledge-engine listener ready");
        }
        Command::Tts { port } => {
            let config = SynthesizerConfig::from_env().expect("synthesizer configuration");
            let synthesizer = Arc::new(SpeechSynthesizer::new(config));
            let handle = vox_backends::start_service(tts_router(synthesizer), port)
                .await
                .expect("failed to start tts listener");
            tracing::info!(port = handle.port, "speech-synthesis listener ready");
        }
    }

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl+c");

    tracing::info!("shutting down");
}
