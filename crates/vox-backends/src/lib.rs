pub mod http;
pub mod knowledge;
pub mod mock;
pub mod recognizer;
pub mod service;
pub mod synthesizer;

pub use http::{default_client, HttpStage};
pub use knowledge::{KnowledgeClient, KnowledgeConfig};
pub use recognizer::{RecognizerConfig, SpeechRecognizer};
pub use service::{start_service, ServiceHandle};
pub use synthesizer::{SpeechSynthesizer, SynthesizerConfig};
