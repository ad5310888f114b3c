pub mod config;
pub mod errors;
pub mod payloads;
pub mod stage;

pub use config::{ApiKey, PipelineConfig, StageEndpoint};
pub use errors::StageError;
pub use stage::{Stage, StageKind};
