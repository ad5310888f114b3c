pub mod handlers;
pub mod pipeline;
pub mod server;

pub use pipeline::VoicePipeline;
pub use server::{build_router, start, AppState, GatewayConfig, ServerHandle};
