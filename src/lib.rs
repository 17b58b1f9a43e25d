pub mod config;
pub mod error;
pub mod facade;
pub mod host;
pub mod models;
pub mod services;
pub mod workflow;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use facade::PeerEngine;
pub use host::{Host, NullHost};
pub use services::resolver::{AnthropicLlmClient, LlmClient};

/// Initializes the crate's `env_logger` subscriber. Safe to call more than
/// once; only the first call has an effect.
pub fn init_logging() {
    let _ = env_logger::try_init();
}
