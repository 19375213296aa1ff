pub mod settings;

pub use settings::{AgentConfig, LlmConfig, LoggingConfig, ServerConfig, Settings};
