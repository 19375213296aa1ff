use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

/// Knobs the source variants disagreed on: trimming thresholds, guest limit
/// and whether `initialize` round-trips to the model.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentConfig {
    /// Trim once the log grows past this many entries
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    /// Entries kept behind the anchor system message after a trim
    #[serde(default = "default_retain_recent")]
    pub retain_recent: usize,
    /// Unauthenticated turns allowed before the authenticate prompt
    #[serde(default = "default_guest_turn_limit")]
    pub guest_turn_limit: u32,
    /// When true, `initialize` with a known experience tier asks the model
    /// for the greeting instead of returning the fixed one
    #[serde(default)]
    pub llm_greeting: bool,
    /// Idle session lifetime before lazy eviction
    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: u64,
    /// Hard bound on concurrently cached sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> usize {
    1024
}

fn default_timeout() -> u64 {
    30
}

fn default_history_cap() -> usize {
    12
}

fn default_retain_recent() -> usize {
    10
}

fn default_guest_turn_limit() -> u32 {
    10
}

fn default_session_ttl() -> u64 {
    6 * 60 * 60
}

fn default_max_sessions() -> usize {
    10_000
}

fn default_queue_capacity() -> usize {
    10_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            history_cap: default_history_cap(),
            retain_recent: default_retain_recent(),
            guest_turn_limit: default_guest_turn_limit(),
            llm_greeting: false,
            session_ttl_seconds: default_session_ttl(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }
}
