use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type SessionId = Uuid;

// ===== REQUEST MODELS =====

#[derive(Debug, Deserialize)]
pub struct InitializeRequest {
    /// Optional profile hint: "beginner" | "intermediate" | "advanced"
    #[serde(default)]
    pub experience_tier: Option<String>,
    /// Set by the surrounding auth layer, never by this service
    #[serde(default)]
    pub authenticated: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<SessionId>,
    pub message: String,
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: SessionId,
    pub response: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ===== CONVERSATION LOG =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Reply content as returned by the completions backend. Some backends send a
/// single string, others a list of typed fragments.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Fragments(Vec<ContentFragment>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ContentFragment {
    Text { text: String },
    Other(serde_json::Value),
}

impl MessageContent {
    /// Total flattening: fragment texts joined by a single space, non-text
    /// fragments coerced to their JSON string form.
    pub fn flatten(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Fragments(fragments) => fragments
                .iter()
                .map(|fragment| match fragment {
                    ContentFragment::Text { text } => text.clone(),
                    ContentFragment::Other(value) => value.to_string(),
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}
