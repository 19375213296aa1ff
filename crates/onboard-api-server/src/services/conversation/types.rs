use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::models::chat::{ChatMessage, SessionId};

use super::prompts;

/// Coarse persona bucket, assigned at most once per session from keyword
/// heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    Newcomer,
    Enthusiast,
    Builder,
    Creative,
    Trader,
}

impl Persona {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Newcomer => "newcomer",
            Self::Enthusiast => "enthusiast",
            Self::Builder => "builder",
            Self::Creative => "creative",
            Self::Trader => "trader",
        }
    }
}

/// Self-reported experience tier from the initialize profile hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperienceTier {
    Beginner,
    Intermediate,
    Advanced,
}

impl ExperienceTier {
    pub fn parse(hint: &str) -> Option<Self> {
        match hint.trim().to_lowercase().as_str() {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }
}

/// Per-session user profile. The authenticated flag is flipped externally,
/// never by the conversation manager.
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub persona: Option<Persona>,
    pub interaction_count: u32,
    pub authenticated: bool,
}

/// Complete conversation state held in the session cache.
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub session_id: SessionId,

    /// Ordered log. Index 0 is always the base persona system message and is
    /// never evicted.
    pub messages: Vec<ChatMessage>,

    pub profile: UserProfile,

    /// The speculation redirect fires at most once per session.
    pub guidance_injected: bool,

    /// Session creation time (absolute expiration)
    pub created_at: Instant,

    /// Last activity timestamp (for monitoring)
    pub last_activity: Instant,
}

impl ConversationState {
    pub fn new(session_id: SessionId) -> Self {
        let now = Instant::now();
        Self {
            session_id,
            messages: vec![ChatMessage::system(prompts::BASE_SYSTEM_PROMPT)],
            profile: UserProfile::default(),
            guidance_injected: false,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Retain the anchor plus the `retain_recent` most recent entries once
    /// the log grows past `history_cap`. Never drops index 0.
    pub fn enforce_window(&mut self, history_cap: usize, retain_recent: usize) {
        if self.messages.len() <= history_cap {
            return;
        }

        let tail_start = self.messages.len() - retain_recent.min(self.messages.len() - 1);
        let mut trimmed = Vec::with_capacity(retain_recent + 1);
        trimmed.push(self.messages[0].clone());
        trimmed.extend_from_slice(&self.messages[tail_start..]);
        self.messages = trimmed;
    }

    pub fn anchor(&self) -> &ChatMessage {
        &self.messages[0]
    }
}
