use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::chat::SessionId;

/// Activity type categories
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    SessionCreated,
    GreetingSent,
    MessageSent,
    PersonaClassified,
    GuidanceInjected,
    WindowTrimmed,
    GuestLimitReached,
    LlmError,
    HookDispatched,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionCreated => "session_created",
            Self::GreetingSent => "greeting_sent",
            Self::MessageSent => "message_sent",
            Self::PersonaClassified => "persona_classified",
            Self::GuidanceInjected => "guidance_injected",
            Self::WindowTrimmed => "window_trimmed",
            Self::GuestLimitReached => "guest_limit_reached",
            Self::LlmError => "llm_error",
            Self::HookDispatched => "hook_dispatched",
        }
    }
}

/// Activity status
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Success,
    Error,
    Warning,
    Info,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// Complete activity log entry
#[derive(Debug, Clone, Serialize)]
pub struct ActivityLog {
    pub session_id: SessionId,
    pub activity_type: ActivityType,
    pub activity_status: ActivityStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl ActivityLog {
    /// Create builder for fluent API
    pub fn builder(session_id: SessionId, activity_type: ActivityType) -> ActivityLogBuilder {
        ActivityLogBuilder::new(session_id, activity_type)
    }
}

/// Builder pattern for ActivityLog
pub struct ActivityLogBuilder {
    log: ActivityLog,
}

impl ActivityLogBuilder {
    pub fn new(session_id: SessionId, activity_type: ActivityType) -> Self {
        Self {
            log: ActivityLog {
                session_id,
                activity_type,
                activity_status: ActivityStatus::Success,
                message_content: None,
                response_content: None,
                persona: None,
                interaction_count: None,
                processing_time_ms: None,
                error_message: None,
                created_at: Utc::now(),
            },
        }
    }

    pub fn status(mut self, status: ActivityStatus) -> Self {
        self.log.activity_status = status;
        self
    }

    pub fn message(mut self, content: &str) -> Self {
        self.log.message_content = Some(content.to_string());
        self
    }

    pub fn response(mut self, content: &str) -> Self {
        self.log.response_content = Some(content.to_string());
        self
    }

    pub fn persona(mut self, persona: &str) -> Self {
        self.log.persona = Some(persona.to_string());
        self
    }

    pub fn interaction_count(mut self, count: u32) -> Self {
        self.log.interaction_count = Some(count);
        self
    }

    pub fn processing_time(mut self, ms: i64) -> Self {
        self.log.processing_time_ms = Some(ms);
        self
    }

    pub fn error(mut self, message: &str) -> Self {
        self.log.error_message = Some(message.to_string());
        self.log.activity_status = ActivityStatus::Error;
        self
    }

    pub fn build(self) -> ActivityLog {
        self.log
    }
}
