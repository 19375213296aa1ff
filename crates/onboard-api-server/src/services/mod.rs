pub mod conversation;
pub mod event_bus;
pub mod llm_service;

pub use conversation::ConversationManager;
pub use event_bus::EventBus;
pub use llm_service::LlmService;
