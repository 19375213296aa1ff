pub mod cache;
pub mod classifier;
pub mod manager;
pub mod prompts;
pub mod types;

pub use cache::SessionCache;
pub use manager::ConversationManager;
pub use types::{ConversationState, ExperienceTier, Persona, UserProfile};
