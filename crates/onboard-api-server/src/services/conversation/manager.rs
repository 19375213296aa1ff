use std::sync::Arc;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::config::AgentConfig;
use crate::logging::{ActivityLog, ActivityLogger, ActivityStatus, ActivityType};
use crate::models::chat::{ChatMessage, SessionId};
use crate::services::event_bus::{AgentEvent, EventBus};
use crate::services::llm_service::ChatCompletionProvider;

use super::cache::SessionCache;
use super::classifier;
use super::prompts;
use super::types::{ConversationState, ExperienceTier, Persona};

/// Substrings that pull the redirect-away-from-speculation system message.
const SPECULATION_TRIGGERS: [&str; 4] = ["token", "price", "promise", "moon"];

static BUILDER_HOOK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)partner|build|collaborate").unwrap());
static CREATIVE_HOOK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)mint|upload|my artwork|my music").unwrap());
static TRADER_HOOK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)train ai|calls|analysis").unwrap());

/// Owns the session cache and runs the per-turn pipeline: guest gate,
/// persona classification, guidance injection, the model round-trip,
/// side-effect dispatch and window trimming.
pub struct ConversationManager {
    cache: SessionCache,
    llm_provider: Box<dyn ChatCompletionProvider>,
    event_bus: Arc<EventBus>,
    logger: ActivityLogger,
    config: AgentConfig,
}

impl ConversationManager {
    pub fn new(
        llm_provider: Box<dyn ChatCompletionProvider>,
        event_bus: Arc<EventBus>,
        logger: ActivityLogger,
        config: AgentConfig,
    ) -> Self {
        let cache = SessionCache::new(
            Duration::from_secs(config.session_ttl_seconds),
            config.max_sessions,
        );
        Self {
            cache,
            llm_provider,
            event_bus,
            logger,
            config,
        }
    }

    /// Start a session and produce the greeting. With an experience-tier hint
    /// and the LLM-greeting policy enabled, the greeting comes from a
    /// `[base, tier welcome]` round-trip; otherwise it is the fixed literal.
    /// A failed round-trip degrades to the fallback string, never an error.
    pub async fn initialize(
        &self,
        experience_tier: Option<&str>,
        authenticated: bool,
    ) -> anyhow::Result<(SessionId, String)> {
        let session_id = SessionId::new_v4();
        let state = self.cache.create(session_id)?;
        let mut state = state.lock().await;
        state.profile.authenticated = authenticated;

        self.logger.log(
            ActivityLog::builder(session_id, ActivityType::SessionCreated)
                .status(ActivityStatus::Info)
                .build(),
        );

        let tier = experience_tier.and_then(ExperienceTier::parse);
        let greeting = match (self.config.llm_greeting, tier) {
            (true, Some(tier)) => self.greet_via_model(&mut state, tier).await,
            _ => prompts::DEFAULT_GREETING.to_string(),
        };

        self.logger.log(
            ActivityLog::builder(session_id, ActivityType::GreetingSent)
                .response(&greeting)
                .build(),
        );

        Ok((session_id, greeting))
    }

    async fn greet_via_model(&self, state: &mut ConversationState, tier: ExperienceTier) -> String {
        let welcome = ChatMessage::system(prompts::tier_welcome(tier));
        let request = vec![state.anchor().clone(), welcome.clone()];

        match self.llm_provider.complete(&request).await {
            Ok(content) => {
                let greeting = content.flatten();
                state.messages.push(welcome);
                state.messages.push(ChatMessage::assistant(&greeting));
                greeting
            }
            Err(e) => {
                error!("Greeting round-trip failed: {}", e);
                self.logger.log(
                    ActivityLog::builder(state.session_id, ActivityType::LlmError)
                        .error(&e.to_string())
                        .build(),
                );
                prompts::GREETING_FALLBACK.to_string()
            }
        }
    }

    /// Resolve the session (allocating a fresh one for unknown or missing
    /// ids) and run one turn. Turns for a session serialize on its lock; the
    /// model round-trip happens inside it, so one in-flight call per session.
    pub async fn process_user_input(
        &self,
        session_id: Option<SessionId>,
        input: &str,
    ) -> anyhow::Result<(SessionId, String)> {
        let (session_id, state) = self.get_or_create_session(session_id).await?;
        let mut state = state.lock().await;
        let reply = self.run_turn(&mut state, input).await;
        Ok((session_id, reply))
    }

    async fn get_or_create_session(
        &self,
        session_id: Option<SessionId>,
    ) -> anyhow::Result<(SessionId, Arc<Mutex<ConversationState>>)> {
        if let Some(id) = session_id {
            if let Some(state) = self.cache.get(id) {
                return Ok((id, state));
            }
            debug!("Unknown or expired session {}, allocating fresh one", id);
        }

        let id = SessionId::new_v4();
        let state = self.cache.create(id)?;
        self.logger.log(
            ActivityLog::builder(id, ActivityType::SessionCreated)
                .status(ActivityStatus::Info)
                .build(),
        );
        Ok((id, state))
    }

    /// One conversation turn. Every path returns a user-facing string.
    async fn run_turn(&self, state: &mut ConversationState, input: &str) -> String {
        let start = Instant::now();
        let session_id = state.session_id;

        // Guest gate: the call that would become the guest_turn_limit-th
        // interaction is denied while unauthenticated. No model call, no log
        // mutation, no counter bump.
        if !state.profile.authenticated
            && state.profile.interaction_count + 1 >= self.config.guest_turn_limit
        {
            self.logger.log(
                ActivityLog::builder(session_id, ActivityType::GuestLimitReached)
                    .status(ActivityStatus::Warning)
                    .interaction_count(state.profile.interaction_count)
                    .build(),
            );
            return prompts::AUTH_PROMPT.to_string();
        }

        // Snapshot for wholesale rollback if the model call fails.
        let log_len = state.messages.len();
        let persona_before = state.profile.persona;
        let guidance_before = state.guidance_injected;

        // Classification happens at most once per session.
        if state.profile.persona.is_none() {
            if let Some(persona) = classifier::classify(input) {
                state.profile.persona = Some(persona);
                state
                    .messages
                    .push(ChatMessage::system(prompts::confirmation_prompt(persona)));
                state
                    .messages
                    .push(ChatMessage::system(prompts::persona_guidance(persona)));

                self.logger.log(
                    ActivityLog::builder(session_id, ActivityType::PersonaClassified)
                        .persona(persona.as_str())
                        .build(),
                );
            }
        }

        state.messages.push(ChatMessage::user(input));

        // The speculation redirect fires on the first trigger only, however
        // many trigger words the input contains.
        if !state.guidance_injected && mentions_speculation(input) {
            state.guidance_injected = true;
            state
                .messages
                .push(ChatMessage::system(prompts::SPECULATION_GUIDANCE));
            self.logger.log(
                ActivityLog::builder(session_id, ActivityType::GuidanceInjected).build(),
            );
        }

        let reply = match self.llm_provider.complete(&state.messages).await {
            Ok(content) => content.flatten(),
            Err(e) => {
                error!("Model call failed: {}", e);
                self.logger.log(
                    ActivityLog::builder(session_id, ActivityType::LlmError)
                        .error(&e.to_string())
                        .build(),
                );

                // No partial append: restore the log and the one-way flags to
                // their pre-turn values. The turn still counts.
                state.messages.truncate(log_len);
                state.profile.persona = persona_before;
                state.guidance_injected = guidance_before;
                state.profile.interaction_count += 1;
                state.touch();
                return prompts::TURN_FALLBACK.to_string();
            }
        };

        state.messages.push(ChatMessage::assistant(&reply));

        self.dispatch_hooks(state, input);

        let before_trim = state.messages.len();
        state.enforce_window(self.config.history_cap, self.config.retain_recent);
        if state.messages.len() < before_trim {
            info!(
                "Trimmed session {} log: {} -> {} entries",
                session_id,
                before_trim,
                state.messages.len()
            );
            self.logger.log(
                ActivityLog::builder(session_id, ActivityType::WindowTrimmed)
                    .interaction_count(state.profile.interaction_count)
                    .build(),
            );
        }

        state.profile.interaction_count += 1;
        state.touch();

        self.logger.log(
            ActivityLog::builder(session_id, ActivityType::MessageSent)
                .message(input)
                .response(&reply)
                .interaction_count(state.profile.interaction_count)
                .processing_time(start.elapsed().as_millis() as i64)
                .build(),
        );

        reply
    }

    /// Persona side-effects go out through the event bus, fire-and-forget;
    /// at most one publish per matching turn.
    fn dispatch_hooks(&self, state: &ConversationState, input: &str) {
        let event = match state.profile.persona {
            Some(Persona::Builder) if BUILDER_HOOK.is_match(input) => {
                Some(AgentEvent::PartnershipInterest {
                    message: input.to_string(),
                })
            }
            Some(Persona::Creative) if CREATIVE_HOOK.is_match(input) => {
                Some(AgentEvent::ShowcaseInterest {
                    message: input.to_string(),
                })
            }
            Some(Persona::Trader) if TRADER_HOOK.is_match(input) => {
                Some(AgentEvent::TradingContribution {
                    message: input.to_string(),
                })
            }
            _ => None,
        };

        if let Some(event) = event {
            self.event_bus.publish(state.session_id, event);
            self.logger.log(
                ActivityLog::builder(state.session_id, ActivityType::HookDispatched)
                    .persona(
                        state
                            .profile
                            .persona
                            .map(|p| p.as_str())
                            .unwrap_or("unclassified"),
                    )
                    .build(),
            );
        }
    }

    pub fn cache_stats(&self) -> super::cache::CacheStats {
        self.cache.stats()
    }

    pub fn cleanup_expired_sessions(&self) -> usize {
        self.cache.cleanup_expired()
    }
}

fn mentions_speculation(input: &str) -> bool {
    let lower = input.to_lowercase();
    SPECULATION_TRIGGERS
        .iter()
        .any(|trigger| lower.contains(trigger))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::{MessageContent, Role};
    use crate::services::llm_service::MockChatCompletionProvider;

    fn test_config() -> AgentConfig {
        AgentConfig {
            history_cap: 12,
            retain_recent: 10,
            guest_turn_limit: 10,
            llm_greeting: false,
            session_ttl_seconds: 3600,
            max_sessions: 100,
        }
    }

    fn manager_with(provider: MockChatCompletionProvider, config: AgentConfig) -> ConversationManager {
        ConversationManager::new(
            Box::new(provider),
            Arc::new(EventBus::new(16)),
            ActivityLogger::new(Default::default()),
            config,
        )
    }

    fn replying_provider(reply: &'static str, times: usize) -> MockChatCompletionProvider {
        let mut provider = MockChatCompletionProvider::new();
        provider
            .expect_complete()
            .times(times)
            .returning(move |_| Ok(MessageContent::Text(reply.to_string())));
        provider
    }

    async fn fresh_state(manager: &ConversationManager) -> (SessionId, Arc<Mutex<ConversationState>>) {
        manager.get_or_create_session(None).await.unwrap()
    }

    #[tokio::test]
    async fn test_anchor_survives_many_turns() {
        let manager = manager_with(replying_provider("ok", 20), test_config());
        let (_, state) = fresh_state(&manager).await;

        for i in 0..20 {
            let mut guard = state.lock().await;
            guard.profile.authenticated = true;
            manager.run_turn(&mut guard, &format!("hello {}", i)).await;
        }

        let guard = state.lock().await;
        assert_eq!(guard.anchor().role, Role::System);
        assert_eq!(guard.anchor().content, prompts::BASE_SYSTEM_PROMPT);
        assert!(guard.messages.len() <= 12);
    }

    #[tokio::test]
    async fn test_newcomer_classification_injects_two_system_messages() {
        let manager = manager_with(replying_provider("welcome!", 1), test_config());
        let (_, state) = fresh_state(&manager).await;
        let mut guard = state.lock().await;

        manager
            .run_turn(&mut guard, "I'm new here, what is crypto?")
            .await;

        assert_eq!(guard.profile.persona, Some(Persona::Newcomer));
        // anchor, confirmation, guidance, user, assistant
        assert_eq!(guard.messages.len(), 5);
        assert_eq!(guard.messages[1].role, Role::System);
        assert_eq!(guard.messages[2].role, Role::System);
        assert_eq!(guard.messages[3].role, Role::User);
        assert_eq!(guard.messages[4].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_classification_is_idempotent() {
        let manager = manager_with(replying_provider("sure", 2), test_config());
        let (_, state) = fresh_state(&manager).await;
        let mut guard = state.lock().await;

        manager.run_turn(&mut guard, "I'm a trader, I do charts").await;
        assert_eq!(guard.profile.persona, Some(Persona::Trader));
        let system_count = |msgs: &[ChatMessage]| {
            msgs.iter().filter(|m| m.role == Role::System).count()
        };
        let after_first = system_count(&guard.messages);

        // Another classifiable input must not re-classify or re-inject.
        manager.run_turn(&mut guard, "also I'm an artist").await;
        assert_eq!(guard.profile.persona, Some(Persona::Trader));
        assert_eq!(system_count(&guard.messages), after_first);
    }

    #[tokio::test]
    async fn test_speculation_guidance_fires_once() {
        let manager = manager_with(replying_provider("hm", 2), test_config());
        let (_, state) = fresh_state(&manager).await;
        let mut guard = state.lock().await;

        manager.run_turn(&mut guard, "what's the token price").await;
        manager.run_turn(&mut guard, "any promises?").await;

        let guidance_count = guard
            .messages
            .iter()
            .filter(|m| m.content == prompts::SPECULATION_GUIDANCE)
            .count();
        assert_eq!(guidance_count, 1);
        assert!(guard.guidance_injected);
    }

    #[tokio::test]
    async fn test_guest_gate_blocks_without_model_call() {
        let mut config = test_config();
        config.guest_turn_limit = 3;
        // threshold-1 completions allowed; the threshold-th call must not
        // reach the provider.
        let manager = manager_with(replying_provider("yo", 2), config);
        let (_, state) = fresh_state(&manager).await;
        let mut guard = state.lock().await;

        for _ in 0..2 {
            let reply = manager.run_turn(&mut guard, "hi").await;
            assert_ne!(reply, prompts::AUTH_PROMPT);
        }
        let len_before = guard.messages.len();

        let reply = manager.run_turn(&mut guard, "one more").await;
        assert_eq!(reply, prompts::AUTH_PROMPT);
        assert_eq!(guard.messages.len(), len_before);
        assert_eq!(guard.profile.interaction_count, 2);

        // stays gated on later calls too
        let reply = manager.run_turn(&mut guard, "still me").await;
        assert_eq!(reply, prompts::AUTH_PROMPT);
    }

    #[tokio::test]
    async fn test_authenticated_user_passes_gate() {
        let mut config = test_config();
        config.guest_turn_limit = 1;
        let manager = manager_with(replying_provider("always here", 5), config);
        let (_, state) = fresh_state(&manager).await;
        let mut guard = state.lock().await;
        guard.profile.authenticated = true;

        for _ in 0..5 {
            let reply = manager.run_turn(&mut guard, "hi").await;
            assert_eq!(reply, "always here");
        }
    }

    #[tokio::test]
    async fn test_model_failure_returns_fallback_and_rolls_back() {
        let mut provider = MockChatCompletionProvider::new();
        provider
            .expect_complete()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("connection refused")));
        let manager = manager_with(provider, test_config());
        let (_, state) = fresh_state(&manager).await;
        let mut guard = state.lock().await;
        let len_before = guard.messages.len();

        let reply = manager.run_turn(&mut guard, "I'm new, help me").await;

        assert_eq!(reply, prompts::TURN_FALLBACK);
        assert_eq!(guard.messages.len(), len_before);
        // classification rolled back with the log, but the turn still counted
        assert_eq!(guard.profile.persona, None);
        assert_eq!(guard.profile.interaction_count, 1);
    }

    #[tokio::test]
    async fn test_trimming_keeps_anchor_plus_recent_window() {
        let manager = manager_with(replying_provider("reply", 10), test_config());
        let (_, state) = fresh_state(&manager).await;
        let mut guard = state.lock().await;
        guard.profile.authenticated = true;

        for i in 0..10 {
            manager.run_turn(&mut guard, &format!("turn {}", i)).await;
        }

        // cap 12 / window 10: 1 anchor + 10 most recent
        assert_eq!(guard.messages.len(), 11);
        assert_eq!(guard.anchor().content, prompts::BASE_SYSTEM_PROMPT);
        let last = guard.messages.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_builder_partnership_publishes_event() {
        let manager = manager_with(replying_provider("nice", 2), test_config());
        let mut rx = manager.event_bus.subscribe();
        let (session_id, state) = fresh_state(&manager).await;
        let mut guard = state.lock().await;

        // Classifies as Builder and matches the partnership pattern.
        manager
            .run_turn(&mut guard, "I'm a developer, want to partner up?")
            .await;

        let event = rx.try_recv().unwrap();
        assert_eq!(event.session_id, session_id);
        assert!(matches!(event.event, AgentEvent::PartnershipInterest { .. }));

        // Non-matching builder input publishes nothing.
        manager.run_turn(&mut guard, "what's the weather").await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fragment_reply_is_flattened() {
        let mut provider = MockChatCompletionProvider::new();
        provider.expect_complete().times(1).returning(|_| {
            Ok(MessageContent::Fragments(vec![
                crate::models::chat::ContentFragment::Text {
                    text: "hello".to_string(),
                },
                crate::models::chat::ContentFragment::Text {
                    text: "there".to_string(),
                },
            ]))
        });
        let manager = manager_with(provider, test_config());
        let (_, state) = fresh_state(&manager).await;
        let mut guard = state.lock().await;

        let reply = manager.run_turn(&mut guard, "hey").await;
        assert_eq!(reply, "hello there");
        assert_eq!(guard.messages.last().unwrap().content, "hello there");
    }

    #[tokio::test]
    async fn test_initialize_fixed_greeting() {
        let manager = manager_with(MockChatCompletionProvider::new(), test_config());
        let (_, greeting) = manager.initialize(None, false).await.unwrap();
        assert_eq!(greeting, prompts::DEFAULT_GREETING);
    }

    #[tokio::test]
    async fn test_initialize_llm_greeting_with_tier() {
        let mut config = test_config();
        config.llm_greeting = true;
        let mut provider = MockChatCompletionProvider::new();
        provider
            .expect_complete()
            .times(1)
            .withf(|messages| messages.len() == 2 && messages[0].role == Role::System)
            .returning(|_| Ok(MessageContent::Text("hey, fresh face".to_string())));
        let manager = manager_with(provider, config);

        let (session_id, greeting) = manager.initialize(Some("beginner"), false).await.unwrap();
        assert_eq!(greeting, "hey, fresh face");

        // The welcome exchange lands in the log behind the anchor.
        let (_, state) = manager.get_or_create_session(Some(session_id)).await.unwrap();
        let guard = state.lock().await;
        assert_eq!(guard.messages.len(), 3);
        assert_eq!(guard.messages[2].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_initialize_llm_greeting_failure_degrades() {
        let mut config = test_config();
        config.llm_greeting = true;
        let mut provider = MockChatCompletionProvider::new();
        provider
            .expect_complete()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("401 unauthorized")));
        let manager = manager_with(provider, config);

        let (_, greeting) = manager.initialize(Some("advanced"), false).await.unwrap();
        assert_eq!(greeting, prompts::GREETING_FALLBACK);
    }

    #[tokio::test]
    async fn test_unknown_tier_gets_fixed_greeting() {
        let mut config = test_config();
        config.llm_greeting = true;
        // Provider must not be called for an unknown tier.
        let manager = manager_with(MockChatCompletionProvider::new(), config);
        let (_, greeting) = manager.initialize(Some("galaxy-brain"), false).await.unwrap();
        assert_eq!(greeting, prompts::DEFAULT_GREETING);
    }

    #[test]
    fn test_mentions_speculation() {
        assert!(mentions_speculation("what's the TOKEN price"));
        assert!(mentions_speculation("to the moon"));
        assert!(!mentions_speculation("tell me about the community"));
    }
}
