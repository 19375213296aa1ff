use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;

use crate::models::chat::SessionId;

/// Persona side-effect events. Downstream consumers (team notifications,
/// minting flows, trading-signal intake) subscribe and react off the request
/// path; publishing never delays or fails a turn.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
#[serde(rename_all = "snake_case")]
pub enum AgentEvent {
    PartnershipInterest { message: String },
    ShowcaseInterest { message: String },
    TradingContribution { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionEvent {
    pub session_id: SessionId,
    pub event: AgentEvent,
}

pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, session_id: SessionId, event: AgentEvent) {
        let session_event = SessionEvent { session_id, event };
        if let Err(e) = self.tx.send(session_event) {
            warn!("Failed to publish event (maybe no subscribers): {}", e);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}
