use flume::{bounded, Receiver, Sender};
use tracing::{info, warn};

use super::types::ActivityLog;

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Queue capacity (max entries in memory before drops)
    pub queue_capacity: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
        }
    }
}

/// Async activity logger. Callers enqueue and move on; a background worker
/// drains the queue and emits structured tracing events, so logging never
/// sits on the request path.
#[derive(Clone)]
pub struct ActivityLogger {
    sender: Sender<ActivityLog>,
}

impl ActivityLogger {
    pub fn new(config: LoggerConfig) -> Self {
        let (sender, receiver) = bounded(config.queue_capacity);

        info!(
            "Initializing ActivityLogger: queue={}",
            config.queue_capacity
        );

        tokio::spawn(async move {
            Self::worker_loop(receiver).await;
        });

        Self { sender }
    }

    /// Log activity (non-blocking, fire-and-forget)
    pub fn log(&self, activity: ActivityLog) {
        if let Err(e) = self.sender.try_send(activity) {
            warn!("Failed to enqueue activity log (queue full?): {}", e);
        }
    }

    async fn worker_loop(receiver: Receiver<ActivityLog>) {
        while let Ok(activity) = receiver.recv_async().await {
            Self::emit(&activity);
        }
        info!("Activity logger worker shutting down");
    }

    fn emit(activity: &ActivityLog) {
        let payload = serde_json::to_string(activity)
            .unwrap_or_else(|e| format!("{{\"serialize_error\":\"{}\"}}", e));
        info!(
            target: "activity",
            session_id = %activity.session_id,
            activity = activity.activity_type.as_str(),
            status = activity.activity_status.as_str(),
            %payload,
        );
    }
}
