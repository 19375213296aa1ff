use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::info;

use onboard_api_server::config::Settings;
use onboard_api_server::handlers;
use onboard_api_server::logging::{ActivityLogger, LoggerConfig};
use onboard_api_server::services::{ConversationManager, EventBus, LlmService};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,onboard_api_server=debug".to_string()),
        )
        .with_target(true)
        .json()
        .init();

    info!("Starting onboarding API server...");

    // Load configuration
    let settings = Settings::load()?;
    info!("Configuration loaded");

    let logger = ActivityLogger::new(LoggerConfig {
        queue_capacity: settings.logging.queue_capacity,
    });

    let event_bus = Arc::new(EventBus::new(256));
    spawn_event_consumer(event_bus.clone());

    let llm_service = LlmService::new(settings.llm.clone())?;

    let manager = Arc::new(ConversationManager::new(
        Box::new(llm_service),
        event_bus,
        logger,
        settings.agent.clone(),
    ));

    // Background sweep for expired sessions
    spawn_session_sweeper(manager.clone());

    let app = build_router(manager);

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(manager: Arc<ConversationManager>) -> Router {
    let api_routes = Router::new()
        .route("/api/initialize", post(handlers::chat::initialize_handler))
        .route("/api/chat", post(handlers::chat::chat_handler))
        .layer(Extension(manager));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check))
        .merge(api_routes)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false)),
        )
}

/// Drain persona side-effect events. Stands in for the external
/// notification/workflow integrations; failures never reach the chat path.
fn spawn_event_consumer(event_bus: Arc<EventBus>) {
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    info!(
                        target: "hooks",
                        session_id = %event.session_id,
                        "Dispatching side-effect: {:?}",
                        event.event
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!("Event consumer lagged, {} events dropped", missed);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

fn spawn_session_sweeper(manager: Arc<ConversationManager>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(600));
        loop {
            interval.tick().await;
            let removed = manager.cleanup_expired_sessions();
            let stats = manager.cache_stats();
            if removed > 0 {
                info!(
                    "Session sweep: removed {}, {} active",
                    removed, stats.active_sessions
                );
            }
        }
    });
}
