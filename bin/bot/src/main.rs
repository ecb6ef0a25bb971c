//! Process bootstrap for the copper-sparrow assistant service.

mod config;
mod extract;
mod gateway;
mod reminders;
mod stats;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use copper_sparrow_ai::{Analyzer, ChatProvider, Engine, GeminiProvider, GroqProvider};
use copper_sparrow_conversation::ContextStore;
use copper_sparrow_dispatch::Dispatcher;
use copper_sparrow_recap::{ActivitySink, RecapManager, StatsSource};
use copper_sparrow_tools::builtin_tools;
use copper_sparrow_transport::{InboundEvent, MediaFetcher, MessageSender};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::BotConfig;
use crate::extract::PlainTextExtractor;
use crate::gateway::HttpGateway;
use crate::reminders::{InMemoryReminderStore, spawn_reminder_delivery};
use crate::stats::ActivityLog;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = BotConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    // Conversation state and collaborators
    let store = Arc::new(ContextStore::with_limits(
        config.context.max_turns,
        config.context.max_chars,
    ));
    let reminder_store = Arc::new(InMemoryReminderStore::new());
    let registry = Arc::new(builtin_tools(&config.tools, reminder_store.clone()));
    tracing::info!(tools = ?registry.names(), "tool registry ready");

    let gateway = Arc::new(HttpGateway::new(
        &config.gateway,
        config.tools.scratch_dir.clone(),
    ));

    // Providers: primary first, fallback second
    let gemini = Arc::new(GeminiProvider::new(
        config.ai.gemini.api_key.clone(),
        config.ai.gemini.model.clone(),
    ));
    let groq = Arc::new(GroqProvider::new(
        config.ai.groq.api_key.clone(),
        config.ai.groq.model.clone(),
        config.ai.groq.fast_model.clone(),
    ));

    let mut engine = Engine::new(
        vec![
            gemini.clone() as Arc<dyn ChatProvider>,
            groq.clone() as Arc<dyn ChatProvider>,
        ],
        registry.clone(),
        store.clone(),
        gateway.clone() as Arc<dyn MessageSender>,
        gateway.clone() as Arc<dyn MediaFetcher>,
    );
    if let Some(prompt) = &config.ai.system_prompt {
        engine = engine.with_system_prompt(prompt);
    }
    let engine = Arc::new(engine);

    let activity = Arc::new(ActivityLog::new());
    let recap = Arc::new(RecapManager::new(
        activity.clone() as Arc<dyn StatsSource>,
        groq.clone() as Arc<dyn Analyzer>,
    ));

    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        engine,
        recap,
        registry,
        gateway.clone() as Arc<dyn MessageSender>,
        groq as Arc<dyn Analyzer>,
        Arc::new(PlainTextExtractor),
        activity as Arc<dyn ActivitySink>,
        config.tools.scratch_dir.clone(),
    ));

    // Periodic reminder delivery
    let _reminder_task = spawn_reminder_delivery(
        reminder_store,
        gateway as Arc<dyn MessageSender>,
        store,
        Duration::from_secs(config.reminders.poll_interval_seconds),
    );

    let app = Router::new()
        .route("/", get(health))
        .route("/inbound", post(inbound))
        .with_state(dispatcher);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind to address");
    tracing::info!("listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn health() -> &'static str {
    "copper-sparrow is live"
}

/// Accepts one inbound transport event and processes it off the request
/// path; the gateway only needs delivery acknowledgement.
async fn inbound(
    State(dispatcher): State<Arc<Dispatcher>>,
    Json(event): Json<InboundEvent>,
) -> StatusCode {
    tokio::spawn(async move {
        dispatcher.handle(event).await;
    });
    StatusCode::ACCEPTED
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for shutdown signal");
    }
}
