use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use botfsm_backend::api::{self, AppState};
use botfsm_backend::config::Config;
use botfsm_backend::engine::config::DEFAULT_INITIAL_HEALTH;
use botfsm_backend::engine::BotRegistry;
use botfsm_backend::events::EventHub;
use botfsm_backend::metrics;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load();
    metrics::register_metrics();

    let registry = Arc::new(BotRegistry::with_monotonic_clock(config.rng_seed));
    tracing::info!(seed = registry.seed(), "Bot registry ready");
    let state = AppState::new(registry, EventHub::new(config.event_buffer));

    for _ in 0..config.seed_bots {
        match state.create_bot(i64::from(DEFAULT_INITIAL_HEALTH)) {
            Ok(bot) => tracing::info!("Seeded bot {}", bot.bot_id),
            Err(e) => tracing::error!("Failed to seed bot: {e}"),
        }
    }

    let app = api::router(state, config.static_dir.clone()).layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        tracing::error!("Failed to bind to {addr}: {e}");
        e
    })?;

    tracing::info!("Bot FSM backend listening on {addr}");
    axum::serve(listener, app).await.map_err(|e| {
        tracing::error!("Server error: {e}");
        e
    })
}
