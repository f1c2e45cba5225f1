// HTTP API routes (bot lifecycle, perception updates, health changes)

pub mod ws;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{FromRequest, Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::services::ServeDir;

use crate::engine::config::DEFAULT_INITIAL_HEALTH;
use crate::engine::{lock_bot, BotError, BotRegistry, BotSnapshot, BotState, Perception};
use crate::error::ApiError;
use crate::events::{BotEvent, EventHub};
use crate::metrics;

// ── Request types ─────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CreateBotRequest {
    pub initial_health: Option<i64>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct UpdateBotRequest {
    pub player_visible: bool,
    /// `null` or absent means the distance is unknown.
    pub player_distance: Option<f64>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct DamageRequest {
    pub damage: i64,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct HealRequest {
    pub amount: i64,
}

/// JSON body where an empty body means "all defaults". Malformed JSON is
/// rejected as a validation error.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonBody(T::default()));
        }
        let Json(value) = Json::<T>::from_bytes(&bytes)?;
        Ok(JsonBody(value))
    }
}

#[derive(Serialize)]
struct SnapshotResponse<'a> {
    success: bool,
    #[serde(flatten)]
    snapshot: &'a BotSnapshot,
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<BotRegistry>,
    pub events: EventHub,
}

impl AppState {
    pub fn new(registry: Arc<BotRegistry>, events: EventHub) -> Self {
        Self { registry, events }
    }

    /// Create a bot, record it and announce it on the event feed.
    pub fn create_bot(&self, initial_health: i64) -> Result<BotSnapshot, BotError> {
        let id = self.registry.create(initial_health)?;
        let snapshot = self
            .registry
            .with_bot(&id.to_string(), |bot| bot.snapshot())?;

        metrics::BOTS_CREATED_TOTAL.inc();
        self.sync_active_gauge();
        self.events.publish(&BotEvent::Created {
            state: snapshot.clone(),
        });
        Ok(snapshot)
    }

    fn record_transition(&self, from: BotState, snapshot: &BotSnapshot) {
        metrics::BOT_TRANSITIONS_TOTAL
            .with_label_values(&[from.as_str(), snapshot.state.as_str()])
            .inc();
        self.events.publish(&BotEvent::Transition {
            bot_id: snapshot.bot_id.clone(),
            from,
            to: snapshot.state,
            reason: snapshot.reason.clone(),
        });
    }

    fn sync_active_gauge(&self) {
        metrics::BOTS_ACTIVE.set(self.registry.len() as i64);
    }
}

// ── Router ────────────────────────────────────────────────────────────

/// Build the application router. When `static_dir` is set, unmatched
/// paths are served from it instead of the JSON 404.
pub fn router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let app = Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        // Bots
        .route("/api/bots", get(list_bots).post(create_bot))
        .route("/api/bots/reset", post(reset_all_bots))
        .route("/api/bots/{id}", get(get_bot).delete(remove_bot))
        .route("/api/bots/{id}/update", post(update_bot))
        .route("/api/bots/{id}/reset", post(reset_bot))
        .route("/api/bots/{id}/damage", post(damage_bot))
        .route("/api/bots/{id}/heal", post(heal_bot))
        // WebSocket
        .route("/ws/bots", get(ws::ws_bots));

    let app = match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app.fallback(endpoint_not_found),
    };

    app.layer(middleware::from_fn(track_metrics))
        .with_state(state)
}

async fn track_metrics(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let endpoint = metrics::normalize_path(req.uri().path());
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    metrics::API_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), endpoint.as_str(), status.as_str()])
        .inc();
    metrics::API_REQUEST_DURATION_SECONDS
        .with_label_values(&[endpoint.as_str()])
        .observe(start.elapsed().as_secs_f64());
    response
}

// ── Service handlers ──────────────────────────────────────────────────

async fn index() -> Json<Value> {
    Json(json!({
        "name": "Bot FSM API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /api/bots": "List all bots",
            "POST /api/bots": "Create a new bot",
            "POST /api/bots/reset": "Reset every bot to idle",
            "GET /api/bots/{id}": "Get bot current state",
            "DELETE /api/bots/{id}": "Remove a bot",
            "POST /api/bots/{id}/update": "Update bot with player perception",
            "POST /api/bots/{id}/reset": "Reset bot to idle state",
            "POST /api/bots/{id}/damage": "Apply damage to bot",
            "POST /api/bots/{id}/heal": "Heal bot",
            "GET /ws/bots": "Live bot event feed (WebSocket)",
            "GET /metrics": "Prometheus metrics",
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "botfsm-backend" }))
}

async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

async fn endpoint_not_found() -> ApiError {
    ApiError::NotFound("Endpoint not found".into())
}

// ── Bot handlers ──────────────────────────────────────────────────────

async fn list_bots(State(state): State<AppState>) -> Json<Value> {
    let bots = state.registry.snapshots();
    Json(json!({
        "success": true,
        "bot_count": bots.len(),
        "bots": bots,
    }))
}

async fn create_bot(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateBotRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let initial_health = req
        .initial_health
        .unwrap_or(i64::from(DEFAULT_INITIAL_HEALTH));
    let snapshot = state.create_bot(initial_health)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "bot_id": snapshot.bot_id,
            "message": "Bot created successfully",
            "state": snapshot,
        })),
    ))
}

async fn get_bot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let snapshot = state.registry.with_bot(&id, |bot| bot.snapshot())?;
    Ok(Json(json!({ "success": true, "state": snapshot })))
}

async fn remove_bot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.registry.remove(&id) {
        return Err(BotError::not_found(id).into());
    }
    metrics::BOTS_REMOVED_TOTAL.inc();
    state.sync_active_gauge();
    state.events.publish(&BotEvent::Removed { bot_id: id.clone() });
    Ok(Json(json!({
        "success": true,
        "message": format!("Bot '{id}' removed successfully"),
    })))
}

async fn update_bot(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateBotRequest>,
) -> Result<Response, ApiError> {
    // Unknown ids are reported before malformed perception
    let handle = state
        .registry
        .get(&id)
        .ok_or_else(|| BotError::not_found(&id))?;
    let perception = Perception::new(req.player_visible, req.player_distance)?;

    let (from, snapshot) = {
        let mut bot = lock_bot(&handle);
        let from = bot.state();
        (from, bot.update(perception))
    };
    if from != snapshot.state {
        state.record_transition(from, &snapshot);
    }

    Ok(Json(SnapshotResponse {
        success: true,
        snapshot: &snapshot,
    })
    .into_response())
}

async fn reset_bot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let snapshot = state.registry.with_bot(&id, |bot| bot.reset())?;
    state.events.publish(&BotEvent::Updated {
        state: snapshot.clone(),
    });
    Ok(Json(json!({
        "success": true,
        "message": "Bot reset to idle state",
        "state": snapshot,
    })))
}

async fn reset_all_bots(State(state): State<AppState>) -> Json<Value> {
    let bot_count = state.registry.reset_all();
    state.events.publish(&BotEvent::AllReset { bot_count });
    Json(json!({
        "success": true,
        "message": "All bots reset to idle state",
        "bot_count": bot_count,
    }))
}

async fn damage_bot(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<DamageRequest>,
) -> Result<Json<Value>, ApiError> {
    let change = state
        .registry
        .with_bot(&id, |bot| bot.take_damage(req.damage))??;
    state.events.publish(&BotEvent::Updated {
        state: change.snapshot.clone(),
    });
    Ok(Json(json!({
        "success": true,
        "message": "Damage applied",
        "previous_health": change.previous_health,
        "current_health": change.current_health,
        "damage_dealt": req.damage,
        "state": change.snapshot,
    })))
}

async fn heal_bot(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<HealRequest>,
) -> Result<Json<Value>, ApiError> {
    let change = state
        .registry
        .with_bot(&id, |bot| bot.heal(req.amount))??;
    state.events.publish(&BotEvent::Updated {
        state: change.snapshot.clone(),
    });
    Ok(Json(json!({
        "success": true,
        "message": "Bot healed",
        "previous_health": change.previous_health,
        "current_health": change.current_health,
        "amount_healed": req.amount,
        "state": change.snapshot,
    })))
}
