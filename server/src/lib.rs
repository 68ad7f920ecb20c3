//! The axum/tokio process: matchmaker, session gateway, per-room tick worker,
//! and the small HTTP surface around them. Split into a library so
//! integration tests can drive the router in-process (§8 "Test tooling"),
//! with `main.rs` left as a thin binary entry point.

pub mod config;
pub mod hand_shake;
pub mod lobby;
pub mod room;
pub mod session;

use std::sync::Arc;

use axum::extract::ws::WebSocket;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::stream::StreamExt;
use tokio::sync::Mutex;

use crate::hand_shake::{init_and_connect, shutdown_connection};
use crate::lobby::{cleanup_dead_rooms, reload_config, render_online_stats, AppState, OnlineStatsResponse};

/// Builds the full HTTP/WebSocket router for a given app state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/online-stats", get(online_stats_handler))
        .route("/reload", get(reload_handler))
        .route("/ws", get(websocket_handler))
        .with_state(state)
}

/// Spawns the watchdog task that periodically sweeps dead rooms out of the
/// registry (fallback cleanup; rooms should deregister themselves).
pub fn spawn_watchdog(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(1200)); // 20 min
        loop {
            interval.tick().await;
            cleanup_dead_rooms(&state).await;
        }
    });
}

async fn health_handler() -> &'static str {
    "ok"
}

/// Lists the current rooms, their mode, player count and capacity (§6).
async fn online_stats_handler(State(state): State<Arc<AppState>>) -> Json<OnlineStatsResponse> {
    Json(render_online_stats(&state).await)
}

/// Forces a re-read of `ServerConfig.json`. Only new rooms pick up the
/// change; rooms already ticking keep their original tick rate.
async fn reload_handler(State(state): State<Arc<AppState>>) -> String {
    reload_config(&state).await;
    let config = state.config.read().await;
    format!("bind_addr={} tick_ms={}", config.bind_addr, config.tick_ms)
}

/// This function gets immediately called and upgrades the web response to a
/// WebSocket.
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| websocket(socket, state))
}

/// Does the whole handling from start to finish: handshake -> per-session
/// gateway tasks -> shutdown processing.
async fn websocket(stream: WebSocket, state: Arc<AppState>) {
    let (sender, mut receiver) = stream.split();
    let wrapped_sender = Arc::new(Mutex::new(sender));

    let handshake_result = {
        let mut sender = wrapped_sender.lock().await;
        init_and_connect(&mut sender, &mut receiver, state.clone()).await
    };
    let Some(handshake_result) = handshake_result else {
        // We quit here, as the handshake did not work out.
        return;
    };

    let room = handshake_result.room;
    let player_id = handshake_result.player_id;

    let (error_message, disconnect_kind) =
        session::run_session(wrapped_sender.clone(), receiver, room.clone(), player_id).await;

    shutdown_connection(wrapped_sender, room, player_id, error_message, disconnect_kind).await;
}
