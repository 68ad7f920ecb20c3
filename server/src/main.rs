use std::sync::Arc;

use server::lobby::{reload_config, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
/// Activates error tracing, spawns a watchdog task to sweep out dead rooms,
/// then sets up the routing for the WebSocket endpoint plus the health and
/// stats surfaces.
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=trace", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_target(true) // Module path (e.g. server::room)
                .with_thread_ids(true)
                .with_thread_names(true),
        )
        .init();

    let app_state = Arc::new(AppState::default());
    reload_config(&app_state).await;
    server::spawn_watchdog(app_state.clone());

    let bind_addr = app_state.config.read().await.bind_addr.clone();
    let app = server::build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
