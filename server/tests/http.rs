//! Drives the plain HTTP surface (§6) in-process via `tower::ServiceExt::oneshot`,
//! the dependency-minimal approach the teacher would use over pulling in a real
//! HTTP client for tests.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use protocol::GameMode;
use server::lobby::{create_room, AppState, OnlineStatsResponse};
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let state = Arc::new(AppState::default());
    let app = server::build_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn online_stats_lists_a_created_room() {
    let state = Arc::new(AppState::default());
    let room = create_room(&state, GameMode::Pvp, false).await.unwrap();
    let app = server::build_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/online-stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let stats: OnlineStatsResponse = serde_json::from_slice(&body).unwrap();

    assert_eq!(stats.total_rooms, 1);
    assert_eq!(stats.total_players, 0);
    assert_eq!(stats.rooms.len(), 1);
    assert_eq!(stats.rooms[0].room_id, room.room_code);
    assert_eq!(stats.rooms[0].max_players, 2);
    assert!(!stats.rooms[0].is_private);
}

#[tokio::test]
async fn reload_endpoint_echoes_the_active_config() {
    let state = Arc::new(AppState::default());
    let app = server::build_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/reload")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("tick_ms="));
}
