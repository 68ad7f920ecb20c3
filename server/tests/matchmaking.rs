//! Exercises the matchmaking verbs (§4.6) against a live `AppState`, the same
//! in-process style the teacher would have used for its room registry had it
//! carried tests.

use protocol::{GameMode, MatchmakingError};
use server::lobby::{create_room, find_room_by_code, quick_match, AppState};
use server::room::RoomCommand;
use tokio::sync::oneshot;

#[tokio::test]
async fn created_room_is_immediately_joinable_by_code() {
    let state = AppState::default();
    let room = create_room(&state, GameMode::Pvp, false).await.unwrap();

    let found = find_room_by_code(&state, &room.room_code).await.unwrap();
    assert_eq!(found.room_code, room.room_code);
}

#[tokio::test]
async fn join_by_code_rejects_an_unknown_code() {
    let state = AppState::default();
    let err = find_room_by_code(&state, "ZZZZ").await.unwrap_err();
    assert_eq!(err, MatchmakingError::RoomNotFound);
}

#[tokio::test]
async fn quick_match_reuses_a_waiting_public_room_of_the_same_mode() {
    let state = AppState::default();
    let first = create_room(&state, GameMode::Pvp, false).await.unwrap();
    let second = quick_match(&state, GameMode::Pvp).await.unwrap();
    assert_eq!(first.room_code, second.room_code);
}

#[tokio::test]
async fn quick_match_never_hands_out_a_private_room() {
    let state = AppState::default();
    create_room(&state, GameMode::Pvp, true).await.unwrap();

    let matched = quick_match(&state, GameMode::Pvp).await.unwrap();
    assert!(!matched.is_private);
}

#[tokio::test]
async fn quick_match_does_not_cross_game_modes() {
    let state = AppState::default();
    let pve_room = create_room(&state, GameMode::Pve, false).await.unwrap();
    let matched = quick_match(&state, GameMode::Pvp).await.unwrap();
    assert_ne!(matched.room_code, pve_room.room_code);
}

#[tokio::test]
async fn room_locks_once_two_players_have_joined() {
    let state = AppState::default();
    let room = create_room(&state, GameMode::Pvp, false).await.unwrap();

    let (tx1, rx1) = oneshot::channel();
    room.command_tx
        .send(RoomCommand::Join { respond_to: tx1 })
        .await
        .unwrap();
    let first = rx1.await.unwrap().unwrap();
    assert_eq!(first.player_id, 1);

    let (tx2, rx2) = oneshot::channel();
    room.command_tx
        .send(RoomCommand::Join { respond_to: tx2 })
        .await
        .unwrap();
    let second = rx2.await.unwrap().unwrap();
    assert_eq!(second.player_id, 2);

    let (tx3, rx3) = oneshot::channel();
    room.command_tx
        .send(RoomCommand::Join { respond_to: tx3 })
        .await
        .unwrap();
    let err = rx3.await.unwrap().unwrap_err();
    assert_eq!(err, MatchmakingError::RoomLocked);

    assert!(!room.is_joinable().await);
}

#[tokio::test]
async fn a_pre_game_leave_reopens_the_room_for_matchmaking() {
    let state = AppState::default();
    let room = create_room(&state, GameMode::Pvp, false).await.unwrap();

    let (tx1, rx1) = oneshot::channel();
    room.command_tx
        .send(RoomCommand::Join { respond_to: tx1 })
        .await
        .unwrap();
    let first = rx1.await.unwrap().unwrap();

    let (tx2, rx2) = oneshot::channel();
    room.command_tx
        .send(RoomCommand::Join { respond_to: tx2 })
        .await
        .unwrap();
    rx2.await.unwrap().unwrap();

    // Room is now full and locked.
    assert!(!room.is_joinable().await);

    room.command_tx
        .send(RoomCommand::Leave { player_id: first.player_id })
        .await
        .unwrap();

    // An explicit leave before PLAYING frees the slot immediately and
    // reopens the room, unlike an abnormal disconnect's grace window.
    assert!(room.is_joinable().await);

    let (tx3, rx3) = oneshot::channel();
    room.command_tx
        .send(RoomCommand::Join { respond_to: tx3 })
        .await
        .unwrap();
    rx3.await.unwrap().unwrap();

    // Full again, locked again.
    assert!(!room.is_joinable().await);
}
