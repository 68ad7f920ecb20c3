//! Handshake processing: read the client's join request, resolve it through
//! the matchmaker, bind a player slot, and reply — mirroring the teacher's
//! read-request -> validate -> reply shape (`get_initial_query` /
//! `inform_client_of_connection`), adapted to this server's matchmaking verbs
//! instead of a single `game_id`/`room_id` pair.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use bytes::{BufMut, BytesMut};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{sink::SinkExt, stream::StreamExt};
use postcard::from_bytes;
use protocol::{
    HandshakeResponse, JoinIntent, JoinRequest, MatchmakingError, HAND_SHAKE_RESPONSE, SERVER_ERROR,
};
use tokio::sync::{oneshot, Mutex};

use crate::lobby::AppState;
use crate::room::{RoomCommand, RoomHandle};
use crate::session::DisconnectKind;

/// Sends an error as a binary `SERVER_ERROR` frame, then closes — browsers
/// can't read a WebSocket close reason reliably, so the reason travels as a
/// regular message first, same as the teacher's relay.
async fn send_closing_message(sender: &mut SplitSink<WebSocket, Message>, closing_message: String) {
    let raw_data = closing_message.as_bytes();
    let mut msg = BytesMut::with_capacity(1 + raw_data.len());
    msg.put_u8(SERVER_ERROR);
    msg.put_slice(raw_data);

    let _ = sender.send(Message::Binary(msg.into())).await;
    let _ = sender.send(Message::Close(None)).await;
}

pub struct HandshakeResult {
    pub player_id: u8,
    pub room: Arc<RoomHandle>,
}

async fn read_join_request(
    sender: &mut SplitSink<WebSocket, Message>,
    receiver: &mut SplitStream<WebSocket>,
) -> Option<JoinRequest> {
    let raw = loop {
        let Some(frame) = receiver.next().await else {
            tracing::warn!("WebSocket closed before handshake completed");
            send_closing_message(sender, "Connection closed during handshake.".into()).await;
            return None;
        };
        match frame {
            Err(err) => {
                tracing::error!(?err, "Transport error during handshake.");
                send_closing_message(sender, "Transport error during handshake.".into()).await;
                return None;
            }
            Ok(Message::Binary(data)) => break data,
            Ok(Message::Close(_)) => return None,
            // We do not care about ping/pong/text here.
            Ok(_) => {}
        }
    };

    match from_bytes::<JoinRequest>(&raw) {
        Ok(request) => Some(request),
        Err(err) => {
            tracing::error!(error = ?err, "Failed to parse join request");
            send_closing_message(sender, "Failed to parse join request.".into()).await;
            None
        }
    }
}

async fn resolve_room(
    state: &AppState,
    request: &JoinRequest,
) -> Result<Arc<RoomHandle>, MatchmakingError> {
    match &request.intent {
        JoinIntent::QuickMatch => crate::lobby::quick_match(state, request.game_mode).await,
        JoinIntent::Create => {
            crate::lobby::create_room(state, request.game_mode, request.is_private).await
        }
        JoinIntent::JoinByCode(code) => crate::lobby::find_room_by_code(state, code).await,
    }
}

/// Reads the join request, resolves a room for it, and binds a player slot
/// (fresh join or reconnect). Returns `None` if anything along the way fails;
/// the caller should simply drop the connection in that case.
pub async fn init_and_connect(
    sender: &mut SplitSink<WebSocket, Message>,
    receiver: &mut SplitStream<WebSocket>,
    state: Arc<AppState>,
) -> Option<HandshakeResult> {
    let request = read_join_request(sender, receiver).await?;

    let room = match resolve_room(&state, &request).await {
        Ok(room) => room,
        Err(err) => {
            send_closing_message(sender, err.to_string()).await;
            return None;
        }
    };

    if !request.reconnect_token.is_empty() {
        reconnect(sender, &state, room, request.reconnect_token).await
    } else {
        join(sender, &state, room).await
    }
}

async fn join(
    sender: &mut SplitSink<WebSocket, Message>,
    state: &AppState,
    room: Arc<RoomHandle>,
) -> Option<HandshakeResult> {
    let (respond_to, rx) = oneshot::channel();
    if room
        .command_tx
        .send(RoomCommand::Join { respond_to })
        .await
        .is_err()
    {
        send_closing_message(sender, "Room is no longer available.".into()).await;
        return None;
    }

    match rx.await {
        Ok(Ok(outcome)) => {
            let response = HandshakeResponse {
                session_id: state.next_session_id(),
                player_id: outcome.player_id,
                room_code: room.room_code.clone(),
                is_private: room.is_private,
                reconnect_token: outcome.reconnect_token,
            };
            if !inform_client_of_connection(sender, &response).await {
                return None;
            }
            Some(HandshakeResult { player_id: outcome.player_id, room })
        }
        Ok(Err(err)) => {
            send_closing_message(sender, err.to_string()).await;
            None
        }
        Err(_) => {
            send_closing_message(sender, "Room is no longer available.".into()).await;
            None
        }
    }
}

async fn reconnect(
    sender: &mut SplitSink<WebSocket, Message>,
    state: &AppState,
    room: Arc<RoomHandle>,
    token: String,
) -> Option<HandshakeResult> {
    let (respond_to, rx) = oneshot::channel();
    if room
        .command_tx
        .send(RoomCommand::Reconnect { token: token.clone(), respond_to })
        .await
        .is_err()
    {
        send_closing_message(sender, "Room is no longer available.".into()).await;
        return None;
    }

    match rx.await {
        Ok(Some(player_id)) => {
            let response = HandshakeResponse {
                session_id: state.next_session_id(),
                player_id,
                room_code: room.room_code.clone(),
                is_private: room.is_private,
                reconnect_token: token,
            };
            if !inform_client_of_connection(sender, &response).await {
                return None;
            }
            Some(HandshakeResult { player_id, room })
        }
        _ => {
            send_closing_message(sender, "Reconnect token was not recognized.".into()).await;
            None
        }
    }
}

/// Informs the peer of the connection result. Returns a success flag, same as
/// the teacher's version.
pub async fn inform_client_of_connection(
    sender: &mut SplitSink<WebSocket, Message>,
    response: &HandshakeResponse,
) -> bool {
    let payload = match postcard::to_allocvec(response) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let mut msg = BytesMut::with_capacity(1 + payload.len());
    msg.put_u8(HAND_SHAKE_RESPONSE);
    msg.put_slice(&payload);

    sender.send(Message::Binary(msg.into())).await.is_ok()
}

/// Tells the room actor the session went away and sends the peer a final
/// closing message, same shutdown shape as the teacher's `shutdown_connection`.
/// A `Graceful` disconnect (explicit leave, normal-closure code) frees the
/// slot immediately; an `Abnormal` one starts the reconnect grace (§4.6).
pub async fn shutdown_connection(
    wrapped_sender: Arc<Mutex<SplitSink<WebSocket, Message>>>,
    room: Arc<RoomHandle>,
    player_id: u8,
    error_message: &'static str,
    disconnect_kind: DisconnectKind,
) {
    let command = match disconnect_kind {
        DisconnectKind::Graceful => RoomCommand::Leave { player_id },
        DisconnectKind::Abnormal => RoomCommand::Disconnected { player_id },
    };
    let _ = room.command_tx.send(command).await;

    let mut sender = wrapped_sender.lock().await;
    send_closing_message(&mut sender, error_message.into()).await;
}
