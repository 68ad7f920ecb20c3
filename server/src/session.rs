//! Per-connection gateway: two tasks per session, one forwarding room
//! snapshots out and one forwarding client gameplay messages in — the same
//! spawn-two-tasks-and-abort-the-loser shape as the teacher's
//! `handle_server_logic`/`handle_client_logic` pair, collapsed into one
//! variant since this server has no client-hosted/server-hosted distinction.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{sink::SinkExt, stream::StreamExt};
use postcard::from_bytes;
use protocol::close_code;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;

use crate::room::{RoomCommand, RoomHandle};

/// Whether a session ended because the peer asked to leave (normal-closure
/// close frame) or because the transport just went away (§4.6: only the
/// latter gets a reconnect grace window).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectKind {
    Graceful,
    Abnormal,
}

/// Runs the session until either side closes, returning a human-readable
/// reason used for the final closing message plus how it ended.
pub async fn run_session(
    sender: Arc<Mutex<SplitSink<WebSocket, Message>>>,
    receiver: SplitStream<WebSocket>,
    room: Arc<RoomHandle>,
    player_id: u8,
) -> (&'static str, DisconnectKind) {
    let snapshot_rx = room.snapshot_tx.subscribe();
    let command_tx = room.command_tx.clone();

    let mut send_task = tokio::spawn(async move { send_logic(sender, snapshot_rx).await });
    let mut receive_task =
        tokio::spawn(async move { receive_logic(receiver, command_tx, player_id).await });

    // If any one of the tasks run to completion, we abort the other.
    let result = tokio::select! {
        res_a = &mut send_task => { receive_task.abort(); res_a.map(|msg| (msg, DisconnectKind::Abnormal)) },
        res_b = &mut receive_task => { send_task.abort(); res_b },
    };

    result.unwrap_or_else(|err| {
        tracing::error!(?err, "Internal panic in session logic.");
        ("Internal panic in session logic.", DisconnectKind::Abnormal)
    })
}

/// Forwards pre-encoded snapshot frames from the room actor straight to the
/// WebSocket. The bytes already carry the `SERVER_SNAPSHOT` tag and postcard
/// payload; this task never looks inside them.
async fn send_logic(
    sender: Arc<Mutex<SplitSink<WebSocket, Message>>>,
    mut snapshot_rx: tokio::sync::broadcast::Receiver<bytes::Bytes>,
) -> &'static str {
    let mut enclosed = sender.lock().await;

    loop {
        match snapshot_rx.recv().await {
            Ok(bytes) => {
                if let Err(err) = enclosed.send(Message::Binary(bytes)).await {
                    tracing::error!(?err, "Error sending snapshot to peer.");
                    return "Error in communication with peer.";
                }
            }
            Err(RecvError::Closed) => {
                return "Room closed.";
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped_messages = skipped, "Session lagging on snapshots.");
                // Just keep going; the next snapshot is a full-enough picture
                // on its own and the phase transitions periodically force a
                // Full frame anyway.
            }
        }
    }
}

/// Decodes incoming gameplay messages and forwards them into the room actor.
async fn receive_logic(
    mut receiver: SplitStream<WebSocket>,
    command_tx: tokio::sync::mpsc::Sender<RoomCommand>,
    player_id: u8,
) -> (&'static str, DisconnectKind) {
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Binary(bytes)) => {
                let Ok(msg) = from_bytes(&bytes) else {
                    tracing::warn!(player_id, "Dropped malformed client message.");
                    continue;
                };
                if command_tx
                    .send(RoomCommand::ClientMessage { player_id, msg })
                    .await
                    .is_err()
                {
                    return ("Room closed.", DisconnectKind::Abnormal);
                }
            }
            // Only an explicit normal-closure code (1000) counts as a leave
            // (§4.6); anything else — including no close frame at all — is
            // abnormal and gets a reconnect grace window.
            Ok(Message::Close(frame)) => {
                return match frame {
                    Some(f) if f.code == close_code::NORMAL => {
                        ("Client disconnected intentionally.", DisconnectKind::Graceful)
                    }
                    _ => ("Client closed abnormally.", DisconnectKind::Abnormal),
                };
            }
            Ok(_) => {} // Ignore ping/pong/text.
            Err(_) => {
                return ("Connection lost.", DisconnectKind::Abnormal);
            }
        }
    }
    ("Connection lost.", DisconnectKind::Abnormal)
}
