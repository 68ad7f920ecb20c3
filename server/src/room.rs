//! The room actor: a single-threaded cooperative tick worker owning one
//! `RoomState` exclusively (§5 "Concurrency model"). All access to a room's
//! simulation goes through its `mpsc` command queue — no `Mutex<RoomState>`
//! anywhere, so two rooms never contend and one room's state is never shared
//! across tasks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use engine::constants::RECONNECT_GRACE_MS;
use engine::{PlayerInput, RoomState};
use protocol::{ClientMessage, GameMode, MatchmakingError, RoomPhase, ServerMessage, SERVER_SNAPSHOT};
use rand::Rng;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

pub enum RoomCommand {
    Join {
        respond_to: oneshot::Sender<Result<JoinOutcome, MatchmakingError>>,
    },
    Reconnect {
        token: String,
        respond_to: oneshot::Sender<Option<u8>>,
    },
    ClientMessage {
        player_id: u8,
        msg: ClientMessage,
    },
    /// An abnormal transport close: the slot is held for `RECONNECT_GRACE_MS`
    /// in case the session reconnects (§4.6).
    Disconnected {
        player_id: u8,
    },
    /// An explicit leave (normal-closure close code): the slot is released
    /// immediately, no grace window (§4.6 "it unlocks on any leave").
    Leave {
        player_id: u8,
    },
    Query {
        respond_to: oneshot::Sender<RoomInfo>,
    },
}

#[derive(Debug)]
pub struct JoinOutcome {
    pub player_id: u8,
    pub reconnect_token: String,
}

#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub player_count: u8,
    pub phase: RoomPhase,
    pub joinable: bool,
}

/// A handle the rest of the server holds to reach a room actor. Cheap to
/// clone, cheap to hand to every connected session.
#[derive(Debug)]
pub struct RoomHandle {
    pub game_mode: GameMode,
    pub room_code: String,
    pub is_private: bool,
    pub command_tx: mpsc::Sender<RoomCommand>,
    pub snapshot_tx: broadcast::Sender<Bytes>,
    shutdown_rx: watch::Receiver<bool>,
}

impl RoomHandle {
    pub async fn query(&self) -> RoomInfo {
        let (tx, rx) = oneshot::channel();
        if self.command_tx.send(RoomCommand::Query { respond_to: tx }).await.is_err() {
            return RoomInfo { player_count: 0, phase: RoomPhase::Finished, joinable: false };
        }
        rx.await.unwrap_or(RoomInfo { player_count: 0, phase: RoomPhase::Finished, joinable: false })
    }

    pub async fn is_joinable(&self) -> bool {
        self.query().await.joinable
    }

    pub async fn player_count(&self) -> u8 {
        self.query().await.player_count
    }

    pub async fn phase(&self) -> RoomPhase {
        self.query().await.phase
    }

    pub fn has_shut_down(&self) -> bool {
        *self.shutdown_rx.borrow()
    }
}

pub(crate) const MAX_PLAYERS: usize = 2;

/// Spawns the room's tick-worker task and returns a handle to it. Capacity is
/// fixed at two players regardless of game mode (§4.6 "two-player capacity").
/// `tick_ms` is independent of the engine's nominal 60 Hz `timeFactor`
/// baseline — `dt_ms` is simply measured per tick and fed to `engine::tick`.
pub fn spawn_room(
    game_mode: GameMode,
    room_code: String,
    is_private: bool,
    tick_ms: u64,
) -> Arc<RoomHandle> {
    let (command_tx, command_rx) = mpsc::channel(protocol::CHANNEL_BUFFER_SIZE);
    let (snapshot_tx, _) = broadcast::channel(protocol::CHANNEL_BUFFER_SIZE);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = Arc::new(RoomHandle {
        game_mode,
        room_code: room_code.clone(),
        is_private,
        command_tx,
        snapshot_tx: snapshot_tx.clone(),
        shutdown_rx,
    });

    let seed = rand::thread_rng().r#gen::<u64>();
    tokio::spawn(run_room(
        RoomState::new(game_mode, room_code, is_private, seed),
        command_rx,
        snapshot_tx,
        shutdown_tx,
        tick_ms,
    ));

    handle
}

fn encode_snapshot(msg: &ServerMessage) -> Bytes {
    let payload = postcard::to_allocvec(msg).unwrap_or_default();
    let mut buf = BytesMut::with_capacity(payload.len() + 1);
    buf.extend_from_slice(&[SERVER_SNAPSHOT]);
    buf.extend_from_slice(&payload);
    buf.freeze()
}

fn mint_reconnect_token() -> String {
    let mut rng = rand::thread_rng();
    (0..24)
        .map(|_| {
            const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
            ALPHABET[rng.gen_range(0..ALPHABET.len())] as char
        })
        .collect()
}

async fn run_room(
    mut state: RoomState,
    mut command_rx: mpsc::Receiver<RoomCommand>,
    snapshot_tx: broadcast::Sender<Bytes>,
    shutdown_tx: watch::Sender<bool>,
    tick_ms: u64,
) {
    let mut interval = tokio::time::interval(Duration::from_millis(tick_ms));
    let mut inputs: HashMap<u8, PlayerInput> = HashMap::new();
    let mut tokens: HashMap<String, u8> = HashMap::new();
    let mut disconnected_since: HashMap<u8, Instant> = HashMap::new();
    let mut last_tick = Instant::now();

    // The room sends its first full snapshot as soon as anyone can see it.
    snapshot_tx.send(encode_snapshot(&ServerMessage::Full(state.to_snapshot()))).ok();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Instant::now();
                let dt_ms = now.duration_since(last_tick).as_millis().min(250) as u32;
                last_tick = now;

                expire_reconnect_grace(&mut state, &mut disconnected_since, &mut tokens);

                engine::tick(&mut state, dt_ms, &mut inputs);

                let full = matches!(state.phase, RoomPhase::Waiting | RoomPhase::Countdown);
                let snapshot = state.to_snapshot();
                let wire = if full {
                    ServerMessage::Full(snapshot)
                } else {
                    ServerMessage::Delta(snapshot)
                };
                // A send error just means no session is currently subscribed.
                let _ = snapshot_tx.send(encode_snapshot(&wire));

                if state.phase == RoomPhase::Finished && state.players.is_empty() {
                    break;
                }
            }
            command = command_rx.recv() => {
                match command {
                    Some(RoomCommand::Join { respond_to }) => {
                        let result = handle_join(&mut state, &mut tokens);
                        let _ = respond_to.send(result);
                    }
                    Some(RoomCommand::Reconnect { token, respond_to }) => {
                        let player_id = tokens.get(&token).copied();
                        if let Some(id) = player_id {
                            disconnected_since.remove(&id);
                        }
                        let _ = respond_to.send(player_id);
                    }
                    Some(RoomCommand::ClientMessage { player_id, msg }) => {
                        apply_client_message(&mut state, &mut inputs, player_id, msg);
                    }
                    Some(RoomCommand::Disconnected { player_id }) => {
                        disconnected_since.insert(player_id, Instant::now());
                    }
                    Some(RoomCommand::Leave { player_id }) => {
                        disconnected_since.remove(&player_id);
                        release_slot(&mut state, &mut tokens, player_id);
                    }
                    Some(RoomCommand::Query { respond_to }) => {
                        let info = RoomInfo {
                            player_count: state.players.len() as u8,
                            phase: state.phase,
                            joinable: state.phase == RoomPhase::Waiting
                                && state.players.len() < MAX_PLAYERS,
                        };
                        let _ = respond_to.send(info);
                    }
                    None => break,
                }
            }
        }
    }

    let _ = shutdown_tx.send(true);
    tracing::info!(room_code = %state.room_code, "Room actor shut down");
}

fn handle_join(
    state: &mut RoomState,
    tokens: &mut HashMap<String, u8>,
) -> Result<JoinOutcome, MatchmakingError> {
    if state.players.len() >= MAX_PLAYERS {
        return Err(MatchmakingError::RoomLocked);
    }
    if state.phase != RoomPhase::Waiting {
        return Err(MatchmakingError::RoomNotWaiting);
    }

    let player_id = state.add_player();
    let token = mint_reconnect_token();
    tokens.insert(token.clone(), player_id);

    if state.players.len() == MAX_PLAYERS || state.game_mode == GameMode::Pve {
        state.phase = RoomPhase::Countdown;
        state.countdown_accum_ms = 0;
        state.countdown_s = engine::constants::COUNTDOWN_S;
        state.init_level(0);
    }

    Ok(JoinOutcome {
        player_id,
        reconnect_token: token,
    })
}

fn apply_client_message(
    state: &mut RoomState,
    inputs: &mut HashMap<u8, PlayerInput>,
    player_id: u8,
    msg: ClientMessage,
) {
    match msg {
        ClientMessage::Input { up, down, left, right } => {
            let entry = inputs.entry(player_id).or_default();
            entry.up = up;
            entry.down = down;
            entry.left = left;
            entry.right = right;
        }
        ClientMessage::Bomb => {
            inputs.entry(player_id).or_default().bomb_requested = true;
        }
        ClientMessage::Ready => {
            if state.phase == RoomPhase::Waiting && state.game_mode == GameMode::Pve {
                state.phase = RoomPhase::Countdown;
                state.countdown_accum_ms = 0;
                state.countdown_s = engine::constants::COUNTDOWN_S;
                state.init_level(0);
            }
        }
    }
}

/// A reconnect token that outlives its `RECONNECT_GRACE_MS` window releases
/// the player's slot for good (§4.6).
fn expire_reconnect_grace(
    state: &mut RoomState,
    disconnected_since: &mut HashMap<u8, Instant>,
    tokens: &mut HashMap<String, u8>,
) {
    let grace = Duration::from_millis(RECONNECT_GRACE_MS as u64);
    let expired: Vec<u8> = disconnected_since
        .iter()
        .filter(|(_, since)| since.elapsed() >= grace)
        .map(|(id, _)| *id)
        .collect();

    for player_id in expired {
        disconnected_since.remove(&player_id);
        release_slot(state, tokens, player_id);
    }
}

/// Removes a player's slot and, if the room hasn't actually started PLAYING
/// yet, reopens it for matchmaking (§4.6 "a room locks ... it unlocks on any
/// leave"). A leave during PLAYING/LEVEL_CLEAR/FINISHED does not reopen the
/// room — it is arbitrated instead by the normal win/loss rules.
fn release_slot(state: &mut RoomState, tokens: &mut HashMap<String, u8>, player_id: u8) {
    tokens.retain(|_, id| *id != player_id);
    state.remove_player(player_id);

    if matches!(state.phase, RoomPhase::Waiting | RoomPhase::Countdown)
        && state.players.len() < MAX_PLAYERS
    {
        state.phase = RoomPhase::Waiting;
        state.countdown_accum_ms = 0;
        state.countdown_s = engine::constants::COUNTDOWN_S;
    }
}
