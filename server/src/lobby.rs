//! Matchmaking state: the room registry and the `create` / `joinByCode` /
//! `quickMatch` verbs (§4.6). Each entry owns a handle to a room actor task
//! (see `room.rs`); the registry itself holds no game state.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use protocol::{GameMode, MatchmakingError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::config::ServerConfig;
use crate::room::RoomHandle;
use engine::constants::{ROOM_CODE_ALPHABET, ROOM_CODE_LENGTH};

/// Global server state: the live room registry, the reloadable config, and a
/// session-id counter used purely for log correlation (not a gameplay
/// identifier).
#[derive(Default)]
pub struct AppState {
    pub rooms: Mutex<HashMap<String, Arc<RoomHandle>>>,
    pub config: RwLock<ServerConfig>,
    next_session_id: AtomicU32,
}

impl AppState {
    pub fn next_session_id(&self) -> u32 {
        self.next_session_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Re-reads `ServerConfig.json` and swaps it in. Rooms already running keep
/// the tick rate they were spawned with; only new rooms see the change.
pub async fn reload_config(state: &AppState) {
    let fresh = crate::config::load_config();
    *state.config.write().await = fresh;
}

const MAX_CODE_MINT_ATTEMPTS: usize = 64;

fn mint_room_code(existing: &HashMap<String, Arc<RoomHandle>>) -> Option<String> {
    let mut rng = rand::thread_rng();
    for _ in 0..MAX_CODE_MINT_ATTEMPTS {
        let code: String = (0..ROOM_CODE_LENGTH)
            .map(|_| {
                let idx = rng.gen_range(0..ROOM_CODE_ALPHABET.len());
                ROOM_CODE_ALPHABET[idx] as char
            })
            .collect();
        if !existing.contains_key(&code) {
            return Some(code);
        }
    }
    None
}

/// `create(mode, isPrivate)` (§4.6): always succeeds unless the room-code
/// space is exhausted.
pub async fn create_room(
    state: &AppState,
    game_mode: GameMode,
    is_private: bool,
) -> Result<Arc<RoomHandle>, MatchmakingError> {
    let tick_ms = state.config.read().await.tick_ms;
    let mut rooms = state.rooms.lock().await;
    let code = mint_room_code(&rooms).ok_or(MatchmakingError::RoomCodeSpaceExhausted)?;
    let handle = crate::room::spawn_room(game_mode, code.clone(), is_private, tick_ms);
    rooms.insert(code, handle.clone());
    Ok(handle)
}

/// `joinByCode(code)` (§4.6).
pub async fn find_room_by_code(
    state: &AppState,
    code: &str,
) -> Result<Arc<RoomHandle>, MatchmakingError> {
    let rooms = state.rooms.lock().await;
    rooms
        .get(code)
        .cloned()
        .ok_or(MatchmakingError::RoomNotFound)
}

/// `quickMatch(mode)` (§4.6): joins the first public room of the requested
/// mode that is still `WAITING` and not full; creates a fresh public room
/// otherwise.
pub async fn quick_match(
    state: &AppState,
    game_mode: GameMode,
) -> Result<Arc<RoomHandle>, MatchmakingError> {
    {
        let rooms = state.rooms.lock().await;
        for handle in rooms.values() {
            if handle.game_mode == game_mode
                && !handle.is_private
                && handle.is_joinable().await
            {
                return Ok(handle.clone());
            }
        }
    }
    create_room(state, game_mode, false).await
}

/// Periodically drops registry entries whose room actor has shut down
/// (fallback cleanup; rooms should deregister themselves on `FINISHED`).
pub async fn cleanup_dead_rooms(state: &AppState) {
    let mut rooms = state.rooms.lock().await;
    rooms.retain(|code, room| {
        let alive = !room.command_tx.is_closed();
        if !alive {
            tracing::info!(room_code = code, "Removing dead room");
        }
        alive
    });
}

/// One room's entry in the `/online-stats` payload (§6).
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStatsEntry {
    pub room_id: String,
    pub name: String,
    pub mode: GameMode,
    pub players: u8,
    pub max_players: u8,
    pub is_private: bool,
}

/// The `/online-stats` payload (§6): `{ totalPlayers, totalRooms, rooms, timestamp }`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineStatsResponse {
    pub total_players: u32,
    pub total_rooms: u32,
    pub rooms: Vec<RoomStatsEntry>,
    pub timestamp: u64,
}

/// Builds the `/online-stats` payload (§6).
pub async fn render_online_stats(state: &AppState) -> OnlineStatsResponse {
    let rooms = state.rooms.lock().await;
    let mut total_players = 0u32;
    let mut entries = Vec::with_capacity(rooms.len());
    for (code, room) in rooms.iter() {
        let count = room.player_count().await;
        total_players += count as u32;
        entries.push(RoomStatsEntry {
            room_id: code.clone(),
            name: room.game_mode.lobby_name().to_string(),
            mode: room.game_mode,
            players: count,
            max_players: crate::room::MAX_PLAYERS as u8,
            is_private: room.is_private,
        });
    }

    OnlineStatsResponse {
        total_players,
        total_rooms: entries.len() as u32,
        rooms: entries,
        timestamp: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0),
    }
}
