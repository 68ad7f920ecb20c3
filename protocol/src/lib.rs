//! The wire protocol shared between the matchmaker, the session gateway and the
//! simulation engine. Message tags live alongside the structs they frame so the
//! server and any future client stay byte-compatible without a second source
//! of truth.

use serde::{Deserialize, Serialize};

mod snapshot;

pub use snapshot::*;

/// The buffer sizes for the channels for intra-process communication.
pub const CHANNEL_BUFFER_SIZE: usize = 256;

// Session-control tags (Server -> Client). These precede a `postcard`-encoded
// payload on the wire so the gateway's send loop can dispatch on a single byte
// the same way the teacher's relay dispatches on `bytes[0]`.

/// The handshake was accepted; followed by a postcard-encoded [`HandshakeResponse`].
pub const HAND_SHAKE_RESPONSE: u8 = 0;
/// The handshake (or an in-match protocol violation) was rejected; followed by
/// a `String` describing the error, matching the teacher's closing-message format.
pub const SERVER_ERROR: u8 = 1;
/// A full or delta snapshot follows, postcard-encoded as [`ServerMessage`].
pub const SERVER_SNAPSHOT: u8 = 2;
/// The server is closing the connection. No payload; the close code travels on
/// the underlying WebSocket close frame (see [`close_code`]).
pub const SERVER_CLOSE: u8 = 3;

/// The join request a session sends as the very first binary message.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JoinRequest {
    /// `quick_match`, `create`, or `join_by_code` — see [`JoinIntent`].
    pub intent: JoinIntent,
    /// The desired game mode for `create`/`quick_match`; ignored for `join_by_code`.
    pub game_mode: GameMode,
    /// Whether a freshly created room should be excluded from quick-match/public
    /// listing. Ignored outside `create`.
    pub is_private: bool,
    /// A session token presented to re-bind to a held player slot after a
    /// transient disconnect (§4.6). Empty for a brand-new join.
    pub reconnect_token: String,
}

/// How a client wants to enter a room, mirroring the matchmaking verbs of §4.6.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub enum JoinIntent {
    /// `quickMatch(mode)`.
    QuickMatch,
    /// `create(mode, isPrivate)`.
    Create,
    /// `joinByCode(code)`.
    JoinByCode(String),
}

/// The two supported game modes (§3 `gameMode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum GameMode {
    Pvp,
    Pve,
}

impl GameMode {
    /// The stable public-lobby room-kind name for this mode (§6 "Room naming
    /// convention").
    pub fn lobby_name(self) -> &'static str {
        match self {
            GameMode::Pvp => "bubble_pvp",
            GameMode::Pve => "bubble_pve",
        }
    }
}

/// A typed matchmaking failure, surfaced on the join reply per spec.md §7
/// ("Matchmaking failure... surface as a typed error on the join reply").
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum MatchmakingError {
    /// `joinByCode` found nothing with that code.
    RoomNotFound,
    /// The room is already at its two-player capacity.
    RoomLocked,
    /// The room exists but is not in `WAITING` (already started or finished).
    RoomNotWaiting,
    /// The room's creation-time room-code space was exhausted (practically
    /// unreachable with a 31^4 alphabet, kept for completeness per §7).
    RoomCodeSpaceExhausted,
}

impl std::fmt::Display for MatchmakingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            MatchmakingError::RoomNotFound => "no room exists with that code",
            MatchmakingError::RoomLocked => "room is already full",
            MatchmakingError::RoomNotWaiting => "room has already started",
            MatchmakingError::RoomCodeSpaceExhausted => "server ran out of room codes",
        };
        f.write_str(text)
    }
}

impl std::error::Error for MatchmakingError {}

/// Sent back after a successful handshake.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HandshakeResponse {
    /// The session id assigned within the room.
    pub session_id: u32,
    /// The player id (1 or 2) this session controls.
    pub player_id: u8,
    /// The room code, useful to display/share even when joining by quick-match.
    pub room_code: String,
    /// Echoes whether the room is private.
    pub is_private: bool,
    /// A token the client must present to re-bind its slot after a transient
    /// disconnect (§4.6).
    pub reconnect_token: String,
}

/// Close codes used when tearing down a session, per §6 ("normal=1000,
/// abnormal=1006, custom >= 4000 for gameplay-terminal events").
pub mod close_code {
    pub const NORMAL: u16 = 1000;
    pub const ABNORMAL: u16 = 1006;
    /// The match finished and this was a terminal, no-reconnect close.
    pub const MATCH_FINISHED: u16 = 4000;
    /// The reconnect grace window expired before the session returned.
    pub const RECONNECT_EXPIRED: u16 = 4001;
    /// The process is shutting down.
    pub const SERVER_SHUTDOWN: u16 = 4002;
}

/// Client -> Server gameplay messages (§6). All are advisory; the server
/// silently ignores anything that violates an invariant (TRAPPED/DEAD movement,
/// bomb-on-occupied-cell) rather than signalling back, per spec.md §7.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub enum ClientMessage {
    /// Edge-triggered movement intent; the server treats `true` as "continuous
    /// while held" until the next differing `Input`.
    Input {
        up: bool,
        down: bool,
        left: bool,
        right: bool,
    },
    /// Attempt to place a bomb at the player's current cell.
    Bomb,
    /// Signals willingness to start (used for PVE solo start from WAITING).
    Ready,
}

/// Server -> Client gameplay messages, framed after [`SERVER_SNAPSHOT`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub enum ServerMessage {
    /// The complete authoritative state, sent on join and after any reset.
    Full(Snapshot),
    /// The per-tick authoritative state. Encoded as a full [`Snapshot`] (small
    /// enough at this entity count) but tagged separately so a client can
    /// distinguish "hard set" from "the usual per-tick update", per spec.md §9
    /// (`ResetViewState` vs `Delta`).
    Delta(Snapshot),
}
