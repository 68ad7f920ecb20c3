//! Wire-level record shapes for the authoritative room state (§6). These are
//! plain tagged-union/struct encodings — no inheritance, no polymorphic entity
//! base type — per the REDESIGN FLAGS in spec.md §9 ("use tagged variants, one
//! discriminated union per polymorphic family").

use serde::{Deserialize, Serialize};

/// One flattened grid cell value, `grid[row * width + col]` (§3 "flat array of
/// W·H small integers" per spec.md §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[repr(u8)]
pub enum TileKind {
    Empty = 0,
    HardWall = 1,
    SoftWall = 2,
}

/// A power-up kind, revealed under a destroyed soft wall (§3 Items).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ItemKind {
    RangeUp,
    BombUp,
    SpeedUp,
    Kick,
    Ghost,
    Shield,
}

/// Which of the six AI behaviors an enemy runs (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum EnemyKind {
    Balloon,
    Ghost,
    Minion,
    Frog,
    Tank,
    BossSlime,
    BossMecha,
}

/// A player's life-state (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum PlayerState {
    Normal,
    Trapped,
    Dead,
}

/// Facing/movement direction, shared by players, bombs-in-flight and enemies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// The room's phase state machine (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum RoomPhase {
    Waiting,
    Countdown,
    Playing,
    LevelClear,
    Finished,
}

/// The terse winner encoding from spec.md §9 (REDESIGN FLAG 4): `0` is
/// draw/none, a positive value is the winning player's id, `12` is
/// campaign-complete. Kept as an exposed enumerated type rather than a raw
/// integer so clients cannot invent new codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Winner {
    None,
    Player(u8),
    CampaignComplete,
}

impl Winner {
    pub fn to_wire_code(self) -> u8 {
        match self {
            Winner::None => 0,
            Winner::Player(id) => id,
            Winner::CampaignComplete => 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ItemRecord {
    pub grid_x: u8,
    pub grid_y: u8,
    pub item_type: ItemKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PlayerRecord {
    pub id: u8,
    pub x: f32,
    pub y: f32,
    pub color: u8,
    pub state: PlayerState,
    pub direction: Direction,
    pub speed: f32,
    pub bomb_range: u8,
    pub max_bombs: u8,
    pub active_bombs: u8,
    pub score: u32,
    pub can_kick: bool,
    pub has_shield: bool,
    pub ghost_timer_ms: u32,
    pub trapped_timer_ms: u32,
    pub invincible_timer_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct BombRecord {
    pub id: u32,
    pub owner_id: u8,
    pub grid_x: u8,
    pub grid_y: u8,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub range: u8,
    pub timer_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExplosionRecord {
    pub id: u32,
    pub owner_id: u8,
    pub grid_x: u8,
    pub grid_y: u8,
    pub timer_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct EnemyRecord {
    pub id: u32,
    pub enemy_type: EnemyKind,
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub speed: f32,
    pub hp: u8,
    pub max_hp: u8,
}

/// The complete authoritative room state as sent over the wire (§6).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Snapshot {
    pub phase: RoomPhase,
    pub game_mode: crate::GameMode,
    pub room_code: String,
    pub is_private: bool,
    pub countdown_s: u8,
    pub time_left_s: u32,
    pub level: u16,
    pub winner: Winner,
    pub boss_spawned: bool,
    pub grid_width: u8,
    pub grid_height: u8,
    /// Flattened `grid_width * grid_height` tiles, row-major.
    pub grid: Vec<TileKind>,
    pub items: Vec<ItemRecord>,
    pub players: Vec<PlayerRecord>,
    pub bombs: Vec<BombRecord>,
    pub explosions: Vec<ExplosionRecord>,
    pub enemies: Vec<EnemyRecord>,
}
