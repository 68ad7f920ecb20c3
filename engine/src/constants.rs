//! Tunable constants for the simulation. Grouped here the way the teacher keeps
//! magic numbers centralized in small leaf modules (see `timer.rs`).

/// Grid width in cells (§3).
pub const GRID_WIDTH: u8 = 15;
/// Grid height in cells (§3).
pub const GRID_HEIGHT: u8 = 13;
/// Tile edge length in pixels (§3).
pub const TILE_SIZE: f32 = 48.0;
/// Entity hitbox edge length in pixels (§4.1, GLOSSARY "Hitbox").
pub const PLAYER_SIZE: f32 = 36.0;
/// Epsilon shrink applied to the hitbox corners before collision testing (§4.1).
pub const HITBOX_EPSILON: f32 = 0.1;
/// Perpendicular-alignment tolerance for corner sliding, in pixels (§4.1).
pub const CORNER_TOLERANCE: f32 = 12.0;

/// Nominal tick rate; `timeFactor = dt / NOMINAL_TICK_MS` (§4.2).
pub const NOMINAL_TICK_MS: f32 = 1000.0 / 60.0;

/// Base player speed in px/tick at `timeFactor == 1`. Spec.md §9 leaves the
/// absolute numbers to the implementer; only the relative enemy ordering and
/// frame-rate independence are normative (REDESIGN FLAG 2).
pub const BASE_SPEED: f32 = 3.0;
/// Speed cap after repeated `SPEED_UP` pickups (§4.2 power-up table).
pub const MAX_SPEED: f32 = 6.0;
/// Bomb slide speed imparted by a kick, px/tick at `timeFactor == 1` (§4.2).
pub const KICK_SPEED: f32 = 7.0;

/// Starting bomb range and cap (§4.2 power-up table).
pub const DEFAULT_BOMB_RANGE: u8 = 1;
pub const MAX_BOMB_RANGE: u8 = 8;
/// Starting simultaneous bomb allowance and cap (§4.2 power-up table).
pub const DEFAULT_MAX_BOMBS: u8 = 1;
pub const MAX_MAX_BOMBS: u8 = 8;

/// Default bomb fuse, milliseconds, when not otherwise specified.
pub const DEFAULT_FUSE_MS: u32 = 3000;
/// Explosion-cell lifetime, milliseconds (§4.2 "Detonation").
pub const EXPLOSION_TTL_MS: u32 = 600;

/// Ghost mode duration on pickup, refreshed not stacked (§4.2 power-up table).
pub const GHOST_DURATION_MS: u32 = 10_000;
/// Trapped duration before escalating to DEAD absent rescue (§4.4, GLOSSARY).
pub const TRAPPED_DURATION_MS: u32 = 5_000;
/// Invincibility window granted on shield consumption and on NORMAL->TRAPPED (§4.4).
pub const HIT_INVINCIBILITY_MS: u32 = 1_000;
/// Invincibility window granted to a rescued player (§4.4 "Rescue").
pub const RESCUE_INVINCIBILITY_MS: u32 = 2_000;
/// Per-enemy invincibility window after taking an explosion hit (§4.4 PVE combat).
pub const ENEMY_HIT_INVINCIBILITY_MS: u32 = 500;
/// Fuse threshold below which a bomb counts as "dangerous" for AI dodging (§4.3).
pub const DODGE_THRESHOLD_MS: u32 = 2_000;

/// Countdown length before PLAYING, in whole seconds (§4.5 "COUNTDOWN (3-2-1)").
pub const COUNTDOWN_S: u8 = 3;
/// Pause spent in LEVEL_CLEAR before the next level starts (§4.5).
pub const LEVEL_CLEAR_DELAY_MS: u32 = 3_000;

/// Reconnect grace window after an abnormal close (§4.6).
pub const RECONNECT_GRACE_MS: u32 = 10_000;

/// Alphabet used to mint room codes: 31 characters, no 0/O/1/I (§4.6).
pub const ROOM_CODE_ALPHABET: &[u8; 32] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";
/// Room codes are four characters drawn from [`ROOM_CODE_ALPHABET`] (§4.6).
pub const ROOM_CODE_LENGTH: usize = 4;

/// BOSS_MECHA mega-bomb stats (§4.3).
pub const MECHA_BOMB_RANGE: u8 = 5;
pub const MECHA_BOMB_FUSE_MS: u32 = 4000;
pub const MECHA_ACTION_COOLDOWN_MS: u32 = 5000;
pub const MECHA_FAST_REEVALUATE_MS: u32 = 50;

/// BOSS_SLIME minion-spawn cadence and cap (§4.3).
pub const SLIME_ACTION_CYCLE_MS: u32 = 4000;
pub const SLIME_MAX_TOTAL_ENEMIES: usize = 8;

/// FROG jump cooldown after a successful two-step hop (§4.3).
pub const FROG_JUMP_COOLDOWN_MS: u32 = 1000;

/// Chase-kind re-evaluation cadence and wall-bounce escape timer (§4.3).
pub const CHASE_REEVALUATE_MS: u32 = 100;
pub const CHASE_ESCAPE_MS: u32 = 300;

/// BALLOON random re-pick interval bounds (§4.3).
pub const BALLOON_REPICK_MIN_MS: u32 = 2000;
pub const BALLOON_REPICK_MAX_MS: u32 = 4000;
