//! §3 Player entity and the power-up effect table from §4.2.

use protocol::{Direction, ItemKind, PlayerRecord, PlayerState};

use crate::constants::{
    DEFAULT_BOMB_RANGE, DEFAULT_MAX_BOMBS, GHOST_DURATION_MS, MAX_BOMB_RANGE, MAX_MAX_BOMBS,
    MAX_SPEED,
};

/// Owned by a session; mutated only by the simulation step (§3).
#[derive(Debug, Clone)]
pub struct Player {
    pub id: u8,
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub state: PlayerState,
    pub score: u32,
    pub speed: f32,
    pub bomb_range: u8,
    pub max_bombs: u8,
    pub active_bombs: u8,
    pub can_kick: bool,
    pub has_shield: bool,
    pub ghost_timer_ms: u32,
    pub trapped_timer_ms: u32,
    pub invincible_timer_ms: u32,
}

impl Player {
    pub fn new(id: u8, spawn: (f32, f32), base_speed: f32) -> Self {
        Player {
            id,
            x: spawn.0,
            y: spawn.1,
            direction: Direction::Down,
            state: PlayerState::Normal,
            score: 0,
            speed: base_speed,
            bomb_range: DEFAULT_BOMB_RANGE,
            max_bombs: DEFAULT_MAX_BOMBS,
            active_bombs: 0,
            can_kick: false,
            has_shield: false,
            ghost_timer_ms: 0,
            trapped_timer_ms: 0,
            invincible_timer_ms: 0,
        }
    }

    pub fn is_ghost(&self) -> bool {
        self.ghost_timer_ms > 0
    }

    /// The grid cell immediately adjacent in `direction`, used for bomb-kick
    /// detection (§4.2 "Kick").
    pub fn cell_in_direction(&self, direction: Direction) -> Option<crate::grid::Cell> {
        let cell = crate::grid::pixel_to_cell(self.x, self.y);
        let (dx, dy) = match direction {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        };
        cell.neighbor(dx, dy)
    }

    pub fn is_alive(&self) -> bool {
        self.state != PlayerState::Dead
    }

    /// Resets transient per-level stats while preserving score (§4.5 `initLevel`).
    pub fn reset_for_new_level(&mut self, spawn: (f32, f32), base_speed: f32) {
        let score = self.score;
        *self = Player::new(self.id, spawn, base_speed);
        self.score = score;
    }

    /// Applies a pickup's effect, capped per the §4.2 power-up table.
    pub fn apply_item(&mut self, item: ItemKind) {
        match item {
            ItemKind::RangeUp => self.bomb_range = (self.bomb_range + 1).min(MAX_BOMB_RANGE),
            ItemKind::BombUp => self.max_bombs = (self.max_bombs + 1).min(MAX_MAX_BOMBS),
            ItemKind::SpeedUp => self.speed = (self.speed + 1.0).min(MAX_SPEED),
            ItemKind::Kick => self.can_kick = true,
            ItemKind::Ghost => self.ghost_timer_ms = GHOST_DURATION_MS,
            ItemKind::Shield => self.has_shield = true,
        }
    }

    pub fn to_record(&self, color: u8) -> PlayerRecord {
        PlayerRecord {
            id: self.id,
            x: self.x,
            y: self.y,
            color,
            state: self.state,
            direction: self.direction,
            speed: self.speed,
            bomb_range: self.bomb_range,
            max_bombs: self.max_bombs,
            active_bombs: self.active_bombs,
            score: self.score,
            can_kick: self.can_kick,
            has_shield: self.has_shield,
            ghost_timer_ms: self.ghost_timer_ms,
            trapped_timer_ms: self.trapped_timer_ms,
            invincible_timer_ms: self.invincible_timer_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_caps_are_respected() {
        let mut p = Player::new(1, (0.0, 0.0), 3.0);
        for _ in 0..20 {
            p.apply_item(ItemKind::RangeUp);
            p.apply_item(ItemKind::BombUp);
            p.apply_item(ItemKind::SpeedUp);
        }
        assert_eq!(p.bomb_range, MAX_BOMB_RANGE);
        assert_eq!(p.max_bombs, MAX_MAX_BOMBS);
        assert_eq!(p.speed, MAX_SPEED);
    }

    #[test]
    fn ghost_pickup_refreshes_not_stacks() {
        let mut p = Player::new(1, (0.0, 0.0), 3.0);
        p.apply_item(ItemKind::Ghost);
        p.ghost_timer_ms = 1;
        p.apply_item(ItemKind::Ghost);
        assert_eq!(p.ghost_timer_ms, GHOST_DURATION_MS);
    }

    #[test]
    fn reset_for_new_level_preserves_score() {
        let mut p = Player::new(1, (0.0, 0.0), 3.0);
        p.score = 5;
        p.apply_item(ItemKind::Kick);
        p.reset_for_new_level((10.0, 10.0), 3.0);
        assert_eq!(p.score, 5);
        assert!(!p.can_kick);
        assert_eq!(p.x, 10.0);
    }
}
