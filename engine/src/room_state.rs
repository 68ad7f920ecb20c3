//! §3 Room State: the bundle a `Room` exclusively owns (§3 "Ownership").

use protocol::{GameMode, RoomPhase, Snapshot, Winner};

use crate::bomb::{Bomb, Explosion};
use crate::constants::{BASE_SPEED, COUNTDOWN_S};
use crate::enemy::Enemy;
use crate::grid::{spawn_point, Grid};
use crate::items::ItemMap;
use crate::level::{campaign, LevelConfig};
use crate::player::Player;
use crate::rng::RoomRng;

pub struct RoomState {
    pub grid: Grid,
    pub items: ItemMap,
    pub players: Vec<Player>,
    pub bombs: Vec<Bomb>,
    pub explosions: Vec<Explosion>,
    pub enemies: Vec<Enemy>,
    pub phase: RoomPhase,
    pub countdown_s: u8,
    pub time_left_s: u32,
    pub level: u16,
    pub winner: Winner,
    pub boss_spawned: bool,
    pub game_mode: GameMode,
    pub room_code: String,
    pub is_private: bool,

    pub rng: RoomRng,
    pub next_bomb_id: u32,
    pub next_explosion_id: u32,
    pub next_enemy_id: u32,

    /// Milliseconds accumulated toward the next whole-second `countdown_s`
    /// decrement. Not part of the wire snapshot (§6 only exposes whole seconds).
    pub countdown_accum_ms: u32,
    /// Milliseconds spent in `LEVEL_CLEAR` so far, gating the pause before the
    /// next level starts (§4.5).
    pub level_clear_accum_ms: u32,
}

impl RoomState {
    pub fn new(game_mode: GameMode, room_code: String, is_private: bool, seed: u64) -> Self {
        let mut rng = RoomRng::from_seed(seed);
        let config = &campaign()[0];
        let grid = Grid::generate(config.wall_density, rng.inner());

        RoomState {
            grid,
            items: ItemMap::new(),
            players: Vec::new(),
            bombs: Vec::new(),
            explosions: Vec::new(),
            enemies: Vec::new(),
            phase: RoomPhase::Waiting,
            countdown_s: COUNTDOWN_S,
            time_left_s: 0,
            level: 0,
            winner: Winner::None,
            boss_spawned: false,
            game_mode,
            room_code,
            is_private,
            rng,
            next_bomb_id: 1,
            next_explosion_id: 1,
            next_enemy_id: 1,
            countdown_accum_ms: 0,
            level_clear_accum_ms: 0,
        }
    }

    pub fn current_level_config(&self) -> &LevelConfig {
        let levels = LEVELS.get_or_init(campaign);
        &levels[(self.level as usize).min(levels.len() - 1)]
    }

    pub fn is_last_level(&self) -> bool {
        let levels = LEVELS.get_or_init(campaign);
        self.level as usize + 1 >= levels.len()
    }

    /// Adds a new player at the next free spawn corner (§4.6 capacity model).
    pub fn add_player(&mut self) -> u8 {
        let index = self.players.len() as u8;
        let id = index + 1;
        let spawn = spawn_point(index);
        self.players.push(Player::new(id, spawn, BASE_SPEED));
        id
    }

    pub fn remove_player(&mut self, player_id: u8) {
        self.players.retain(|p| p.id != player_id);
    }

    pub fn player_mut(&mut self, player_id: u8) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    /// Rebuilds the grid/items for a (possibly new) level while preserving
    /// player scores (§4.5 `initLevel`).
    pub fn init_level(&mut self, level: u16) {
        self.level = level;
        self.boss_spawned = false;
        self.bombs.clear();
        self.explosions.clear();
        self.items.clear();

        let config = self.current_level_config().clone();
        self.grid = Grid::generate(config.wall_density, self.rng.inner());

        for (index, player) in self.players.iter_mut().enumerate() {
            let spawn = spawn_point(index as u8);
            player.reset_for_new_level(spawn, BASE_SPEED);
        }

        self.enemies = crate::level::spawn_enemies(
            &config.enemies,
            &self.grid,
            &mut self.next_enemy_id,
            self.rng.inner(),
        );

        // A level with no regular trash (the boss levels) has nothing to clear
        // before the boss shows up, so it spawns immediately (§4.5).
        if let Some(boss_kind) = config.boss {
            if let Some(boss) = crate::level::spawn_boss(
                boss_kind,
                &self.grid,
                &mut self.next_enemy_id,
                self.rng.inner(),
            ) {
                self.enemies.push(boss);
                self.boss_spawned = true;
            }
        }
    }

    /// Resets everything including score and re-enters COUNTDOWN, used after
    /// a FINISHED room is restarted (§4.5).
    pub fn restart(&mut self) {
        for player in self.players.iter_mut() {
            player.score = 0;
        }
        self.winner = Winner::None;
        self.phase = RoomPhase::Countdown;
        self.countdown_s = COUNTDOWN_S;
        self.countdown_accum_ms = 0;
        self.init_level(0);
    }

    pub fn to_snapshot(&self) -> Snapshot {
        use protocol::{BombRecord, EnemyRecord, ExplosionRecord, ItemRecord, PlayerRecord};

        let grid_tiles: Vec<_> = self.grid.iter_cells().map(|c| self.grid.get(c)).collect();
        let items: Vec<ItemRecord> = self
            .items
            .iter()
            .map(|(cell, kind)| ItemRecord {
                grid_x: cell.col,
                grid_y: cell.row,
                item_type: kind,
            })
            .collect();
        let players: Vec<PlayerRecord> = self
            .players
            .iter()
            .enumerate()
            .map(|(i, p)| p.to_record(i as u8))
            .collect();
        let bombs: Vec<BombRecord> = self.bombs.iter().map(Bomb::to_record).collect();
        let explosions: Vec<ExplosionRecord> =
            self.explosions.iter().map(Explosion::to_record).collect();
        let enemies: Vec<EnemyRecord> = self.enemies.iter().map(Enemy::to_record).collect();

        Snapshot {
            phase: self.phase,
            game_mode: self.game_mode,
            room_code: self.room_code.clone(),
            is_private: self.is_private,
            countdown_s: self.countdown_s,
            time_left_s: self.time_left_s,
            level: self.level,
            winner: self.winner,
            boss_spawned: self.boss_spawned,
            grid_width: self.grid.width(),
            grid_height: self.grid.height(),
            grid: grid_tiles,
            items,
            players,
            bombs,
            explosions,
            enemies,
        }
    }
}

static LEVELS: std::sync::OnceLock<Vec<LevelConfig>> = std::sync::OnceLock::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_player_assigns_sequential_ids_and_spawn_corners() {
        let mut state = RoomState::new(GameMode::Pvp, "ABCD".into(), false, 1);
        let id1 = state.add_player();
        let id2 = state.add_player();
        assert_eq!(id1, 1);
        assert_eq!(id2, 2);
        assert_ne!(
            (state.players[0].x, state.players[0].y),
            (state.players[1].x, state.players[1].y)
        );
    }

    #[test]
    fn restart_resets_score_and_phase() {
        let mut state = RoomState::new(GameMode::Pve, "WXYZ".into(), false, 2);
        state.add_player();
        state.players[0].score = 9;
        state.phase = RoomPhase::Finished;
        state.restart();
        assert_eq!(state.players[0].score, 0);
        assert_eq!(state.phase, RoomPhase::Countdown);
    }
}
