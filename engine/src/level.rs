//! C6: Level Manager. Static level configs, spawn placement, boss-spawn
//! trigger, win/loss/level-clear arbitration (§4.5).

use protocol::{EnemyKind, GameMode, PlayerState, RoomPhase, Winner};
use rand::Rng;

use crate::enemy::Enemy;
use crate::grid::{spawn_corner_cells, Cell, Grid};
use crate::player::Player;

/// A static per-level configuration (§4.5).
#[derive(Debug, Clone)]
pub struct LevelConfig {
    pub wall_density: f32,
    pub item_drop_chance: f32,
    pub enemies: Vec<EnemyKind>,
    pub boss: Option<EnemyKind>,
}

/// The PVE campaign: a fixed sequence of level configs. PVP rooms never
/// consult this table (no levels, no enemies).
pub fn campaign() -> Vec<LevelConfig> {
    vec![
        LevelConfig {
            wall_density: 0.5,
            item_drop_chance: 0.3,
            enemies: vec![EnemyKind::Balloon, EnemyKind::Balloon],
            boss: None,
        },
        LevelConfig {
            wall_density: 0.55,
            item_drop_chance: 0.3,
            enemies: vec![EnemyKind::Balloon, EnemyKind::Ghost, EnemyKind::Frog],
            boss: None,
        },
        LevelConfig {
            wall_density: 0.6,
            item_drop_chance: 0.35,
            enemies: vec![EnemyKind::Minion, EnemyKind::Minion, EnemyKind::Tank],
            boss: None,
        },
        LevelConfig {
            wall_density: 0.6,
            item_drop_chance: 0.35,
            enemies: vec![],
            boss: Some(EnemyKind::BossSlime),
        },
        LevelConfig {
            wall_density: 0.65,
            item_drop_chance: 0.4,
            enemies: vec![],
            boss: Some(EnemyKind::BossMecha),
        },
    ]
}

/// Places up to `count` enemies at cells that are not a spawn corner, not a
/// hard wall, and not already occupied. Per §7 ("Level spawn exhaustion"),
/// fewer enemies than configured is an acceptable outcome — the arbiter only
/// cares about "zero live enemies", not "number spawned".
pub fn spawn_enemies(
    kinds: &[EnemyKind],
    grid: &Grid,
    next_enemy_id: &mut u32,
    rng: &mut impl rand::RngCore,
) -> Vec<Enemy> {
    let forbidden = spawn_corner_cells();
    let mut spawned = Vec::with_capacity(kinds.len());

    for &kind in kinds {
        for _ in 0..200 {
            let col = rng.gen_range(1..grid.width() - 1);
            let row = rng.gen_range(1..grid.height() - 1);
            let cell = Cell::new(col, row);
            if forbidden.contains(&cell) {
                continue;
            }
            if grid.get(cell) != protocol::TileKind::Empty {
                continue;
            }
            if spawned.iter().any(|e: &Enemy| e.cell() == cell) {
                continue;
            }
            let id = *next_enemy_id;
            *next_enemy_id += 1;
            spawned.push(Enemy::new(id, kind, crate::grid::cell_center(cell)));
            break;
        }
    }

    spawned
}

/// Finds a valid spot for the boss: same placement rule as regular enemies.
pub fn spawn_boss(
    kind: EnemyKind,
    grid: &Grid,
    next_enemy_id: &mut u32,
    rng: &mut impl rand::RngCore,
) -> Option<Enemy> {
    spawn_enemies(&[kind], grid, next_enemy_id, rng)
        .into_iter()
        .next()
}

/// True once every configured enemy is dead *and* (no boss configured, or the
/// boss has spawned and is also dead) (§4.5).
pub fn level_complete(config: &LevelConfig, enemies: &[Enemy], boss_spawned: bool) -> bool {
    let all_enemies_dead = enemies.is_empty();
    let boss_condition_met = match config.boss {
        None => true,
        Some(_) => boss_spawned,
    };
    all_enemies_dead && boss_condition_met
}

/// The result of this tick's win/loss/level-clear arbitration (§4.5).
pub enum Arbitration {
    None,
    LevelClear,
    CampaignComplete,
    Finished(Winner),
}

/// Runs the per-tick arbitration described in §4.5.
pub fn arbitrate(
    game_mode: GameMode,
    players: &[Player],
    config: &LevelConfig,
    enemies: &[Enemy],
    boss_spawned: bool,
    is_last_level: bool,
) -> Arbitration {
    match game_mode {
        GameMode::Pve => {
            if level_complete(config, enemies, boss_spawned) {
                return if is_last_level {
                    Arbitration::CampaignComplete
                } else {
                    Arbitration::LevelClear
                };
            }
            if players.iter().all(|p| p.state == PlayerState::Dead) {
                return Arbitration::Finished(Winner::None);
            }
            Arbitration::None
        }
        GameMode::Pvp => {
            let live: Vec<&Player> = players.iter().filter(|p| p.is_alive()).collect();
            if live.is_empty() {
                return Arbitration::Finished(Winner::None);
            }
            let any_trapped = players.iter().any(|p| p.state == PlayerState::Trapped);
            if live.len() == 1 && !any_trapped {
                return Arbitration::Finished(Winner::Player(live[0].id));
            }
            Arbitration::None
        }
    }
}

/// Maps an `Arbitration` outcome to the resulting room phase, leaving the
/// winner/boss/level bookkeeping to the caller (`simulation.rs`).
pub fn phase_for(arbitration: &Arbitration, current: RoomPhase) -> RoomPhase {
    match arbitration {
        Arbitration::None => current,
        Arbitration::LevelClear => RoomPhase::LevelClear,
        Arbitration::CampaignComplete => RoomPhase::Finished,
        Arbitration::Finished(_) => RoomPhase::Finished,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn pvp_last_standing_wins() {
        let mut p1 = Player::new(1, (0.0, 0.0), 3.0);
        let mut p2 = Player::new(2, (0.0, 0.0), 3.0);
        p2.state = PlayerState::Dead;
        p1.state = PlayerState::Normal;
        let config = LevelConfig {
            wall_density: 0.0,
            item_drop_chance: 0.0,
            enemies: vec![],
            boss: None,
        };
        let result = arbitrate(GameMode::Pvp, &[p1, p2], &config, &[], false, false);
        assert!(matches!(result, Arbitration::Finished(Winner::Player(1))));
    }

    #[test]
    fn pvp_draw_when_all_dead() {
        let mut p1 = Player::new(1, (0.0, 0.0), 3.0);
        let mut p2 = Player::new(2, (0.0, 0.0), 3.0);
        p1.state = PlayerState::Dead;
        p2.state = PlayerState::Dead;
        let config = LevelConfig {
            wall_density: 0.0,
            item_drop_chance: 0.0,
            enemies: vec![],
            boss: None,
        };
        let result = arbitrate(GameMode::Pvp, &[p1, p2], &config, &[], false, false);
        assert!(matches!(result, Arbitration::Finished(Winner::None)));
    }

    #[test]
    fn level_clear_requires_boss_dead_when_configured() {
        let config = LevelConfig {
            wall_density: 0.0,
            item_drop_chance: 0.0,
            enemies: vec![],
            boss: Some(EnemyKind::BossSlime),
        };
        assert!(!level_complete(&config, &[], false));
        assert!(level_complete(&config, &[], true));
    }

    #[test]
    fn spawn_enemies_avoids_spawn_corners() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let grid = Grid::generate(0.0, &mut rng);
        let mut next_id = 1;
        let kinds = vec![EnemyKind::Balloon; 5];
        let enemies = spawn_enemies(&kinds, &grid, &mut next_id, &mut rng);
        let forbidden = spawn_corner_cells();
        for enemy in &enemies {
            assert!(!forbidden.contains(&enemy.cell()));
        }
    }
}
