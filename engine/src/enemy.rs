//! C4: Enemy AI. A per-kind strategy table — a lookup from kind to a pure step
//! function `(enemy, worldView, dt) -> mutation` — rather than a class
//! hierarchy, per spec.md §9 REDESIGN FLAGS ("Class hierarchies for enemies").
//! Shared primitives (nearest target, danger field, dodge, chase) are free
//! functions used by several kinds, matching the teacher's "newer, shared
//! module" AI design spec.md §9 calls out as the intended one (open question 1).

use protocol::{Direction, EnemyKind, EnemyRecord};

use crate::bomb::Bomb;
use crate::collision::{blocked, predict_move, CollisionOptions};
use crate::constants::{
    BALLOON_REPICK_MAX_MS, BALLOON_REPICK_MIN_MS, CHASE_ESCAPE_MS, CHASE_REEVALUATE_MS,
    DODGE_THRESHOLD_MS, FROG_JUMP_COOLDOWN_MS, MECHA_ACTION_COOLDOWN_MS,
    MECHA_FAST_REEVALUATE_MS, SLIME_ACTION_CYCLE_MS, SLIME_MAX_TOTAL_ENEMIES,
};
use crate::grid::{pixel_to_cell, Cell, Grid};
use crate::player::Player;

#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: u32,
    pub kind: EnemyKind,
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub speed: f32,
    pub hp: u8,
    pub max_hp: u8,
    pub change_dir_timer_ms: i32,
    pub action_timer_ms: i32,
    pub invincible_timer_ms: u32,
}

impl Enemy {
    pub fn new(id: u32, kind: EnemyKind, spawn: (f32, f32)) -> Self {
        let (speed, hp) = kind_stats(kind);
        Enemy {
            id,
            kind,
            x: spawn.0,
            y: spawn.1,
            direction: Direction::Down,
            speed,
            hp,
            max_hp: hp,
            change_dir_timer_ms: 0,
            action_timer_ms: match kind {
                EnemyKind::BossSlime => SLIME_ACTION_CYCLE_MS as i32,
                EnemyKind::BossMecha => MECHA_ACTION_COOLDOWN_MS as i32,
                _ => 0,
            },
            invincible_timer_ms: 0,
        }
    }

    pub fn cell(&self) -> Cell {
        pixel_to_cell(self.x, self.y)
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn to_record(&self) -> EnemyRecord {
        EnemyRecord {
            id: self.id,
            enemy_type: self.kind,
            x: self.x,
            y: self.y,
            direction: self.direction,
            speed: self.speed,
            hp: self.hp,
            max_hp: self.max_hp,
        }
    }
}

/// `(speed, hp)` per kind. Spec.md §9 (REDESIGN FLAG 2) leaves absolute
/// numbers to the implementer; only the relative ordering is normative:
/// `TANK < BALLOON < FROG ≈ MINION < GHOST < BOSS_MECHA < BOSS_SLIME`.
fn kind_stats(kind: EnemyKind) -> (f32, u8) {
    match kind {
        EnemyKind::Tank => (0.8, 2),
        EnemyKind::Balloon => (1.2, 1),
        EnemyKind::Frog => (1.5, 1),
        EnemyKind::Minion => (1.5, 1),
        EnemyKind::Ghost => (1.8, 1),
        EnemyKind::BossMecha => (2.0, 10),
        EnemyKind::BossSlime => (2.2, 14),
    }
}

const DIRECTIONS: [Direction; 4] = [
    Direction::Up,
    Direction::Down,
    Direction::Left,
    Direction::Right,
];

fn direction_delta(dir: Direction) -> (f32, f32) {
    match dir {
        Direction::Up => (0.0, -1.0),
        Direction::Down => (0.0, 1.0),
        Direction::Left => (-1.0, 0.0),
        Direction::Right => (1.0, 0.0),
    }
}

fn is_cell_blocked(cell: Cell, grid: &Grid, bombs: &[Bomb]) -> bool {
    let (cx, cy) = crate::grid::cell_center(cell);
    blocked(cx, cy, grid, bombs, &CollisionOptions::default())
}

// ---- Shared primitives (§4.3) -------------------------------------------

/// Euclidean-nearest live (non-DEAD) player.
pub fn find_nearest_living<'a>(enemy: &Enemy, players: &'a [Player]) -> Option<&'a Player> {
    players
        .iter()
        .filter(|p| p.is_alive())
        .min_by(|a, b| {
            dist_sq(enemy.x, enemy.y, a.x, a.y)
                .partial_cmp(&dist_sq(enemy.x, enemy.y, b.x, b.y))
                .unwrap()
        })
}

fn dist_sq(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let dx = x1 - x2;
    let dy = y1 - y2;
    dx * dx + dy * dy
}

/// Evaluates the four cardinal directions toward `target`; score = the axis
/// delta magnitude moved toward the target, negative if moving away. Prefers
/// unblocked over blocked, ties broken by highest score. Falls back to a
/// random unblocked direction if the best-scoring direction is blocked.
pub fn chase_direction(
    enemy: &Enemy,
    target: (f32, f32),
    grid: &Grid,
    bombs: &[Bomb],
    rng: &mut impl rand::RngCore,
) -> Option<Direction> {
    let mut scored: Vec<(Direction, f32, bool)> = DIRECTIONS
        .iter()
        .map(|&dir| {
            let (dx, dy) = direction_delta(dir);
            let score = if dx != 0.0 {
                (target.0 - enemy.x) * dx
            } else {
                (target.1 - enemy.y) * dy
            };
            let next = (enemy.x + dx * enemy.speed, enemy.y + dy * enemy.speed);
            let cell_blocked = blocked(next.0, next.1, grid, bombs, &CollisionOptions::default());
            (dir, score, cell_blocked)
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    if let Some(&(best_dir, _, best_blocked)) = scored.first() {
        if !best_blocked {
            return Some(best_dir);
        }
    }

    let unblocked: Vec<Direction> = scored
        .iter()
        .filter(|(_, _, b)| !*b)
        .map(|(d, _, _)| *d)
        .collect();
    if unblocked.is_empty() {
        return None;
    }
    use rand::Rng;
    Some(unblocked[rng.gen_range(0..unblocked.len())])
}

/// Accumulated danger contribution of every bomb threatening `cell`, scored
/// `max(0, DODGE_THRESHOLD - fuseRemaining + 1000)` per threatening bomb.
pub fn danger_level(cell: Cell, bombs: &[Bomb]) -> i32 {
    bombs
        .iter()
        .filter(|b| cell_in_blast_cross(cell, b))
        .map(|b| {
            (DODGE_THRESHOLD_MS as i32 - b.fuse_remaining_ms as i32 + 1000).max(0)
        })
        .sum()
}

fn cell_in_blast_cross(cell: Cell, bomb: &Bomb) -> bool {
    if cell == bomb.cell {
        return true;
    }
    let same_row = cell.row == bomb.cell.row
        && (cell.col as i16 - bomb.cell.col as i16).unsigned_abs() <= bomb.range as u16;
    let same_col = cell.col == bomb.cell.col
        && (cell.row as i16 - bomb.cell.row as i16).unsigned_abs() <= bomb.range as u16;
    same_row || same_col
}

/// True iff any bomb with `fuse_remaining <= DODGE_THRESHOLD` has `entity`'s
/// cell inside its blast cross.
pub fn is_in_danger(cell: Cell, bombs: &[Bomb]) -> bool {
    bombs
        .iter()
        .any(|b| b.fuse_remaining_ms <= DODGE_THRESHOLD_MS && cell_in_blast_cross(cell, b))
}

/// From the four neighbor cells, the unblocked one with strictly lower danger
/// than the current cell; `None` if no improvement exists.
pub fn dodge_direction(enemy: &Enemy, grid: &Grid, bombs: &[Bomb]) -> Option<Direction> {
    let current_cell = enemy.cell();
    let current_danger = danger_level(current_cell, bombs);

    let mut best: Option<(Direction, i32)> = None;
    for &dir in &DIRECTIONS {
        let (dx, dy) = direction_delta(dir);
        let Some(cell) = current_cell.neighbor(dx as i8, dy as i8) else {
            continue;
        };
        if is_cell_blocked(cell, grid, bombs) {
            continue;
        }
        let danger = danger_level(cell, bombs);
        if danger < current_danger && best.map_or(true, |(_, best_danger)| danger < best_danger) {
            best = Some((dir, danger));
        }
    }
    best.map(|(dir, _)| dir)
}

// ---- Per-kind behavior (§4.3) --------------------------------------------

/// Runs the shared scheduler — decrement timers, invoke kind-specific
/// behavior, attempt the chosen move, re-pick on collision — for one enemy.
pub fn step_enemy(
    enemy: &mut Enemy,
    dt_ms: u32,
    time_factor: f32,
    players: &[Player],
    grid: &mut Grid,
    bombs: &mut Vec<Bomb>,
    next_bomb_id: &mut u32,
    total_enemy_count: usize,
    spawn_requests: &mut Vec<(EnemyKind, (f32, f32))>,
    rng: &mut impl rand::RngCore,
) {
    enemy.change_dir_timer_ms -= dt_ms as i32;
    enemy.action_timer_ms -= dt_ms as i32;
    if enemy.invincible_timer_ms > 0 {
        enemy.invincible_timer_ms = enemy.invincible_timer_ms.saturating_sub(dt_ms);
    }

    let chosen_direction = match enemy.kind {
        EnemyKind::Balloon => step_balloon(enemy, grid, bombs, rng),
        EnemyKind::Ghost | EnemyKind::Minion | EnemyKind::Tank => {
            step_chaser(enemy, players, grid, bombs, rng)
        }
        EnemyKind::Frog => step_frog(enemy, grid, bombs, rng),
        EnemyKind::BossSlime => step_boss_slime(
            enemy,
            players,
            grid,
            bombs,
            total_enemy_count,
            spawn_requests,
            rng,
        ),
        EnemyKind::BossMecha => step_boss_mecha(enemy, players, grid, bombs, next_bomb_id, rng),
    };

    if let Some(dir) = chosen_direction {
        enemy.direction = dir;
        let (dx, dy) = direction_delta(dir);
        let speed = enemy.speed * time_factor;
        let (nx, ny) = predict_move(
            enemy.x,
            enemy.y,
            dx * speed,
            dy * speed,
            speed,
            grid,
            bombs,
            &CollisionOptions::default(),
        );
        if nx == enemy.x && ny == enemy.y {
            // Blocked: force a re-choice next tick.
            enemy.change_dir_timer_ms = 0;
        } else {
            enemy.x = nx;
            enemy.y = ny;
        }
    }
}

fn step_balloon(
    enemy: &mut Enemy,
    grid: &Grid,
    bombs: &[Bomb],
    rng: &mut impl rand::RngCore,
) -> Option<Direction> {
    use rand::Rng;
    if enemy.change_dir_timer_ms <= 0 {
        enemy.direction = DIRECTIONS[rng.gen_range(0..DIRECTIONS.len())];
        enemy.change_dir_timer_ms =
            rng.gen_range(BALLOON_REPICK_MIN_MS..=BALLOON_REPICK_MAX_MS) as i32;
    }
    let _ = (grid, bombs);
    Some(enemy.direction)
}

fn step_chaser(
    enemy: &mut Enemy,
    players: &[Player],
    grid: &Grid,
    bombs: &[Bomb],
    rng: &mut impl rand::RngCore,
) -> Option<Direction> {
    use rand::Rng;
    if enemy.change_dir_timer_ms > 0 {
        return Some(enemy.direction);
    }
    enemy.change_dir_timer_ms = CHASE_REEVALUATE_MS as i32;

    let Some(target) = find_nearest_living(enemy, players) else {
        return None;
    };
    match chase_direction(enemy, (target.x, target.y), grid, bombs, rng) {
        Some(dir) => Some(dir),
        None => {
            // No unblocked direction at all: brief random escape window.
            enemy.change_dir_timer_ms = CHASE_ESCAPE_MS as i32;
            Some(DIRECTIONS[rng.gen_range(0..DIRECTIONS.len())])
        }
    }
}

fn step_frog(
    enemy: &mut Enemy,
    grid: &mut Grid,
    bombs: &[Bomb],
    rng: &mut impl rand::RngCore,
) -> Option<Direction> {
    use rand::Rng;
    if enemy.change_dir_timer_ms <= 0 {
        enemy.direction = DIRECTIONS[rng.gen_range(0..DIRECTIONS.len())];
        enemy.change_dir_timer_ms =
            rng.gen_range(BALLOON_REPICK_MIN_MS..=BALLOON_REPICK_MAX_MS) as i32;
    }

    let cell = enemy.cell();
    let (dx, dy) = direction_delta(enemy.direction);
    let ahead = cell.neighbor(dx as i8, dy as i8);
    let next_move_blocked = match ahead {
        Some(c) => is_cell_blocked(c, grid, bombs),
        None => true,
    };

    if !next_move_blocked {
        return Some(enemy.direction);
    }

    // Blocked: attempt a jump over an intervening soft wall.
    if let (Some(mid), Some(landing)) = (
        ahead,
        cell.neighbor((dx * 2.0) as i8, (dy * 2.0) as i8),
    ) {
        let mid_is_soft = grid.get(mid) == protocol::TileKind::SoftWall;
        let landing_is_empty = grid.get(landing) == protocol::TileKind::Empty
            && !bombs.iter().any(|b| b.cell == landing);
        if mid_is_soft && landing_is_empty {
            let (lx, ly) = crate::grid::cell_center(landing);
            enemy.x = lx;
            enemy.y = ly;
            enemy.change_dir_timer_ms = FROG_JUMP_COOLDOWN_MS as i32;
            return None;
        }
    }

    enemy.change_dir_timer_ms = 0;
    None
}

fn step_boss_slime(
    enemy: &mut Enemy,
    players: &[Player],
    grid: &Grid,
    bombs: &[Bomb],
    total_enemy_count: usize,
    spawn_requests: &mut Vec<(EnemyKind, (f32, f32))>,
    rng: &mut impl rand::RngCore,
) -> Option<Direction> {
    if enemy.action_timer_ms <= 0 {
        enemy.action_timer_ms = SLIME_ACTION_CYCLE_MS as i32;
        if total_enemy_count < SLIME_MAX_TOTAL_ENEMIES {
            spawn_requests.push((EnemyKind::Minion, (enemy.x, enemy.y)));
        }
    }
    step_chaser(enemy, players, grid, bombs, rng)
}

fn step_boss_mecha(
    enemy: &mut Enemy,
    players: &[Player],
    grid: &Grid,
    bombs: &mut Vec<Bomb>,
    next_bomb_id: &mut u32,
    rng: &mut impl rand::RngCore,
) -> Option<Direction> {
    use crate::constants::{MECHA_BOMB_FUSE_MS, MECHA_BOMB_RANGE};

    // Priority 1: self-preservation. A safe cell always wins over chasing or
    // bombing — the mecha must never commit suicide into its own blast (§4.3,
    // asserted by tests).
    if let Some(dir) = dodge_direction(enemy, grid, bombs) {
        enemy.change_dir_timer_ms = MECHA_FAST_REEVALUATE_MS as i32;
        return Some(dir);
    }

    // Priority 2: place the mega-bomb if off cooldown and currently safe.
    if enemy.action_timer_ms <= 0 && !is_in_danger(enemy.cell(), bombs) {
        enemy.action_timer_ms = MECHA_ACTION_COOLDOWN_MS as i32;
        if let Some(bomb) = crate::bomb::try_place_bomb(
            bombs,
            next_bomb_id,
            0,
            enemy.cell(),
            MECHA_BOMB_RANGE,
            MECHA_BOMB_FUSE_MS,
        ) {
            bombs.push(bomb);
        }
    }

    // Priority 3: chase.
    step_chaser(enemy, players, grid, bombs, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::PlayerState;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn empty_grid() -> Grid {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        Grid::generate(0.0, &mut rng)
    }

    #[test]
    fn find_nearest_living_ignores_dead() {
        let grid = empty_grid();
        let enemy = Enemy::new(1, EnemyKind::Balloon, crate::grid::cell_center(Cell::new(7, 6)));
        let mut near = Player::new(1, crate::grid::cell_center(Cell::new(7, 5)), 3.0);
        near.state = PlayerState::Dead;
        let far = Player::new(2, crate::grid::cell_center(Cell::new(1, 1)), 3.0);
        let players = vec![near, far];
        let nearest = find_nearest_living(&enemy, &players).unwrap();
        assert_eq!(nearest.id, 2);
        let _ = grid;
    }

    #[test]
    fn mecha_never_bombs_while_in_self_danger() {
        let grid = empty_grid();
        let spawn = crate::grid::cell_center(Cell::new(5, 5));
        let mut mecha = Enemy::new(1, EnemyKind::BossMecha, spawn);
        mecha.action_timer_ms = 0;
        let bomb = crate::bomb::Bomb {
            id: 1,
            owner_id: 0,
            cell: mecha.cell(),
            x: spawn.0,
            y: spawn.1,
            vx: 0.0,
            vy: 0.0,
            range: 3,
            fuse_remaining_ms: 500,
        };
        let mut bombs = vec![bomb];
        let mut next_id = 2;
        let players = vec![Player::new(1, crate::grid::cell_center(Cell::new(1, 1)), 3.0)];
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        step_boss_mecha(&mut mecha, &players, &grid, &mut bombs, &mut next_id, &mut rng);

        // Either it dodged (still 1 bomb: the threatening one) or, if no dodge
        // existed, it must not have added a second self-placed bomb while in danger.
        assert_eq!(bombs.len(), 1);
    }

    #[test]
    fn dodge_direction_prefers_strictly_lower_danger() {
        let grid = empty_grid();
        let enemy = Enemy::new(1, EnemyKind::BossMecha, crate::grid::cell_center(Cell::new(5, 5)));
        let bomb = crate::bomb::Bomb {
            id: 1,
            owner_id: 0,
            cell: enemy.cell(),
            x: enemy.x,
            y: enemy.y,
            vx: 0.0,
            vy: 0.0,
            range: 0,
            fuse_remaining_ms: 100,
        };
        let bombs = vec![bomb];
        let dodge = dodge_direction(&enemy, &grid, &bombs);
        assert!(dodge.is_some());
    }
}
