//! C7: Simulation Loop. The canonical per-tick order from §4.2, which the
//! property tests in §8 depend on verbatim:
//!
//! 1. advance per-player timers (ghost, invincible, trapped)
//! 2. consume input, apply movement, relocate a player stranded by ghost expiry
//! 3. item pickup
//! 4. enemy AI
//! 5. bomb physics (sliding)
//! 6. fuse decrement and detonation
//! 7. explosion TTL decrement
//! 8. combat resolution
//! 9. win / level-clear arbitration
//!
//! Velocities scale with `time_factor = dt_ms / NOMINAL_TICK_MS` so movement is
//! frame-rate independent; countdown timers decrement by raw `dt_ms` so they
//! track wall-clock time regardless of tick rate (§4.2, §9 REDESIGN FLAG 1).

use std::collections::{HashMap, VecDeque};

use protocol::{Direction, GameMode, RoomPhase};

use crate::bomb::{advance_bomb_physics, detonate, kick_bomb, try_place_bomb};
use crate::collision::{blocked, predict_move, CollisionOptions};
use crate::combat::resolve_combat;
use crate::constants::{DEFAULT_FUSE_MS, LEVEL_CLEAR_DELAY_MS, NOMINAL_TICK_MS};
use crate::enemy::step_enemy;
use crate::grid::{pixel_to_cell, Cell};
use crate::level::{arbitrate, Arbitration};
use crate::room_state::RoomState;

/// A session's per-tick input, decoded from the latest [`protocol::ClientMessage`]s
/// it sent since the previous tick (§6 "edge-triggered... continuous while held").
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub bomb_requested: bool,
}

/// Advances `state` by one tick of `dt_ms` milliseconds, dispatching on the
/// room's current phase. Only `PLAYING` runs the nine-step order above; the
/// other phases just manage their own timers and transitions (§4.5).
pub fn tick(state: &mut RoomState, dt_ms: u32, inputs: &mut HashMap<u8, PlayerInput>) {
    match state.phase {
        RoomPhase::Waiting => {}
        RoomPhase::Countdown => tick_countdown(state, dt_ms),
        RoomPhase::Playing => tick_playing(state, dt_ms, inputs),
        RoomPhase::LevelClear => tick_level_clear(state, dt_ms),
        RoomPhase::Finished => {}
    }
}

fn tick_countdown(state: &mut RoomState, dt_ms: u32) {
    state.countdown_accum_ms += dt_ms;
    while state.countdown_accum_ms >= 1000 {
        state.countdown_accum_ms -= 1000;
        if state.countdown_s > 0 {
            state.countdown_s -= 1;
        }
    }
    if state.countdown_s == 0 {
        state.phase = RoomPhase::Playing;
    }
}

fn tick_level_clear(state: &mut RoomState, dt_ms: u32) {
    state.level_clear_accum_ms += dt_ms;
    if state.level_clear_accum_ms >= LEVEL_CLEAR_DELAY_MS {
        state.level_clear_accum_ms = 0;
        let next_level = state.level + 1;
        state.init_level(next_level);
        state.phase = RoomPhase::Playing;
    }
}

fn tick_playing(state: &mut RoomState, dt_ms: u32, inputs: &mut HashMap<u8, PlayerInput>) {
    let time_factor = dt_ms as f32 / NOMINAL_TICK_MS;

    advance_player_timers(state, dt_ms);
    consume_input_and_move(state, dt_ms, time_factor, inputs);
    resolve_item_pickup(state);
    run_enemy_ai(state, dt_ms, time_factor);
    advance_bombs(state, time_factor);
    decrement_fuses_and_detonate(state, dt_ms);
    decrement_explosions(state, dt_ms);
    resolve_combat(&mut state.players, &mut state.enemies, &state.explosions, state.game_mode);
    arbitrate_round(state);
}

/// Step 1: ghost/invincible/trapped timers. A player whose ghost mode just
/// expired while straddling a wall or bomb is relocated to the nearest open
/// cell by breadth-first search (§4.2 "ghost expiry relocation").
fn advance_player_timers(state: &mut RoomState, dt_ms: u32) {
    for player in state.players.iter_mut() {
        let was_ghost = player.is_ghost();
        player.ghost_timer_ms = player.ghost_timer_ms.saturating_sub(dt_ms);
        player.trapped_timer_ms = player.trapped_timer_ms.saturating_sub(dt_ms);
        if player.invincible_timer_ms > 0 {
            player.invincible_timer_ms = player.invincible_timer_ms.saturating_sub(dt_ms);
        }

        if was_ghost && !player.is_ghost() {
            let opts = CollisionOptions::default();
            if blocked(player.x, player.y, &state.grid, &state.bombs, &opts) {
                if let Some((x, y)) = nearest_open_cell_center(
                    &state.grid,
                    &state.bombs,
                    pixel_to_cell(player.x, player.y),
                ) {
                    player.x = x;
                    player.y = y;
                }
            }
        }
    }
}

/// BFS outward from `from` for the nearest cell the solid-collision kernel
/// does not block, returning its pixel-space center.
fn nearest_open_cell_center(
    grid: &crate::grid::Grid,
    bombs: &[crate::bomb::Bomb],
    from: Cell,
) -> Option<(f32, f32)> {
    let opts = CollisionOptions::default();
    let mut visited = std::collections::HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(from);
    visited.insert(from);

    while let Some(cell) = queue.pop_front() {
        let (cx, cy) = crate::grid::cell_center(cell);
        if !blocked(cx, cy, grid, bombs, &opts) {
            return Some((cx, cy));
        }
        for (dx, dy) in [(1i8, 0i8), (-1, 0), (0, 1), (0, -1)] {
            if let Some(next) = cell.neighbor(dx, dy) {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }
    None
}

/// Step 2: movement from held direction flags (classic single-axis Bomberman
/// control, priority up/down/left/right) plus bomb placement/kick requests. A
/// `TRAPPED` or `DEAD` player consumes no input (§3).
fn consume_input_and_move(
    state: &mut RoomState,
    _dt_ms: u32,
    time_factor: f32,
    inputs: &mut HashMap<u8, PlayerInput>,
) {
    for player in state.players.iter_mut() {
        if player.state != protocol::PlayerState::Normal {
            continue;
        }
        let Some(input) = inputs.get_mut(&player.id) else {
            continue;
        };
        // Bomb requests are one-shot (§4.7 "discrete events"); drain it the
        // moment it's consumed so a single `bomb {}` message doesn't re-fire
        // on every subsequent tick.
        let bomb_requested = std::mem::take(&mut input.bomb_requested);

        let direction = if input.up {
            Some(Direction::Up)
        } else if input.down {
            Some(Direction::Down)
        } else if input.left {
            Some(Direction::Left)
        } else if input.right {
            Some(Direction::Right)
        } else {
            None
        };

        if let Some(dir) = direction {
            player.direction = dir;
            let (dx, dy) = match dir {
                Direction::Up => (0.0, -1.0),
                Direction::Down => (0.0, 1.0),
                Direction::Left => (-1.0, 0.0),
                Direction::Right => (1.0, 0.0),
            };
            let speed = player.speed * time_factor;
            let opts = CollisionOptions {
                can_pass_soft_walls: player.is_ghost(),
                can_pass_bombs: player.is_ghost(),
                origin: Some((player.x, player.y)),
            };

            let blocked_by_bomb_to_kick = player.can_kick && !player.is_ghost() && {
                let next_cell = player.cell_in_direction(dir);
                next_cell.map_or(false, |c| state.bombs.iter().any(|b| b.cell() == c))
            };

            let (nx, ny) = predict_move(
                player.x, player.y, dx * speed, dy * speed, speed, &state.grid, &state.bombs, &opts,
            );
            player.x = nx;
            player.y = ny;

            if blocked_by_bomb_to_kick {
                if let Some(cell) = player.cell_in_direction(dir) {
                    if let Some(bomb) = state.bombs.iter_mut().find(|b| b.cell() == cell) {
                        kick_bomb(bomb, dir);
                    }
                }
            }
        }

        if bomb_requested && player.active_bombs < player.max_bombs {
            let cell = pixel_to_cell(player.x, player.y);
            if let Some(bomb) = try_place_bomb(
                &state.bombs,
                &mut state.next_bomb_id,
                player.id,
                cell,
                player.bomb_range,
                DEFAULT_FUSE_MS,
            ) {
                state.bombs.push(bomb);
                player.active_bombs += 1;
            }
        }
    }
}

/// Step 3: a player whose hitbox center enters an item's cell collects it.
fn resolve_item_pickup(state: &mut RoomState) {
    for player in state.players.iter_mut() {
        if !player.is_alive() {
            continue;
        }
        let cell = pixel_to_cell(player.x, player.y);
        if let Some(item) = state.items.take(cell) {
            player.apply_item(item);
        }
    }
}

/// Step 4: every enemy takes its per-kind action. `BOSS_SLIME` minion-spawn
/// requests are applied after the pass so the cap check sees a stable count.
fn run_enemy_ai(state: &mut RoomState, dt_ms: u32, time_factor: f32) {
    let total_enemy_count = state.enemies.len();
    let mut spawn_requests = Vec::new();

    for i in 0..state.enemies.len() {
        let mut enemy = state.enemies[i].clone();
        step_enemy(
            &mut enemy,
            dt_ms,
            time_factor,
            &state.players,
            &mut state.grid,
            &mut state.bombs,
            &mut state.next_bomb_id,
            total_enemy_count,
            &mut spawn_requests,
            state.rng.inner(),
        );
        state.enemies[i] = enemy;
    }

    for (kind, (x, y)) in spawn_requests {
        let id = state.next_enemy_id;
        state.next_enemy_id += 1;
        state
            .enemies
            .push(crate::enemy::Enemy::new(id, kind, (x, y)));
    }

    // Dead enemies are pruned in the combat step once their explosion hit is
    // resolved; a kind that died from contact damage alone is pruned here.
    state.enemies.retain(|e| e.is_alive());
}

/// Step 5: sliding-bomb integration, blocked by walls, other bombs, players and
/// enemies (§4.2 "Kick").
fn advance_bombs(state: &mut RoomState, time_factor: f32) {
    let players = &state.players;
    let enemies = &state.enemies;
    advance_bomb_physics(&mut state.bombs, &state.grid, time_factor, |cell, _bomb_id| {
        players.iter().any(|p| pixel_to_cell(p.x, p.y) == cell)
            || enemies.iter().any(|e| e.cell() == cell)
    });
}

/// Step 6: fuse countdown; any bomb reaching zero detonates, chaining into
/// whatever else the blast reaches (§4.2 "Detonation").
fn decrement_fuses_and_detonate(state: &mut RoomState, dt_ms: u32) {
    for bomb in state.bombs.iter_mut() {
        bomb.fuse_remaining_ms = bomb.fuse_remaining_ms.saturating_sub(dt_ms);
    }
    let expired: Vec<u32> = state
        .bombs
        .iter()
        .filter(|b| b.fuse_remaining_ms == 0)
        .map(|b| b.id)
        .collect();
    if expired.is_empty() {
        return;
    }

    let item_drop_chance = state.current_level_config().item_drop_chance;
    let result = detonate(
        &mut state.bombs,
        expired,
        &mut state.grid,
        &mut state.items,
        item_drop_chance,
        &mut state.next_explosion_id,
        state.rng.inner(),
    );
    state.items.advance_reveals();

    for owner_id in result.owners_to_decrement {
        if let Some(player) = state.player_mut(owner_id) {
            player.active_bombs = player.active_bombs.saturating_sub(1);
        }
    }
    state.explosions.extend(result.explosions);
}

/// Step 7: explosion cells live for `EXPLOSION_TTL_MS` then disappear.
fn decrement_explosions(state: &mut RoomState, dt_ms: u32) {
    for explosion in state.explosions.iter_mut() {
        explosion.ttl_ms = explosion.ttl_ms.saturating_sub(dt_ms);
    }
    state.explosions.retain(|e| e.ttl_ms > 0);
}

/// Step 9: win / level-clear / campaign-complete arbitration (§4.5).
fn arbitrate_round(state: &mut RoomState) {
    let config = state.current_level_config().clone();
    let is_last_level = state.is_last_level();
    let result = arbitrate(
        state.game_mode,
        &state.players,
        &config,
        &state.enemies,
        state.boss_spawned,
        is_last_level,
    );

    match result {
        Arbitration::None => {}
        Arbitration::LevelClear => {
            state.phase = RoomPhase::LevelClear;
            state.level_clear_accum_ms = 0;
        }
        Arbitration::CampaignComplete => {
            state.phase = RoomPhase::Finished;
            state.winner = protocol::Winner::CampaignComplete;
        }
        Arbitration::Finished(winner) => {
            state.phase = RoomPhase::Finished;
            state.winner = winner;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::GameMode;

    fn inputs_for(player_id: u8, input: PlayerInput) -> HashMap<u8, PlayerInput> {
        let mut map = HashMap::new();
        map.insert(player_id, input);
        map
    }

    #[test]
    fn countdown_reaches_zero_and_enters_playing() {
        let mut state = RoomState::new(GameMode::Pvp, "AAAA".into(), false, 1);
        state.add_player();
        state.add_player();
        state.phase = RoomPhase::Countdown;
        state.countdown_s = 3;

        for _ in 0..4 {
            tick(&mut state, 1000, &mut HashMap::new());
        }

        assert_eq!(state.phase, RoomPhase::Playing);
        assert_eq!(state.countdown_s, 0);
    }

    #[test]
    fn bomb_request_places_bomb_and_tracks_active_count() {
        let mut state = RoomState::new(GameMode::Pve, "BBBB".into(), false, 2);
        state.add_player();
        state.phase = RoomPhase::Playing;
        state.init_level(0);
        let player_id = state.players[0].id;

        let input = PlayerInput {
            bomb_requested: true,
            ..Default::default()
        };
        let mut inputs = inputs_for(player_id, input);
        tick(&mut state, 16, &mut inputs);

        assert_eq!(state.bombs.len(), 1);
        assert_eq!(state.players[0].active_bombs, 1);
        assert!(!inputs.get(&player_id).unwrap().bomb_requested, "one-shot bomb request must be drained after consumption");

        // A second tick with the same (now-drained) input map must not place
        // another bomb purely from the stale flag.
        tick(&mut state, 16, &mut inputs);
        assert_eq!(state.bombs.len(), 1);
    }

    #[test]
    fn trapped_player_does_not_move_on_input() {
        let mut state = RoomState::new(GameMode::Pvp, "CCCC".into(), false, 3);
        state.add_player();
        state.phase = RoomPhase::Playing;
        state.init_level(0);
        state.players[0].state = protocol::PlayerState::Trapped;
        state.players[0].trapped_timer_ms = 5000;
        let (start_x, start_y) = (state.players[0].x, state.players[0].y);

        let input = PlayerInput {
            right: true,
            ..Default::default()
        };
        tick(&mut state, 16, &mut inputs_for(1, input));

        assert_eq!((state.players[0].x, state.players[0].y), (start_x, start_y));
    }
}
