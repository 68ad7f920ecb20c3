//! C5: Combat Resolver. All damage flows through the single `hurt` funnel
//! (§4.4).

use protocol::{GameMode, PlayerState};

use crate::bomb::Explosion;
use crate::constants::{
    ENEMY_HIT_INVINCIBILITY_MS, HIT_INVINCIBILITY_MS, RESCUE_INVINCIBILITY_MS,
    TRAPPED_DURATION_MS,
};
use crate::enemy::Enemy;
use crate::grid::pixel_to_cell;
use crate::player::Player;

/// The single damage funnel (§4.4): shield absorbs first, then NORMAL escalates
/// to TRAPPED (with brief invincibility), then TRAPPED (if not currently
/// invincible) escalates to DEAD.
pub fn hurt(player: &mut Player) {
    if player.has_shield {
        player.has_shield = false;
        player.invincible_timer_ms = HIT_INVINCIBILITY_MS;
        return;
    }
    match player.state {
        PlayerState::Normal => {
            player.state = PlayerState::Trapped;
            player.trapped_timer_ms = TRAPPED_DURATION_MS;
            player.invincible_timer_ms = HIT_INVINCIBILITY_MS;
        }
        PlayerState::Trapped => {
            if player.invincible_timer_ms == 0 {
                player.state = PlayerState::Dead;
            }
        }
        PlayerState::Dead => {}
    }
}

fn player_hitbox_overlaps_cell(player: &Player, cell: crate::grid::Cell) -> bool {
    pixel_to_cell(player.x, player.y) == cell
}

/// Runs the per-tick combat resolution described in §4.4, in the order the
/// spec lists it: invincibility tick, explosion damage to players, trapped
/// countdown to death, PVE enemy-vs-explosion damage and scoring, PVE
/// player-vs-enemy contact damage, then teammate rescue.
pub fn resolve_combat(
    players: &mut [Player],
    enemies: &mut Vec<Enemy>,
    explosions: &[Explosion],
    game_mode: GameMode,
) {
    for player in players.iter_mut() {
        if !player.is_alive() {
            continue;
        }
        if player.invincible_timer_ms > 0 {
            // Decrementing happens centrally in the timer-advance step (§4.2
            // step 1); here we only gate the damage check for this tick.
            continue;
        }
        let cell = pixel_to_cell(player.x, player.y);
        if explosions.iter().any(|e| e.cell == cell) {
            hurt(player);
        }
    }

    // `trapped_timer_ms` itself is decremented in the timer-advance step
    // (§4.2 step 1); here we only act on it reaching zero (§4.4).
    for player in players.iter_mut() {
        if player.state == PlayerState::Trapped && player.trapped_timer_ms == 0 {
            player.state = PlayerState::Dead;
        }
    }

    if game_mode == GameMode::Pve {
        let mut kept = Vec::with_capacity(enemies.len());
        for mut enemy in std::mem::take(enemies) {
            if enemy.invincible_timer_ms == 0 {
                if let Some(hit) = explosions.iter().find(|e| e.cell == enemy.cell()) {
                    enemy.hp = enemy.hp.saturating_sub(1);
                    enemy.invincible_timer_ms = ENEMY_HIT_INVINCIBILITY_MS;
                    if enemy.hp == 0 {
                        if hit.owner_id > 0 {
                            if let Some(scorer) =
                                players.iter_mut().find(|p| p.id == hit.owner_id)
                            {
                                scorer.score += 1;
                            }
                        }
                        continue; // Dropped: enemy removed.
                    }
                }
            }
            kept.push(enemy);
        }
        *enemies = kept;

        for player in players.iter_mut() {
            if !player.is_alive() || player.invincible_timer_ms > 0 {
                continue;
            }
            let cell = pixel_to_cell(player.x, player.y);
            if enemies.iter().any(|e| e.cell() == cell) {
                hurt(player);
            }
        }
    }

    rescue_trapped_teammates(players);
}

/// If two players overlap and exactly one is NORMAL while the other is
/// TRAPPED, the TRAPPED one returns to NORMAL with rescue invincibility (§4.4).
fn rescue_trapped_teammates(players: &mut [Player]) {
    let len = players.len();
    for i in 0..len {
        for j in 0..len {
            if i == j {
                continue;
            }
            let overlap = player_hitbox_overlaps_cell(&players[i], pixel_to_cell(players[j].x, players[j].y));
            if !overlap {
                continue;
            }
            let (rescuer_normal, other_trapped) = (
                players[i].state == PlayerState::Normal,
                players[j].state == PlayerState::Trapped,
            );
            if rescuer_normal && other_trapped {
                players[j].state = PlayerState::Normal;
                players[j].trapped_timer_ms = 0;
                players[j].invincible_timer_ms = RESCUE_INVINCIBILITY_MS;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_player(id: u8, x: f32, y: f32) -> Player {
        Player::new(id, (x, y), 3.0)
    }

    #[test]
    fn shield_absorbs_first_hit() {
        let mut p = make_player(1, 0.0, 0.0);
        p.has_shield = true;
        hurt(&mut p);
        assert_eq!(p.state, PlayerState::Normal);
        assert!(!p.has_shield);
        assert_eq!(p.invincible_timer_ms, HIT_INVINCIBILITY_MS);
    }

    #[test]
    fn normal_escalates_to_trapped_then_dead() {
        let mut p = make_player(1, 0.0, 0.0);
        hurt(&mut p);
        assert_eq!(p.state, PlayerState::Trapped);
        p.invincible_timer_ms = 0;
        hurt(&mut p);
        assert_eq!(p.state, PlayerState::Dead);
    }

    #[test]
    fn trapped_with_active_invincibility_does_not_die() {
        let mut p = make_player(1, 0.0, 0.0);
        p.state = PlayerState::Trapped;
        p.invincible_timer_ms = 500;
        hurt(&mut p);
        assert_eq!(p.state, PlayerState::Trapped);
    }

    #[test]
    fn rescue_restores_trapped_teammate() {
        let mut rescuer = make_player(1, 48.0, 48.0);
        rescuer.state = PlayerState::Normal;
        let mut trapped = make_player(2, 48.0, 48.0);
        trapped.state = PlayerState::Trapped;
        trapped.trapped_timer_ms = 3000;
        let mut players = vec![rescuer, trapped];

        rescue_trapped_teammates(&mut players);

        assert_eq!(players[1].state, PlayerState::Normal);
        assert_eq!(players[1].invincible_timer_ms, RESCUE_INVINCIBILITY_MS);
    }
}
