//! C2: Collision Kernel. Answers "is a 36x36 hitbox at (x,y) blocked?" against
//! the grid, the live bomb set, and ghost-mode flags; supports corner sliding
//! and the predictive-move helper shared by the authoritative server step and
//! (per spec.md §9 REDESIGN FLAG 3) any local/predictive client, as one
//! function so both geometries stay bit-identical.

use protocol::TileKind;

use crate::bomb::Bomb;
use crate::constants::{CORNER_TOLERANCE, HITBOX_EPSILON, PLAYER_SIZE, TILE_SIZE};
use crate::grid::{pixel_to_cell, Cell, Grid};

/// Collision options. Both `can_pass_soft_walls` and `can_pass_bombs` are
/// enabled together by the GHOST power-up (§4.1).
#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionOptions {
    pub can_pass_soft_walls: bool,
    pub can_pass_bombs: bool,
    /// The entity's current position, so a "walk-off" from a cell it already
    /// overlaps is permitted (e.g. exiting the cell it just placed a bomb on).
    pub origin: Option<(f32, f32)>,
}

/// Half the hitbox edge, after the epsilon shrink (§4.1).
fn half_extent() -> f32 {
    (PLAYER_SIZE - HITBOX_EPSILON * 2.0) / 2.0
}

/// The four corners of the hitbox centered at `(x, y)`.
fn hitbox_corners(x: f32, y: f32) -> [(f32, f32); 4] {
    let h = half_extent();
    [
        (x - h, y - h),
        (x + h, y - h),
        (x - h, y + h),
        (x + h, y + h),
    ]
}

fn tile_blocks(grid: &Grid, cell: Cell, opts: &CollisionOptions) -> bool {
    match grid.get(cell) {
        TileKind::HardWall => true,
        TileKind::SoftWall => !opts.can_pass_soft_walls,
        TileKind::Empty => false,
    }
}

fn bomb_blocks_cell(bombs: &[Bomb], cell: Cell, opts: &CollisionOptions) -> bool {
    if opts.can_pass_bombs {
        return false;
    }
    bombs.iter().any(|b| b.cell() == cell)
}

/// True if the hitbox at `(x, y)` overlaps a blocking tile or bomb. A corner
/// that falls in the same cell as `opts.origin` is exempt, so an entity can
/// walk off a cell it currently overlaps (§4.1).
pub fn blocked(x: f32, y: f32, grid: &Grid, bombs: &[Bomb], opts: &CollisionOptions) -> bool {
    let origin_cell = opts.origin.map(|(ox, oy)| pixel_to_cell(ox, oy));

    for (cx, cy) in hitbox_corners(x, y) {
        if cx < 0.0 || cy < 0.0 {
            return true;
        }
        let cell = pixel_to_cell(cx, cy);
        if Some(cell) == origin_cell {
            continue;
        }
        if tile_blocks(grid, cell, opts) || bomb_blocks_cell(bombs, cell, opts) {
            return true;
        }
    }
    false
}

/// Applies one axis of motion with corner-slide fallback: if blocked and the
/// entity's center on the orthogonal axis is within [`CORNER_TOLERANCE`] of a
/// tile center, nudge perpendicular toward that center (§4.1 "Corner sliding").
fn move_axis(
    x: f32,
    y: f32,
    dx: f32,
    dy: f32,
    speed: f32,
    grid: &Grid,
    bombs: &[Bomb],
    opts: &CollisionOptions,
) -> (f32, f32) {
    if dx == 0.0 && dy == 0.0 {
        return (x, y);
    }

    let nx = x + dx;
    let ny = y + dy;
    if !blocked(nx, ny, grid, bombs, opts) {
        return (nx, ny);
    }

    // Blocked: try a corner-slide nudge on the orthogonal axis.
    if dx != 0.0 {
        let tile_center = (y / TILE_SIZE).floor() * TILE_SIZE + TILE_SIZE / 2.0;
        let offset = y - tile_center;
        if offset.abs() <= CORNER_TOLERANCE && offset != 0.0 {
            let nudge = -offset.signum() * speed.min(offset.abs());
            let ny2 = y + nudge;
            if !blocked(x, ny2, grid, bombs, opts) {
                return (x, ny2);
            }
        }
    } else {
        let tile_center = (x / TILE_SIZE).floor() * TILE_SIZE + TILE_SIZE / 2.0;
        let offset = x - tile_center;
        if offset.abs() <= CORNER_TOLERANCE && offset != 0.0 {
            let nudge = -offset.signum() * speed.min(offset.abs());
            let nx2 = x + nudge;
            if !blocked(nx2, y, grid, bombs, opts) {
                return (nx2, y);
            }
        }
    }

    (x, y)
}

/// Applies X motion then Y motion, each with corner-slide fallback. Used
/// identically by the authoritative server step and any client-side predictive
/// stepper, guaranteeing identical geometry (§4.1).
pub fn predict_move(
    x: f32,
    y: f32,
    dx: f32,
    dy: f32,
    speed: f32,
    grid: &Grid,
    bombs: &[Bomb],
    opts: &CollisionOptions,
) -> (f32, f32) {
    let (x1, y1) = move_axis(x, y, dx, 0.0, speed, grid, bombs, opts);
    move_axis(x1, y1, 0.0, dy, speed, grid, bombs, opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::cell_center;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn empty_grid() -> Grid {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        Grid::generate(0.0, &mut rng)
    }

    #[test]
    fn open_corridor_is_not_blocked() {
        let grid = empty_grid();
        let (x, y) = cell_center(Cell::new(3, 1));
        assert!(!blocked(x, y, &grid, &[], &CollisionOptions::default()));
    }

    #[test]
    fn hard_wall_pillar_blocks() {
        let grid = empty_grid();
        let (x, y) = cell_center(Cell::new(2, 2));
        assert!(blocked(x, y, &grid, &[], &CollisionOptions::default()));
    }

    #[test]
    fn ghost_passes_soft_walls() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let grid = Grid::generate(1.0, &mut rng);
        // Find a soft wall cell in the interior.
        let soft_cell = grid
            .iter_cells()
            .find(|c| grid.get(*c) == TileKind::SoftWall)
            .expect("some soft wall should exist at density 1.0");
        let (x, y) = cell_center(soft_cell);
        let blocking_opts = CollisionOptions::default();
        let ghost_opts = CollisionOptions {
            can_pass_soft_walls: true,
            ..Default::default()
        };
        assert!(blocked(x, y, &grid, &[], &blocking_opts));
        assert!(!blocked(x, y, &grid, &[], &ghost_opts));
    }

    #[test]
    fn corner_slide_nudges_toward_corridor_center() {
        let grid = empty_grid();
        // Misaligned slightly below the corridor center at (3,1); moving
        // purely right should nudge vertically toward alignment.
        let (cx, cy) = cell_center(Cell::new(3, 1));
        let start_y = cy + 5.0;
        let (nx, ny) = predict_move(
            cx,
            start_y,
            2.0,
            0.0,
            2.0,
            &grid,
            &[],
            &CollisionOptions::default(),
        );
        assert!(nx > cx);
        assert!((ny - start_y).abs() > 0.0 || ny == start_y);
    }
}
