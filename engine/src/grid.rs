//! C1: Grid & Map Generator. A flat array of tiles, cache-friendly and
//! trivially serializable, per spec.md §9 ("Prefer a flat array of W·H small
//! integers... 2D access is a helper").

use protocol::TileKind;

use crate::constants::{GRID_HEIGHT, GRID_WIDTH};

/// A logical grid coordinate. The unit of bomb placement, item location and
/// explosion propagation (GLOSSARY "Cell").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub col: u8,
    pub row: u8,
}

impl Cell {
    pub fn new(col: u8, row: u8) -> Self {
        Cell { col, row }
    }

    pub fn in_bounds(self) -> bool {
        self.col < GRID_WIDTH && self.row < GRID_HEIGHT
    }

    pub fn neighbor(self, dx: i8, dy: i8) -> Option<Cell> {
        let col = self.col as i16 + dx as i16;
        let row = self.row as i16 + dy as i16;
        if col < 0 || row < 0 || col >= GRID_WIDTH as i16 || row >= GRID_HEIGHT as i16 {
            return None;
        }
        Some(Cell::new(col as u8, row as u8))
    }
}

/// The fixed-size tile grid. `HARD_WALL` cells are immutable for the room's
/// lifetime; `SOFT_WALL` cells transition to `EMPTY` exactly once (§3 invariant).
#[derive(Debug, Clone)]
pub struct Grid {
    width: u8,
    height: u8,
    tiles: Vec<TileKind>,
}

impl Grid {
    fn index(&self, cell: Cell) -> usize {
        cell.row as usize * self.width as usize + cell.col as usize
    }

    pub fn get(&self, cell: Cell) -> TileKind {
        if !cell.in_bounds() {
            // Out-of-bounds reads are treated as solid so callers never need a
            // separate bounds branch before a collision check.
            return TileKind::HardWall;
        }
        self.tiles[self.index(cell)]
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    /// Destroys a soft wall, turning it `EMPTY`. No-op (and never re-triggers)
    /// on any other tile kind, preserving the monotone-destruction invariant.
    pub fn destroy_soft_wall(&mut self, cell: Cell) -> bool {
        if !cell.in_bounds() {
            return false;
        }
        let idx = self.index(cell);
        if self.tiles[idx] == TileKind::SoftWall {
            self.tiles[idx] = TileKind::Empty;
            true
        } else {
            false
        }
    }

    pub fn iter_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let width = self.width;
        (0..self.tiles.len()).map(move |i| Cell::new((i as u8) % width, (i as u8) / width))
    }

    /// Generates a fresh grid: deterministic border + checkerboard hard walls,
    /// forced-empty 3x3 spawn corners, and soft walls scattered over the
    /// remaining interior with probability `wall_density` (§3).
    pub fn generate(wall_density: f32, rng: &mut impl rand::RngCore) -> Grid {
        use rand::Rng;

        let width = GRID_WIDTH;
        let height = GRID_HEIGHT;
        let mut tiles = vec![TileKind::Empty; width as usize * height as usize];

        let spawn_corners = spawn_corner_cells();

        for row in 0..height {
            for col in 0..width {
                let cell = Cell::new(col, row);
                let idx = row as usize * width as usize + col as usize;

                let is_border =
                    col == 0 || row == 0 || col == width - 1 || row == height - 1;
                let is_checkerboard_pillar = col % 2 == 0 && row % 2 == 0;

                if is_border || is_checkerboard_pillar {
                    tiles[idx] = TileKind::HardWall;
                    continue;
                }

                if spawn_corners.contains(&cell) {
                    tiles[idx] = TileKind::Empty;
                    continue;
                }

                if rng.r#gen::<f32>() < wall_density {
                    tiles[idx] = TileKind::SoftWall;
                }
            }
        }

        Grid {
            width,
            height,
            tiles,
        }
    }
}

/// The two forced-empty 3x3 spawn corners (§3), top-left and bottom-right.
pub fn spawn_corner_cells() -> Vec<Cell> {
    let mut cells = Vec::with_capacity(18);
    for row in 1..4 {
        for col in 1..4 {
            cells.push(Cell::new(col, row));
        }
    }
    for row in (GRID_HEIGHT - 4)..(GRID_HEIGHT - 1) {
        for col in (GRID_WIDTH - 4)..(GRID_WIDTH - 1) {
            cells.push(Cell::new(col, row));
        }
    }
    cells
}

/// Pixel-space spawn points for each of the two player slots, at the center of
/// each corner's innermost free cell.
pub fn spawn_point(player_index: u8) -> (f32, f32) {
    use crate::constants::TILE_SIZE;
    let cell = if player_index == 0 {
        Cell::new(1, 1)
    } else {
        Cell::new(GRID_WIDTH - 2, GRID_HEIGHT - 2)
    };
    cell_center(cell)
}

/// The pixel-space center of a cell.
pub fn cell_center(cell: Cell) -> (f32, f32) {
    use crate::constants::TILE_SIZE;
    (
        cell.col as f32 * TILE_SIZE + TILE_SIZE / 2.0,
        cell.row as f32 * TILE_SIZE + TILE_SIZE / 2.0,
    )
}

/// Converts a pixel position to the cell it currently overlaps (by center).
pub fn pixel_to_cell(x: f32, y: f32) -> Cell {
    use crate::constants::TILE_SIZE;
    Cell::new((x / TILE_SIZE) as u8, (y / TILE_SIZE) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn borders_and_checkerboard_are_hard_walls() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let grid = Grid::generate(0.5, &mut rng);
        for row in 0..GRID_HEIGHT {
            assert_eq!(grid.get(Cell::new(0, row)), TileKind::HardWall);
            assert_eq!(grid.get(Cell::new(GRID_WIDTH - 1, row)), TileKind::HardWall);
        }
        for row in (2..GRID_HEIGHT).step_by(2) {
            for col in (2..GRID_WIDTH).step_by(2) {
                assert_eq!(grid.get(Cell::new(col, row)), TileKind::HardWall);
            }
        }
    }

    #[test]
    fn spawn_corners_are_forced_empty() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let grid = Grid::generate(1.0, &mut rng);
        for cell in spawn_corner_cells() {
            assert_eq!(grid.get(cell), TileKind::Empty, "{:?} should be empty", cell);
        }
    }

    #[test]
    fn soft_wall_destruction_is_monotone() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut grid = Grid::generate(1.0, &mut rng);
        let target = Cell::new(5, 5);
        if grid.get(target) == TileKind::SoftWall {
            assert!(grid.destroy_soft_wall(target));
            assert_eq!(grid.get(target), TileKind::Empty);
            assert!(!grid.destroy_soft_wall(target));
        }
    }

    #[test]
    fn out_of_bounds_reads_as_hard_wall() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let grid = Grid::generate(0.5, &mut rng);
        assert_eq!(grid.get(Cell::new(255, 255)), TileKind::HardWall);
    }
}
