//! §3 Items: a mapping from cell to [`ItemKind`]. An item exists only where a
//! soft wall previously stood, becomes collectible the tick *after* the wall
//! is destroyed (spec.md §9 open question 5), and is consumed when a player's
//! hitbox center enters the cell.

use std::collections::HashMap;

use protocol::ItemKind;
use rand::Rng;

use crate::grid::Cell;

/// Items revealed under destroyed soft walls, plus a one-tick reveal queue so
/// a destroyed wall's item becomes collectible on the tick after destruction,
/// never the same tick (the load-bearing "soft wall absorbs the ray" rule of
/// §4.2/§4.3 means the wall's cell never gets an explosion cell on the
/// destroying tick either, so same-tick pickup would be unreachable anyway —
/// the one-tick delay just makes that explicit and testable).
#[derive(Debug, Clone, Default)]
pub struct ItemMap {
    live: HashMap<(u8, u8), ItemKind>,
    pending_reveal: Vec<((u8, u8), ItemKind)>,
}

impl ItemMap {
    pub fn new() -> Self {
        ItemMap::default()
    }

    /// Rolls whether a destroyed soft wall at `cell` hides an item, queuing it
    /// for reveal on the following tick.
    pub fn queue_reveal_on_destruction(
        &mut self,
        cell: Cell,
        drop_chance: f32,
        rng: &mut impl rand::RngCore,
    ) {
        if rng.r#gen::<f32>() >= drop_chance {
            return;
        }
        let kind = roll_item_kind(rng);
        self.pending_reveal.push(((cell.col, cell.row), kind));
    }

    /// Promotes any items queued last tick into the live, collectible set.
    /// Call once per tick, after the tick's destructions have been queued.
    pub fn advance_reveals(&mut self) {
        for (key, kind) in self.pending_reveal.drain(..) {
            self.live.insert(key, kind);
        }
    }

    pub fn at(&self, cell: Cell) -> Option<ItemKind> {
        self.live.get(&(cell.col, cell.row)).copied()
    }

    /// Consumes the item at `cell`, if any, returning it.
    pub fn take(&mut self, cell: Cell) -> Option<ItemKind> {
        self.live.remove(&(cell.col, cell.row))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Cell, ItemKind)> + '_ {
        self.live
            .iter()
            .map(|(&(col, row), &kind)| (Cell::new(col, row), kind))
    }

    pub fn clear(&mut self) {
        self.live.clear();
        self.pending_reveal.clear();
    }
}

fn roll_item_kind(rng: &mut impl rand::RngCore) -> ItemKind {
    const KINDS: [ItemKind; 6] = [
        ItemKind::RangeUp,
        ItemKind::BombUp,
        ItemKind::SpeedUp,
        ItemKind::Kick,
        ItemKind::Ghost,
        ItemKind::Shield,
    ];
    KINDS[rng.gen_range(0..KINDS.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn item_becomes_collectible_the_tick_after_destruction() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut items = ItemMap::new();
        let cell = Cell::new(3, 3);

        items.queue_reveal_on_destruction(cell, 1.0, &mut rng);
        assert_eq!(items.at(cell), None, "not collectible on the destruction tick");

        items.advance_reveals();
        assert!(items.at(cell).is_some(), "collectible the tick after");
    }

    #[test]
    fn take_removes_item() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut items = ItemMap::new();
        let cell = Cell::new(1, 1);
        items.queue_reveal_on_destruction(cell, 1.0, &mut rng);
        items.advance_reveals();
        assert!(items.take(cell).is_some());
        assert_eq!(items.at(cell), None);
    }
}
