//! Per-room deterministic randomness (§5 "Determinism", §9 "Randomness").
//!
//! Every draw the simulation makes — map generation, enemy direction choice,
//! item drops — goes through one seeded stream owned by the room. No
//! simulation code may reach for a global random source; that would make two
//! rooms' outcomes depend on scheduling order, breaking the "pure function of
//! (prior state, dt, inputs)" guarantee of §5.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// A per-room RNG stream. Construct once at room creation from a seed drawn
/// from the room's creation moment (the one legitimate use of ambient
/// randomness), then thread `&mut` through every simulation call that needs it.
pub struct RoomRng {
    inner: ChaCha8Rng,
}

impl RoomRng {
    pub fn from_seed(seed: u64) -> Self {
        RoomRng {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn inner(&mut self) -> &mut ChaCha8Rng {
        &mut self.inner
    }
}
