//! The authoritative simulation: pure state and stepping logic, no networking
//! or async. The `server` crate owns a `RoomState` per room and calls
//! [`simulation::tick`] once per fixed timestep (§5 "Concurrency model").

pub mod bomb;
pub mod collision;
pub mod combat;
pub mod constants;
pub mod enemy;
pub mod grid;
pub mod items;
pub mod level;
pub mod player;
pub mod rng;
pub mod room_state;
pub mod simulation;

pub use bomb::{Bomb, Explosion};
pub use enemy::Enemy;
pub use grid::{Cell, Grid};
pub use level::{campaign, LevelConfig};
pub use player::Player;
pub use room_state::RoomState;
pub use rng::RoomRng;
pub use simulation::{tick, PlayerInput};
