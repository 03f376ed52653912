//! Pathfinding over the tile index.
//!
//! The tile map plus entity occupancy is projected into a [`CellMap`] of
//! walkable cells, searched with 8-directional A*, and chained across
//! waypoints by [`PathGenerator`].
//!
//! # Invariants
//! - An empty path means "unreachable", never an error.
//! - Diagonal steps never cut past a blocked orthogonal neighbour.
//! - Route queries never mutate the tile map; hypothetical blockers are
//!   masked on a throwaway cell map.

mod astar;
mod cellmap;
mod generator;

pub use astar::{STEP_COST, generate_path};
pub use cellmap::{Cell, CellMap, convert_to_cell_map};
pub use generator::PathGenerator;

use bulwark_ecs::EcsError;

/// Contract violations when assembling a route.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("route stop is unusable: {0}")]
    Stop(#[from] EcsError),
}
