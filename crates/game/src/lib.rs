//! Gameplay layer: levels as data, the entity factory, tower placement and
//! the per-frame cursor systems.
//!
//! # Invariants
//! - Every factory entity with a `tilePos` is mapped into the level's tile
//!   map at that position.
//! - A tower is only placed when the spawn -> waypoints -> end route
//!   survives it.
//! - Waypoints are visited in ascending `waypointNumber` order.

pub mod build;
pub mod factory;
pub mod level;
pub mod systems;

pub use build::{BuildRejection, can_build, place_tower};
pub use level::{Level, LevelConfig, LevelError, ordered_waypoints};
pub use systems::{Movement, handle_collision, handle_player_input, set_intent};

use bulwark_ecs::EcsError;
use bulwark_tilemap::TileMapError;

/// Failure to create or re-index a gameplay entity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpawnError {
    #[error(transparent)]
    Ecs(#[from] EcsError),
    #[error(transparent)]
    TileMap(#[from] TileMapError),
}
