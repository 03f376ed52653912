//! Spatial tile index.
//!
//! Each cell is one 32-bit word holding terrain collision, the terrain tile
//! id and the id of the first entity standing on the cell. Entities sharing
//! a cell form a doubly linked list stored in a side arena indexed by entity
//! id, so moving an entity never scans the grid.
//!
//! # Invariants
//! - Cell `(x, y)` lives at index `x + y * width`.
//! - Out-of-range coordinates yield `None` / empty results, never a panic.
//! - An entity occupies at most one cell of a given map.

mod cell;
mod map;
mod tile;

pub use cell::{MAX_ENTITY_ID, MAX_TILE_ID, PackedCell};
pub use map::TileMap;
pub use tile::{Tile, TileDef, TileId, TileRegistry};

use bulwark_common::EntityId;
use glam::IVec2;

/// Errors from tile registration and index mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TileMapError {
    #[error("position {position} is outside the {size} map")]
    OutOfBounds { position: IVec2, size: IVec2 },
    #[error("tile registry is full ({} kinds)", MAX_TILE_ID as usize + 1)]
    RegistryFull,
    #[error("tile '{0}' is already registered")]
    DuplicateTileName(String),
    #[error("entity {0} cannot be indexed; ids are limited to 20 bits")]
    EntityIdOutOfRange(EntityId),
}
