//! Shared types for the bulwark engine: entity ids, grid coordinates and
//! frame-driven interpolation.
//!
//! # Invariants
//! - Entity ids are allocated monotonically and never reused within a session.
//! - Id `0` is never handed out; the tile index uses it as "no entity".

pub mod interp;
pub mod types;

pub use interp::{Easing, Interpolator, Step};
pub use types::{EntityId, IdAllocator, chebyshev, pixel_to_tile, tile_to_pixel};

/// Grid coordinates are plain integer vectors.
pub use glam::{IVec2, Vec2};
