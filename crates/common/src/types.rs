use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

/// Unique identifier for an entity.
///
/// Ids start at 1 and grow monotonically. The tile index packs ids into a
/// 20-bit field, so `0` doubles as the empty marker there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic entity id source.
///
/// Passed explicitly to whoever creates entities instead of living in a
/// module-level counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdAllocator {
    next: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next id.
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }

    /// Make sure `id` is never handed out later. Used when an entity created
    /// by another allocator is adopted. Saturates at `u32::MAX`.
    pub fn observe(&mut self, id: EntityId) {
        if id.0 >= self.next {
            self.next = id.0.saturating_add(1);
        }
    }

    /// The id the next call to [`allocate`](Self::allocate) returns.
    pub fn peek(&self) -> EntityId {
        EntityId(self.next)
    }
}

/// Top-left pixel of a tile.
pub fn tile_to_pixel(tile: IVec2, tile_size: u32) -> Vec2 {
    (tile * tile_size as i32).as_vec2()
}

/// Tile containing a pixel. Truncates toward zero.
pub fn pixel_to_tile(pixel: Vec2, tile_size: u32) -> IVec2 {
    (pixel / tile_size as f32).trunc().as_ivec2()
}

/// Number of king moves between two cells.
pub fn chebyshev(a: IVec2, b: IVec2) -> i32 {
    let d = (a - b).abs();
    d.x.max(d.y)
}
