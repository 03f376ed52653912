use bulwark_common::EntityId;

use crate::tile::TileId;

// Field layout, low bit first:
//   bit  0      collision
//   bits 1..=7  terrain tile id
//   bits 8..=27 head entity id (0 = none)
//   bits 28..=30 reserved, bit 31 unused
const COLLISION_SHIFT: u32 = 0;
const COLLISION_BITS: u32 = 1;
const TILE_SHIFT: u32 = 1;
const TILE_BITS: u32 = 7;
const HEAD_SHIFT: u32 = 8;
const HEAD_BITS: u32 = 20;

pub const MAX_TILE_ID: u8 = (1 << TILE_BITS) - 1;
pub const MAX_ENTITY_ID: u32 = (1 << HEAD_BITS) - 1;

const fn mask(bits: u32) -> u32 {
    (1 << bits) - 1
}

/// One grid cell packed into a `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct PackedCell(u32);

impl PackedCell {
    pub const EMPTY: Self = Self(0);

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    fn field(self, shift: u32, bits: u32) -> u32 {
        (self.0 >> shift) & mask(bits)
    }

    fn with_field(self, shift: u32, bits: u32, value: u32) -> Self {
        let m = mask(bits) << shift;
        Self((self.0 & !m) | ((value << shift) & m))
    }

    pub fn has_collision(self) -> bool {
        self.field(COLLISION_SHIFT, COLLISION_BITS) == 1
    }

    pub fn with_collision(self, collision: bool) -> Self {
        self.with_field(COLLISION_SHIFT, COLLISION_BITS, collision as u32)
    }

    pub fn tile_id(self) -> TileId {
        TileId(self.field(TILE_SHIFT, TILE_BITS) as u8)
    }

    pub fn with_tile_id(self, id: TileId) -> Self {
        self.with_field(TILE_SHIFT, TILE_BITS, u32::from(id.0))
    }

    /// First entity in this cell's occupancy list.
    pub fn head(self) -> Option<EntityId> {
        match self.field(HEAD_SHIFT, HEAD_BITS) {
            0 => None,
            id => Some(EntityId(id)),
        }
    }

    /// Callers guarantee `head <= MAX_ENTITY_ID`.
    pub fn with_head(self, head: Option<EntityId>) -> Self {
        debug_assert!(head.is_none_or(|id| id.0 <= MAX_ENTITY_ID));
        self.with_field(HEAD_SHIFT, HEAD_BITS, head.map_or(0, |id| id.0))
    }
}
