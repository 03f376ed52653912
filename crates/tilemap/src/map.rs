use bulwark_common::EntityId;
use glam::IVec2;

use crate::TileMapError;
use crate::cell::{MAX_ENTITY_ID, PackedCell};
use crate::tile::{Tile, TileRegistry};

/// Arena node for one mapped entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Link {
    position: IVec2,
    next: Option<EntityId>,
    previous: Option<EntityId>,
}

/// Fixed-size grid of packed cells plus the entity occupancy lists.
///
/// Terrain is written once per level with [`add_tile`](Self::add_tile).
/// Entities are placed and moved with [`map_entity`](Self::map_entity) in
/// O(1); each cell lists its occupants most-recently-mapped first.
#[derive(Debug, Clone)]
pub struct TileMap {
    cells: Vec<PackedCell>,
    size: IVec2,
    tile_size: u32,
    /// Indexed by raw entity id.
    links: Vec<Option<Link>>,
}

impl TileMap {
    /// Create an empty map. Negative dimensions are clamped to zero.
    pub fn new(size: IVec2, tile_size: u32) -> Self {
        let size = size.max(IVec2::ZERO);
        Self {
            cells: vec![PackedCell::EMPTY; (size.x * size.y) as usize],
            size,
            tile_size,
            links: Vec::new(),
        }
    }

    /// Dimensions in tiles.
    pub fn size(&self) -> IVec2 {
        self.size
    }

    /// Columns.
    pub fn width(&self) -> i32 {
        self.size.x
    }

    /// Rows.
    pub fn height(&self) -> i32 {
        self.size.y
    }

    /// Pixel edge length of one tile.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Whether `position` lies inside the map.
    pub fn contains(&self, position: IVec2) -> bool {
        position.x >= 0 && position.y >= 0 && position.x < self.size.x && position.y < self.size.y
    }

    /// Flat index of an in-range position.
    pub fn index(&self, position: IVec2) -> Option<usize> {
        self.contains(position)
            .then(|| (position.x + position.y * self.size.x) as usize)
    }

    /// Inverse of [`index`](Self::index).
    pub fn position(&self, index: usize) -> Option<IVec2> {
        (index < self.cells.len()).then(|| {
            let i = index as i32;
            IVec2::new(i % self.size.x, i / self.size.x)
        })
    }

    /// Every position, row by row.
    pub fn positions(&self) -> impl Iterator<Item = IVec2> + use<> {
        let size = self.size;
        (0..size.y).flat_map(move |y| (0..size.x).map(move |x| IVec2::new(x, y)))
    }

    /// Packed cell at `position`, `None` outside the map.
    pub fn cell(&self, position: IVec2) -> Option<PackedCell> {
        self.index(position).map(|i| self.cells[i])
    }

    /// Raw cells in row-major order.
    pub fn cells(&self) -> &[PackedCell] {
        &self.cells
    }

    fn out_of_bounds(&self, position: IVec2) -> TileMapError {
        TileMapError::OutOfBounds {
            position,
            size: self.size,
        }
    }

    /// Write terrain into a cell, replacing whatever terrain was there.
    /// Occupancy is left alone.
    pub fn add_tile(&mut self, tile: &Tile, position: IVec2) -> Result<(), TileMapError> {
        let i = self
            .index(position)
            .ok_or_else(|| self.out_of_bounds(position))?;
        self.cells[i] = self.cells[i]
            .with_collision(tile.has_collision)
            .with_tile_id(tile.id);
        Ok(())
    }

    /// Terrain at `position`, or `None` outside the map.
    pub fn get_tile<'r>(&self, registry: &'r TileRegistry, position: IVec2) -> Option<&'r Tile> {
        registry.get(self.cell(position)?.tile_id())
    }

    /// Terrain collision. Outside the map counts as blocked.
    pub fn is_blocked(&self, position: IVec2) -> bool {
        self.cell(position).is_none_or(PackedCell::has_collision)
    }

    /// Entities on a cell, most recently mapped first.
    pub fn get_entities(&self, position: IVec2) -> Vec<EntityId> {
        let mut out = Vec::new();
        let mut cursor = self.cell(position).and_then(PackedCell::head);
        while let Some(id) = cursor {
            out.push(id);
            cursor = self.link(id).and_then(|l| l.next);
        }
        out
    }

    /// Whether any entity is mapped onto `position`.
    pub fn is_occupied(&self, position: IVec2) -> bool {
        self.cell(position).and_then(PackedCell::head).is_some()
    }

    /// Cell currently holding `id`.
    pub fn position_of(&self, id: EntityId) -> Option<IVec2> {
        self.link(id).map(|l| l.position)
    }

    fn link(&self, id: EntityId) -> Option<&Link> {
        self.links.get(id.0 as usize)?.as_ref()
    }

    fn link_mut(&mut self, id: EntityId) -> Option<&mut Link> {
        self.links.get_mut(id.0 as usize)?.as_mut()
    }

    /// Place `id` on `position`, moving it off its previous cell first.
    pub fn map_entity(&mut self, id: EntityId, position: IVec2) -> Result<(), TileMapError> {
        if id.0 == 0 || id.0 > MAX_ENTITY_ID {
            tracing::warn!(%id, "entity id does not fit the cell head field");
            return Err(TileMapError::EntityIdOutOfRange(id));
        }
        let Some(i) = self.index(position) else {
            tracing::warn!(%id, %position, "mapping outside the map rejected");
            return Err(self.out_of_bounds(position));
        };

        if let Some(from) = self.unlink(id) {
            tracing::trace!(%id, %from, to = %position, "entity remapped");
        }

        let head = self.cells[i].head();
        if let Some(head) = head {
            if let Some(link) = self.link_mut(head) {
                link.previous = Some(id);
            }
        }

        let slot = id.0 as usize;
        if self.links.len() <= slot {
            self.links.resize(slot + 1, None);
        }
        self.links[slot] = Some(Link {
            position,
            next: head,
            previous: None,
        });
        self.cells[i] = self.cells[i].with_head(Some(id));
        Ok(())
    }

    /// Remove `id` from the index. Returns the cell it occupied.
    pub fn unmap_entity(&mut self, id: EntityId) -> Option<IVec2> {
        self.unlink(id)
    }

    fn unlink(&mut self, id: EntityId) -> Option<IVec2> {
        let link = self.links.get_mut(id.0 as usize)?.take()?;

        match link.previous {
            Some(previous) => {
                if let Some(p) = self.link_mut(previous) {
                    p.next = link.next;
                }
            }
            None => {
                // Was the head: promote the next entity.
                if let Some(i) = self.index(link.position) {
                    self.cells[i] = self.cells[i].with_head(link.next);
                }
            }
        }
        if let Some(next) = link.next {
            if let Some(n) = self.link_mut(next) {
                n.previous = link.previous;
            }
        }
        Some(link.position)
    }

    /// Number of entities currently indexed.
    pub fn mapped_count(&self) -> usize {
        self.links.iter().filter(|l| l.is_some()).count()
    }
}
