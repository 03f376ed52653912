use bulwark_ecs::{Manager, names};
use bulwark_tilemap::TileMap;
use glam::IVec2;

/// A walkable cell plus its A* bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub position: IVec2,
    /// Flat index of the cell this one was reached from.
    pub parent: Option<usize>,
    pub g: u32,
    pub h: f32,
}

impl Cell {
    pub fn new(position: IVec2) -> Self {
        Self {
            position,
            parent: None,
            g: 0,
            h: 0.0,
        }
    }

    pub fn f(&self) -> f32 {
        self.g as f32 + self.h
    }
}

/// Walkability grid aligned 1:1 with a tile map. `None` is impassable.
#[derive(Debug, Clone, PartialEq)]
pub struct CellMap {
    pub(crate) cells: Vec<Option<Cell>>,
    size: IVec2,
}

impl CellMap {
    /// Grid where `walkable` decides each cell.
    pub fn from_fn(size: IVec2, mut walkable: impl FnMut(IVec2) -> bool) -> Self {
        let size = size.max(IVec2::ZERO);
        let mut cells = Vec::with_capacity((size.x * size.y) as usize);
        for y in 0..size.y {
            for x in 0..size.x {
                let position = IVec2::new(x, y);
                cells.push(walkable(position).then(|| Cell::new(position)));
            }
        }
        Self { cells, size }
    }

    /// Grid with every cell walkable.
    pub fn open(size: IVec2) -> Self {
        Self::from_fn(size, |_| true)
    }

    pub fn size(&self) -> IVec2 {
        self.size
    }

    pub fn index(&self, position: IVec2) -> Option<usize> {
        let in_range = position.x >= 0
            && position.y >= 0
            && position.x < self.size.x
            && position.y < self.size.y;
        in_range.then(|| (position.x + position.y * self.size.x) as usize)
    }

    pub fn get(&self, position: IVec2) -> Option<&Cell> {
        self.cells[self.index(position)?].as_ref()
    }

    pub fn is_walkable(&self, position: IVec2) -> bool {
        self.get(position).is_some()
    }

    /// Index of a walkable cell.
    pub(crate) fn walkable_index(&self, position: IVec2) -> Option<usize> {
        let i = self.index(position)?;
        self.cells[i].is_some().then_some(i)
    }

    /// Mark a cell impassable. Returns false when `position` is off the grid.
    pub fn block(&mut self, position: IVec2) -> bool {
        match self.index(position) {
            Some(i) => {
                self.cells[i] = None;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn walkable_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Clear search bookkeeping so the map can be searched again.
    pub(crate) fn reset(&mut self) {
        for cell in self.cells.iter_mut().flatten() {
            cell.parent = None;
            cell.g = 0;
            cell.h = 0.0;
        }
    }
}

/// Project the tile map into a walkability grid.
///
/// A cell is walkable unless its terrain has collision or an entity standing
/// on it carries an active `blockMovement` component.
pub fn convert_to_cell_map(tile_map: &TileMap, manager: &Manager) -> CellMap {
    CellMap::from_fn(tile_map.size(), |position| {
        !tile_map.is_blocked(position)
            && !tile_map.get_entities(position).into_iter().any(|id| {
                manager
                    .get(id)
                    .is_some_and(|e| e.has_active(names::BLOCK_MOVEMENT))
            })
    })
}
