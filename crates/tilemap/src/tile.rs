use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::TileMapError;
use crate::cell::MAX_TILE_ID;

/// Terrain tile id, `0..=127`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub u8);

/// Terrain definition as it appears in level data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileDef {
    pub name: String,
    /// Character used for this tile in level layouts and text rendering.
    pub glyph: char,
    /// Tint, `0xAABBGGRR`.
    #[serde(default = "opaque_white")]
    pub colour: u32,
    #[serde(default)]
    pub collision: bool,
}

fn opaque_white() -> u32 {
    0xFFFF_FFFF
}

/// A registered terrain kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub id: TileId,
    pub name: String,
    pub glyph: char,
    pub colour: u32,
    pub has_collision: bool,
}

/// Interned terrain kinds. Ids are handed out sequentially and never reused.
#[derive(Debug, Clone, Default)]
pub struct TileRegistry {
    tiles: Vec<Tile>,
    by_name: HashMap<String, TileId>,
}

impl TileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_and_store(
        &mut self,
        name: impl Into<String>,
        glyph: char,
        colour: u32,
        has_collision: bool,
    ) -> Result<TileId, TileMapError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(TileMapError::DuplicateTileName(name));
        }
        if self.tiles.len() > MAX_TILE_ID as usize {
            return Err(TileMapError::RegistryFull);
        }
        let id = TileId(self.tiles.len() as u8);
        tracing::trace!(%name, id = id.0, has_collision, "tile registered");
        self.by_name.insert(name.clone(), id);
        self.tiles.push(Tile {
            id,
            name,
            glyph,
            colour,
            has_collision,
        });
        Ok(id)
    }

    pub fn register(&mut self, def: &TileDef) -> Result<TileId, TileMapError> {
        self.create_and_store(def.name.clone(), def.glyph, def.colour, def.collision)
    }

    pub fn get(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id.0 as usize)
    }

    pub fn by_name(&self, name: &str) -> Option<&Tile> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    pub fn by_glyph(&self, glyph: char) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.glyph == glyph)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}
