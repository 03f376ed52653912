use std::fmt;

use bulwark_common::EntityId;
use bulwark_ecs::{Value, names};
use bulwark_game::Level;
use glam::IVec2;

/// Read-only queries against a level for debugging and the CLI.
pub struct LevelInspector;

impl LevelInspector {
    pub fn summary(level: &Level) -> LevelSummary {
        let route_len = match level.route() {
            Ok(route) => Some(route.len()),
            Err(err) => {
                tracing::warn!(%err, "route unavailable for summary");
                None
            }
        };
        LevelSummary {
            name: level.name.clone(),
            size: level.tile_map.size(),
            tile_kinds: level.registry.len(),
            entity_count: level.manager.entity_count(),
            towers: level.manager.collection(names::TOWER).len(),
            waypoints: level.waypoints().len(),
            route_len,
        }
    }

    /// Terrain and occupants of one cell. `None` off the map.
    pub fn inspect_cell(level: &Level, position: IVec2) -> Option<CellInfo> {
        let map = &level.tile_map;
        if !map.contains(position) {
            return None;
        }
        let tile = map.get_tile(&level.registry, position);
        Some(CellInfo {
            position,
            tile: tile.map(|t| t.name.clone()),
            collision: map.is_blocked(position),
            entities: map
                .get_entities(position)
                .into_iter()
                .filter_map(|id| Self::inspect_entity(level, id))
                .collect(),
        })
    }

    pub fn inspect_entity(level: &Level, id: EntityId) -> Option<EntityInfo> {
        let entity = level.manager.get(id)?;
        Some(EntityInfo {
            id,
            components: entity
                .components()
                .map(|c| {
                    let value = match &c.value {
                        Value::Tag(_) => None,
                        Value::Flag(b) => Some(b.to_string()),
                        Value::Number(n) => Some(n.to_string()),
                        Value::Tile(p) => Some(format!("({}, {})", p.x, p.y)),
                        Value::Pixel(p) => Some(format!("({:.1}, {:.1})", p.x, p.y)),
                        Value::Text(s) => Some(format!("{s:?}")),
                    };
                    ComponentLine {
                        name: c.name().to_owned(),
                        value,
                        active: c.is_active(),
                    }
                })
                .collect(),
        })
    }

    pub fn list_entities(level: &Level) -> Vec<EntityId> {
        level.manager.entities().keys().copied().collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelSummary {
    pub name: String,
    pub size: IVec2,
    pub tile_kinds: usize,
    pub entity_count: usize,
    pub towers: usize,
    pub waypoints: usize,
    /// `None` when the route could not be computed at all.
    pub route_len: Option<usize>,
}

impl fmt::Display for LevelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Level '{}': {}x{} tiles={} entities={} towers={} waypoints={} route=",
            self.name,
            self.size.x,
            self.size.y,
            self.tile_kinds,
            self.entity_count,
            self.towers,
            self.waypoints,
        )?;
        match self.route_len {
            Some(0) => write!(f, "blocked"),
            Some(n) => write!(f, "{n}"),
            None => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentLine {
    pub name: String,
    pub value: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityInfo {
    pub id: EntityId,
    pub components: Vec<ComponentLine>,
}

impl EntityInfo {
    pub fn has(&self, name: &str) -> bool {
        self.components.iter().any(|c| c.name == name)
    }
}

impl fmt::Display for EntityInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity {}", self.id)?;
        for c in &self.components {
            let mark = if c.active { "" } else { " (inactive)" };
            match &c.value {
                Some(v) => write!(f, "\n  {}={v}{mark}", c.name)?,
                None => write!(f, "\n  {}{mark}", c.name)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellInfo {
    pub position: IVec2,
    pub tile: Option<String>,
    pub collision: bool,
    /// Head of the cell's entity list first.
    pub entities: Vec<EntityInfo>,
}

impl fmt::Display for CellInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cell ({}, {}) tile={} collision={} entities={}",
            self.position.x,
            self.position.y,
            self.tile.as_deref().unwrap_or("-"),
            self.collision,
            self.entities.len()
        )?;
        for e in &self.entities {
            write!(f, "\n{e}")?;
        }
        Ok(())
    }
}
