use std::path::{Path, PathBuf};

use bulwark_common::EntityId;
use bulwark_ecs::{CollectionEvent, Entity, Manager, names, sort_by_number};
use bulwark_pathing::{PathError, PathGenerator};
use bulwark_tilemap::{TileDef, TileMap, TileMapError, TileRegistry};
use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::build::{BuildRejection, place_tower};
use crate::{SpawnError, factory};

const DEMO: &str = include_str!("../levels/demo.yaml");

fn default_tile_size() -> u32 {
    8
}

/// A level as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub name: String,
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    pub tiles: Vec<TileDef>,
    /// One string per map row, one glyph per cell.
    pub rows: Vec<String>,
    pub spawn: IVec2,
    /// Visited in listed order.
    #[serde(default)]
    pub waypoints: Vec<IVec2>,
    pub end: IVec2,
    #[serde(default)]
    pub towers: Vec<IVec2>,
    #[serde(default)]
    pub player: Option<IVec2>,
}

#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unsupported level format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("invalid layout: {0}")]
    Layout(String),
    #[error("unknown glyph '{glyph}' at {position}")]
    UnknownGlyph { glyph: char, position: IVec2 },
    #[error("{what} at {position} is off the map or on solid terrain")]
    BadStop { what: &'static str, position: IVec2 },
    #[error("pre-placed tower rejected: {0}")]
    Tower(#[from] BuildRejection),
    #[error("no route from spawn to end through every waypoint")]
    NoRoute,
    #[error(transparent)]
    Tile(#[from] TileMapError),
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    #[error(transparent)]
    Path(#[from] PathError),
}

impl LevelConfig {
    /// Read a level, picking the format from the file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let config = match ext.as_deref() {
            Some("json") => serde_json::from_str(&text)?,
            Some("yaml" | "yml") => serde_yaml::from_str(&text)?,
            _ => return Err(LevelError::UnsupportedFormat(path.to_path_buf())),
        };
        tracing::debug!(path = %path.display(), "level config loaded");
        Ok(config)
    }

    /// The level shipped with the engine.
    pub fn demo() -> Result<Self, LevelError> {
        Ok(serde_yaml::from_str(DEMO)?)
    }

    /// Map size implied by `rows`.
    pub fn size(&self) -> Result<IVec2, LevelError> {
        let height = self.rows.len();
        let width = self.rows.first().map_or(0, |r| r.chars().count());
        if width == 0 || height == 0 {
            return Err(LevelError::Layout("level has no cells".into()));
        }
        if let Some(y) = self.rows.iter().position(|r| r.chars().count() != width) {
            return Err(LevelError::Layout(format!(
                "row {y} is not {width} cells wide"
            )));
        }
        Ok(IVec2::new(width as i32, height as i32))
    }
}

/// A playable level: terrain, entities and the stops of the route.
#[derive(Debug)]
pub struct Level {
    pub name: String,
    pub registry: TileRegistry,
    pub tile_map: TileMap,
    pub manager: Manager,
    pub spawn: EntityId,
    pub end: EntityId,
}

impl Level {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        Self::build(&LevelConfig::load(path)?)
    }

    pub fn demo() -> Result<Self, LevelError> {
        Self::build(&LevelConfig::demo()?)
    }

    /// Materialize a config, rejecting it when no route exists.
    pub fn build(config: &LevelConfig) -> Result<Self, LevelError> {
        let _span = tracing::info_span!("build_level", name = %config.name).entered();
        let size = config.size()?;

        let mut registry = TileRegistry::new();
        for def in &config.tiles {
            registry.register(def)?;
        }

        let mut tile_map = TileMap::new(size, config.tile_size);
        for (y, row) in config.rows.iter().enumerate() {
            for (x, glyph) in row.chars().enumerate() {
                let position = IVec2::new(x as i32, y as i32);
                let tile = registry
                    .by_glyph(glyph)
                    .ok_or(LevelError::UnknownGlyph { glyph, position })?;
                tile_map.add_tile(tile, position)?;
            }
        }

        let check = |what: &'static str, position: IVec2| {
            if tile_map.is_blocked(position) {
                Err(LevelError::BadStop { what, position })
            } else {
                Ok(())
            }
        };
        check("spawn", config.spawn)?;
        for wp in &config.waypoints {
            check("waypoint", *wp)?;
        }
        check("end", config.end)?;
        if let Some(p) = config.player {
            check("player", p)?;
        }

        let mut manager = Manager::new();
        manager.on(names::RENDERABLE, CollectionEvent::Added, |change| {
            sort_by_number(change, names::SORT)
        });
        manager.on(names::WAYPOINT, CollectionEvent::Added, |change| {
            sort_by_number(change, names::WAYPOINT_NUMBER)
        });

        let spawn = factory::spawn_point(&mut manager, &mut tile_map, config.spawn)?;
        for (i, wp) in config.waypoints.iter().enumerate() {
            factory::waypoint(&mut manager, &mut tile_map, *wp, i as u32 + 1)?;
        }
        let end = factory::endpoint(&mut manager, &mut tile_map, config.end)?;

        let mut level = Self {
            name: config.name.clone(),
            registry,
            tile_map,
            manager,
            spawn,
            end,
        };

        if level.route()?.is_empty() {
            return Err(LevelError::NoRoute);
        }
        for tower in &config.towers {
            place_tower(&mut level, *tower)?;
        }
        if let Some(p) = config.player {
            factory::player(&mut level.manager, &mut level.tile_map, p)?;
        }

        tracing::info!(
            size = %size,
            tiles = level.registry.len(),
            entities = level.manager.entity_count(),
            "level ready"
        );
        Ok(level)
    }

    pub fn waypoints(&self) -> Vec<EntityId> {
        ordered_waypoints(&self.manager)
    }

    /// The current spawn -> waypoints -> end route, empty when blocked.
    pub fn route(&self) -> Result<Vec<IVec2>, PathError> {
        PathGenerator::generate(
            &self.manager,
            self.spawn,
            &self.waypoints(),
            self.end,
            &self.tile_map,
        )
    }

    pub fn player(&self) -> Option<EntityId> {
        self.manager.get_first(names::PLAYER)
    }

    /// Take an entity out of the level: unmap it from the tile map, then
    /// detach it from the manager. Returns the detached entity.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let position = self.tile_map.unmap_entity(id);
        let entity = self.manager.detach(id)?;
        tracing::debug!(%id, ?position, "entity removed");
        Some(entity)
    }
}

/// Waypoints sorted by `waypointNumber`, ties kept in attach order.
pub fn ordered_waypoints(manager: &Manager) -> Vec<EntityId> {
    let mut ids = manager.get_all(names::WAYPOINT);
    let key = |id: &EntityId| {
        manager
            .value::<f64>(*id, names::WAYPOINT_NUMBER)
            .copied()
            .unwrap_or(0.0)
    };
    ids.sort_by(|a, b| key(a).total_cmp(&key(b)));
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulwark_common::chebyshev;
    use std::io::Write;

    fn config(rows: &[&str]) -> LevelConfig {
        LevelConfig {
            name: "test".into(),
            tile_size: 8,
            tiles: vec![
                TileDef {
                    name: "floor".into(),
                    glyph: '.',
                    colour: 0,
                    collision: false,
                },
                TileDef {
                    name: "wall".into(),
                    glyph: '#',
                    colour: 0,
                    collision: true,
                },
            ],
            rows: rows.iter().map(|r| r.to_string()).collect(),
            spawn: IVec2::new(0, 0),
            waypoints: vec![IVec2::new(4, 0)],
            end: IVec2::new(4, 4),
            towers: Vec::new(),
            player: None,
        }
    }

    #[test]
    fn five_by_five_scenario() {
        let level = Level::build(&config(&["....."; 5])).unwrap();
        let route = level.route().unwrap();
        assert_eq!(route.len(), 9);
        assert_eq!(route.first(), Some(&IVec2::new(0, 0)));
        assert_eq!(route.last(), Some(&IVec2::new(4, 4)));
        for pair in route.windows(2) {
            assert_eq!(chebyshev(pair[0], pair[1]), 1);
        }
    }

    #[test]
    fn demo_level_builds_with_a_route() {
        let level = Level::demo().unwrap();
        assert_eq!(level.name, "Demo Keep");
        assert_eq!(level.tile_map.size(), IVec2::new(16, 10));
        assert_eq!(level.waypoints().len(), 2);
        assert!(level.player().is_some());
        assert_eq!(level.manager.get_all(names::TOWER).len(), 1);
        assert!(!level.route().unwrap().is_empty());
    }

    #[test]
    fn removing_a_tower_clears_its_cell() {
        let mut level = Level::demo().unwrap();
        let at = IVec2::new(6, 4);
        let tower = level.manager.get_first(names::TOWER).unwrap();
        assert_eq!(level.tile_map.get_entities(at), vec![tower]);
        let mapped = level.tile_map.mapped_count();

        let removed = level.remove_entity(tower).unwrap();
        assert!(removed.has_component(names::TOWER));
        assert!(level.tile_map.get_entities(at).is_empty());
        assert_eq!(level.tile_map.position_of(tower), None);
        assert_eq!(level.tile_map.mapped_count(), mapped - 1);
        assert!(level.manager.get_all(names::TOWER).is_empty());
        assert!(!level.route().unwrap().is_empty());

        // Gone from both indexes, so a second removal finds nothing.
        assert!(level.remove_entity(tower).is_none());
        assert_eq!(level.tile_map.mapped_count(), mapped - 1);
    }

    #[test]
    fn waypoints_ordered_by_number() {
        let mut cfg = config(&["....."; 5]);
        cfg.waypoints = vec![IVec2::new(4, 0), IVec2::new(0, 4), IVec2::new(2, 2)];
        let level = Level::build(&cfg).unwrap();
        let order: Vec<IVec2> = level
            .waypoints()
            .into_iter()
            .map(|id| *level.manager.value::<IVec2>(id, names::TILE_POS).unwrap())
            .collect();
        assert_eq!(order, cfg.waypoints);
    }

    #[test]
    fn ordered_waypoints_sorts_out_of_order_numbers() {
        let mut manager = Manager::new();
        let mut map = TileMap::new(IVec2::new(4, 1), 8);
        let third = factory::waypoint(&mut manager, &mut map, IVec2::new(0, 0), 3).unwrap();
        let first = factory::waypoint(&mut manager, &mut map, IVec2::new(1, 0), 1).unwrap();
        let second = factory::waypoint(&mut manager, &mut map, IVec2::new(2, 0), 2).unwrap();
        assert_eq!(ordered_waypoints(&manager), vec![first, second, third]);
    }

    #[test]
    fn layout_errors() {
        assert!(matches!(
            Level::build(&config(&["....", "..."])),
            Err(LevelError::Layout(_))
        ));
        assert!(matches!(
            Level::build(&config(&[])),
            Err(LevelError::Layout(_))
        ));
        assert!(matches!(
            Level::build(&config(&["..x..", ".....", ".....", ".....", "....."])),
            Err(LevelError::UnknownGlyph { glyph: 'x', .. })
        ));
    }

    #[test]
    fn stops_must_be_walkable() {
        let mut cfg = config(&["....#"; 5]);
        cfg.waypoints = vec![IVec2::new(4, 0)];
        assert!(matches!(
            Level::build(&cfg),
            Err(LevelError::BadStop { what: "waypoint", .. })
        ));

        let mut cfg = config(&["....."; 5]);
        cfg.end = IVec2::new(7, 7);
        assert!(matches!(
            Level::build(&cfg),
            Err(LevelError::BadStop { what: "end", .. })
        ));
    }

    #[test]
    fn sealed_level_is_rejected() {
        let cfg = config(&[".....", "#####", ".....", ".....", "....."]);
        assert!(matches!(Level::build(&cfg), Err(LevelError::NoRoute)));
    }

    #[test]
    fn route_cutting_tower_is_rejected() {
        let mut cfg = config(&[".....", "####.", ".....", ".....", "....."]);
        cfg.towers = vec![IVec2::new(4, 1)];
        assert!(matches!(
            Level::build(&cfg),
            Err(LevelError::Tower(BuildRejection::CutsRoute(_)))
        ));
    }

    #[test]
    fn loads_json_and_yaml_by_extension() {
        let cfg = config(&["....."; 5]);
        let dir = tempfile::tempdir().unwrap();

        let json = dir.path().join("level.json");
        std::fs::write(&json, serde_json::to_string_pretty(&cfg).unwrap()).unwrap();
        assert_eq!(LevelConfig::load(&json).unwrap(), cfg);

        let yaml = dir.path().join("level.YML");
        std::fs::write(&yaml, serde_yaml::to_string(&cfg).unwrap()).unwrap();
        assert_eq!(LevelConfig::load(&yaml).unwrap(), cfg);

        let level = Level::load(&json).unwrap();
        assert_eq!(level.route().unwrap().len(), 9);
    }

    #[test]
    fn load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("level.txt");
        std::fs::write(&txt, "name: x").unwrap();
        assert!(matches!(
            LevelConfig::load(&txt),
            Err(LevelError::UnsupportedFormat(_))
        ));

        let missing = dir.path().join("missing.json");
        assert!(matches!(LevelConfig::load(&missing), Err(LevelError::Io(_))));

        let mut bad = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        bad.write_all(b"{ not json").unwrap();
        assert!(matches!(LevelConfig::load(bad.path()), Err(LevelError::Json(_))));
    }

    #[test]
    fn yaml_defaults_apply() {
        let yaml = r##"
name: tiny
tiles:
  - { name: floor, glyph: "." }
rows: ["..."]
spawn: [0, 0]
end: [2, 0]
"##;
        let cfg: LevelConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.tile_size, 8);
        assert!(cfg.waypoints.is_empty());
        assert!(cfg.towers.is_empty());
        assert_eq!(cfg.player, None);
        let level = Level::build(&cfg).unwrap();
        assert_eq!(level.route().unwrap().len(), 3);
    }
}
