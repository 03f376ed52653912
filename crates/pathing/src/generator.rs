use bulwark_common::EntityId;
use bulwark_ecs::{Manager, names};
use bulwark_tilemap::TileMap;
use glam::IVec2;

use crate::PathError;
use crate::astar::generate_path;
use crate::cellmap::{CellMap, convert_to_cell_map};

/// Chains A* searches across spawn, waypoints and endpoint.
///
/// Every query builds a fresh [`CellMap`] from the current tile map, so
/// results always reflect the latest occupancy.
pub struct PathGenerator;

impl PathGenerator {
    /// Route spawn -> waypoints (in order) -> end.
    ///
    /// Each stop is read from its `tilePos` component. The result starts at
    /// the spawn and ends at the endpoint, with the shared stop between two
    /// segments listed once. Any unreachable segment makes the whole route
    /// empty.
    pub fn generate(
        manager: &Manager,
        spawn: EntityId,
        waypoints: &[EntityId],
        end: EntityId,
        tile_map: &TileMap,
    ) -> Result<Vec<IVec2>, PathError> {
        let stops = Self::stops(manager, spawn, waypoints, end)?;
        let mut cells = convert_to_cell_map(tile_map, manager);
        Ok(Self::route(&mut cells, &stops))
    }

    /// Like [`generate`](Self::generate) with `test_position` treated as
    /// blocked. Answers "does the route survive a blocker here?" without
    /// touching the tile map.
    pub fn test_and_generate(
        manager: &Manager,
        spawn: EntityId,
        waypoints: &[EntityId],
        end: EntityId,
        tile_map: &TileMap,
        test_position: IVec2,
    ) -> Result<Vec<IVec2>, PathError> {
        let stops = Self::stops(manager, spawn, waypoints, end)?;
        let mut cells = convert_to_cell_map(tile_map, manager);
        cells.block(test_position);
        Ok(Self::route(&mut cells, &stops))
    }

    fn stops(
        manager: &Manager,
        spawn: EntityId,
        waypoints: &[EntityId],
        end: EntityId,
    ) -> Result<Vec<IVec2>, PathError> {
        std::iter::once(spawn)
            .chain(waypoints.iter().copied())
            .chain(std::iter::once(end))
            .map(|id| Ok(*manager.require::<IVec2>(id, names::TILE_POS)?))
            .collect()
    }

    /// Concatenate A* segments between consecutive stops.
    pub fn route(cells: &mut CellMap, stops: &[IVec2]) -> Vec<IVec2> {
        let _span = tracing::info_span!("route", stops = stops.len()).entered();
        let mut path: Vec<IVec2> = Vec::new();
        let Some(first) = stops.first() else {
            return path;
        };
        if stops.len() == 1 {
            return if cells.is_walkable(*first) {
                vec![*first]
            } else {
                path
            };
        }

        for (segment, pair) in stops.windows(2).enumerate() {
            let leg = generate_path(cells, pair[0], pair[1]);
            if leg.is_empty() {
                tracing::debug!(segment, from = %pair[0], to = %pair[1], "route segment unreachable");
                return Vec::new();
            }
            let skip = usize::from(!path.is_empty());
            path.extend(leg.into_iter().skip(skip));
        }
        tracing::trace!(len = path.len(), "route generated");
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulwark_tilemap::TileRegistry;

    struct Level {
        manager: Manager,
        map: TileMap,
    }

    impl Level {
        /// `#` wall, `.` floor.
        fn parse(rows: &[&str]) -> Self {
            let mut reg = TileRegistry::new();
            reg.create_and_store("floor", '.', 0, false).unwrap();
            reg.create_and_store("wall", '#', 0, true).unwrap();
            let size = IVec2::new(rows[0].len() as i32, rows.len() as i32);
            let mut map = TileMap::new(size, 8);
            for (y, row) in rows.iter().enumerate() {
                for (x, glyph) in row.chars().enumerate() {
                    let tile = reg.by_glyph(glyph).unwrap();
                    map.add_tile(tile, IVec2::new(x as i32, y as i32)).unwrap();
                }
            }
            Self {
                manager: Manager::new(),
                map,
            }
        }

        fn stop(&mut self, tag: &str, at: IVec2) -> EntityId {
            let id = self.manager.spawn();
            self.manager.add_tag(id, tag).unwrap();
            self.manager.add_tag(id, names::BLOCK_BUILDING).unwrap();
            self.manager.add_component(id, names::TILE_POS, at).unwrap();
            self.map.map_entity(id, at).unwrap();
            id
        }

        fn tower(&mut self, at: IVec2) -> EntityId {
            let id = self.manager.spawn();
            self.manager.add_tag(id, names::BLOCK_MOVEMENT).unwrap();
            self.map.map_entity(id, at).unwrap();
            id
        }
    }

    #[test]
    fn scenario_spawn_waypoint_end() {
        let mut level = Level::parse(&["....."; 5]);
        let spawn = level.stop(names::SPAWN_POINT, IVec2::new(0, 0));
        let wp = level.stop(names::WAYPOINT, IVec2::new(4, 0));
        let end = level.stop(names::ENDPOINT, IVec2::new(4, 4));

        let path = PathGenerator::generate(&level.manager, spawn, &[wp], end, &level.map).unwrap();
        assert_eq!(path.len(), 9);
        assert_eq!(path[0], IVec2::new(0, 0));
        assert_eq!(path[4], IVec2::new(4, 0));
        assert_eq!(path[8], IVec2::new(4, 4));
        // Waypoint appears once.
        assert_eq!(path.iter().filter(|p| **p == IVec2::new(4, 0)).count(), 1);
    }

    #[test]
    fn no_waypoints_routes_directly() {
        let mut level = Level::parse(&["...."; 2]);
        let spawn = level.stop(names::SPAWN_POINT, IVec2::new(0, 0));
        let end = level.stop(names::ENDPOINT, IVec2::new(3, 1));
        let path = PathGenerator::generate(&level.manager, spawn, &[], end, &level.map).unwrap();
        assert_eq!(path.first(), Some(&IVec2::new(0, 0)));
        assert_eq!(path.last(), Some(&IVec2::new(3, 1)));
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn broken_middle_segment_fails_whole_route() {
        // Waypoint 2 and the endpoint share the sealed column on the right.
        let mut level = Level::parse(&[
            "...#.", //
            "...#.", //
            "...#.",
        ]);
        let spawn = level.stop(names::SPAWN_POINT, IVec2::new(0, 0));
        let wp1 = level.stop(names::WAYPOINT, IVec2::new(2, 0));
        let wp2 = level.stop(names::WAYPOINT, IVec2::new(4, 1));
        let end = level.stop(names::ENDPOINT, IVec2::new(4, 2));

        // spawn -> wp1 fine, wp2 -> end fine, wp1 -> wp2 impossible.
        let path =
            PathGenerator::generate(&level.manager, spawn, &[wp1, wp2], end, &level.map).unwrap();
        assert!(path.is_empty());

        let ok = PathGenerator::generate(&level.manager, wp2, &[], end, &level.map).unwrap();
        assert!(!ok.is_empty());
    }

    #[test]
    fn test_position_masks_without_mutating() {
        let mut level = Level::parse(&[
            "...", //
            "#.#", //
            "...",
        ]);
        let spawn = level.stop(names::SPAWN_POINT, IVec2::new(0, 0));
        let end = level.stop(names::ENDPOINT, IVec2::new(0, 2));

        let choke = IVec2::new(1, 1);
        let blocked =
            PathGenerator::test_and_generate(&level.manager, spawn, &[], end, &level.map, choke)
                .unwrap();
        assert!(blocked.is_empty());

        let open = PathGenerator::generate(&level.manager, spawn, &[], end, &level.map).unwrap();
        assert!(open.contains(&choke));

        // Masking an irrelevant cell changes nothing.
        let elsewhere = PathGenerator::test_and_generate(
            &level.manager,
            spawn,
            &[],
            end,
            &level.map,
            IVec2::new(2, 0),
        )
        .unwrap();
        assert_eq!(elsewhere.len(), open.len());
    }

    #[test]
    fn towers_reroute_and_can_seal() {
        let mut level = Level::parse(&["...."; 3]);
        let spawn = level.stop(names::SPAWN_POINT, IVec2::new(0, 1));
        let end = level.stop(names::ENDPOINT, IVec2::new(3, 1));

        level.tower(IVec2::new(1, 1));
        let path = PathGenerator::generate(&level.manager, spawn, &[], end, &level.map).unwrap();
        assert!(!path.contains(&IVec2::new(1, 1)));
        assert!(!path.is_empty());

        level.tower(IVec2::new(1, 0));
        level.tower(IVec2::new(1, 2));
        let sealed = PathGenerator::generate(&level.manager, spawn, &[], end, &level.map).unwrap();
        assert!(sealed.is_empty());
    }

    #[test]
    fn stop_without_tile_pos_is_an_error() {
        let mut level = Level::parse(&["..."]);
        let spawn = level.stop(names::SPAWN_POINT, IVec2::ZERO);
        let bare = level.manager.spawn();
        let err = PathGenerator::generate(&level.manager, spawn, &[], bare, &level.map).unwrap_err();
        assert!(matches!(err, PathError::Stop(bulwark_ecs::EcsError::MissingComponent { .. })));
    }
}
