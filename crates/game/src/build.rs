use bulwark_common::EntityId;
use bulwark_ecs::names;
use bulwark_pathing::{PathError, PathGenerator};
use glam::IVec2;

use crate::level::Level;
use crate::{SpawnError, factory};

/// Why a tower cannot go on a cell.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildRejection {
    #[error("{0} is outside the map")]
    OutOfBounds(IVec2),
    #[error("terrain at {0} cannot be built on")]
    BlockedTerrain(IVec2),
    #[error("{position} is occupied by entity {entity}")]
    Occupied { position: IVec2, entity: EntityId },
    #[error("a tower at {0} would cut the route")]
    CutsRoute(IVec2),
    #[error(transparent)]
    Route(#[from] PathError),
    #[error(transparent)]
    Spawn(#[from] SpawnError),
}

/// Check a tower placement. On success returns the route enemies would take
/// with the tower in place.
pub fn can_build(level: &Level, position: IVec2) -> Result<Vec<IVec2>, BuildRejection> {
    let map = &level.tile_map;
    if !map.contains(position) {
        return Err(BuildRejection::OutOfBounds(position));
    }
    if map.is_blocked(position) {
        return Err(BuildRejection::BlockedTerrain(position));
    }
    let blocker = map.get_entities(position).into_iter().find(|id| {
        level
            .manager
            .get(*id)
            .is_some_and(|e| e.has_active(names::BLOCK_BUILDING))
    });
    if let Some(entity) = blocker {
        return Err(BuildRejection::Occupied { position, entity });
    }

    let route = PathGenerator::test_and_generate(
        &level.manager,
        level.spawn,
        &level.waypoints(),
        level.end,
        map,
        position,
    )?;
    if route.is_empty() {
        return Err(BuildRejection::CutsRoute(position));
    }
    Ok(route)
}

/// Validate and commit a tower.
pub fn place_tower(level: &mut Level, position: IVec2) -> Result<EntityId, BuildRejection> {
    if let Err(rejection) = can_build(level, position) {
        tracing::debug!(%position, %rejection, "tower rejected");
        return Err(rejection);
    }
    let id = factory::tower(&mut level.manager, &mut level.tile_map, position)?;
    tracing::info!(%id, %position, "tower placed");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LevelConfig;
    use bulwark_tilemap::TileDef;

    fn level(rows: &[&str], spawn: IVec2, waypoints: &[IVec2], end: IVec2) -> Level {
        let cfg = LevelConfig {
            name: "build".into(),
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
            spawn,
            waypoints: waypoints.to_vec(),
            end,
            towers: Vec::new(),
            player: None,
        };
        Level::build(&cfg).unwrap()
    }

    #[test]
    fn rejections() {
        let level = level(
            &[
                "....", //
                ".#..", //
                "....",
            ],
            IVec2::new(0, 0),
            &[IVec2::new(3, 0)],
            IVec2::new(3, 2),
        );
        assert_eq!(
            can_build(&level, IVec2::new(-1, 0)),
            Err(BuildRejection::OutOfBounds(IVec2::new(-1, 0)))
        );
        assert_eq!(
            can_build(&level, IVec2::new(1, 1)),
            Err(BuildRejection::BlockedTerrain(IVec2::new(1, 1)))
        );
        assert_eq!(
            can_build(&level, IVec2::new(3, 0)),
            Err(BuildRejection::Occupied {
                position: IVec2::new(3, 0),
                entity: level.waypoints()[0],
            })
        );
        assert_eq!(
            can_build(&level, IVec2::ZERO),
            Err(BuildRejection::Occupied {
                position: IVec2::ZERO,
                entity: level.spawn,
            })
        );
    }

    #[test]
    fn approved_route_avoids_the_tower() {
        let level = level(&["....."; 3], IVec2::new(0, 1), &[], IVec2::new(4, 1));
        let route = can_build(&level, IVec2::new(2, 1)).unwrap();
        assert!(!route.contains(&IVec2::new(2, 1)));
        assert_eq!(route.first(), Some(&IVec2::new(0, 1)));
        assert_eq!(route.last(), Some(&IVec2::new(4, 1)));
        // Checking never mutates.
        assert!(level.route().unwrap().contains(&IVec2::new(2, 1)));
    }

    #[test]
    fn towers_accumulate_until_the_route_would_break() {
        let mut level = level(&["..."; 3], IVec2::new(0, 0), &[], IVec2::new(0, 2));
        place_tower(&mut level, IVec2::new(0, 1)).unwrap();
        place_tower(&mut level, IVec2::new(1, 1)).unwrap();
        // (2, 1) is now the only way down.
        assert_eq!(
            place_tower(&mut level, IVec2::new(2, 1)),
            Err(BuildRejection::CutsRoute(IVec2::new(2, 1)))
        );
        assert_eq!(level.manager.get_all(names::TOWER).len(), 2);

        let route = level.route().unwrap();
        assert!(route.contains(&IVec2::new(2, 1)));

        // Towers block building on their own cell.
        assert!(matches!(
            can_build(&level, IVec2::new(1, 1)),
            Err(BuildRejection::Occupied { .. })
        ));
    }
}
