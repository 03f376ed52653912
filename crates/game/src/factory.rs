//! Constructors for the entities a level is made of.
//!
//! Each entity is assembled detached, mapped into the tile index, then
//! attached so collection handlers see it fully formed.

use bulwark_common::{EntityId, tile_to_pixel};
use bulwark_ecs::{EcsError, Entity, Manager, names};
use bulwark_tilemap::TileMap;
use glam::IVec2;

use crate::SpawnError;

pub const MARKER_SORT: f64 = 3.0;
pub const TOWER_SORT: f64 = 4.0;
pub const PLAYER_SORT: f64 = 10.0;

fn place(
    manager: &mut Manager,
    tile_map: &mut TileMap,
    position: IVec2,
    sort: f64,
    build: impl FnOnce(&mut Entity) -> Result<(), EcsError>,
) -> Result<EntityId, SpawnError> {
    let mut entity = manager.create_entity();
    build(&mut entity)?;
    entity.add_component(names::TILE_POS, position)?;
    entity.add_component(
        names::RENDER_POS,
        tile_to_pixel(position, tile_map.tile_size()),
    )?;
    entity.add_component(names::SORT, sort)?;
    entity.add_tag(names::RENDERABLE)?;

    let id = entity.id();
    tile_map.map_entity(id, position)?;
    if let Err(err) = manager.add_entity(Some(entity)) {
        tile_map.unmap_entity(id);
        return Err(err.into());
    }
    tracing::debug!(%id, %position, "entity placed");
    Ok(id)
}

/// Where enemies enter the map.
pub fn spawn_point(
    manager: &mut Manager,
    tile_map: &mut TileMap,
    position: IVec2,
) -> Result<EntityId, SpawnError> {
    place(manager, tile_map, position, MARKER_SORT, |e| {
        e.add_tag(names::BLOCK_BUILDING)?;
        e.add_tag(names::SPAWN_POINT)?;
        e.add_component(names::TARGET_TILE, position)?;
        Ok(())
    })
}

/// A numbered stop the route has to pass through.
pub fn waypoint(
    manager: &mut Manager,
    tile_map: &mut TileMap,
    position: IVec2,
    number: u32,
) -> Result<EntityId, SpawnError> {
    place(manager, tile_map, position, MARKER_SORT, |e| {
        e.add_tag(names::BLOCK_BUILDING)?;
        e.add_tag(names::WAYPOINT)?;
        e.add_component(names::WAYPOINT_NUMBER, f64::from(number))?;
        e.add_component(names::TARGET_TILE, position)?;
        Ok(())
    })
}

pub fn endpoint(
    manager: &mut Manager,
    tile_map: &mut TileMap,
    position: IVec2,
) -> Result<EntityId, SpawnError> {
    place(manager, tile_map, position, MARKER_SORT, |e| {
        e.add_tag(names::BLOCK_BUILDING)?;
        e.add_tag(names::ENDPOINT)?;
        e.add_component(names::TARGET_TILE, position)?;
        Ok(())
    })
}

/// A structure that blocks both movement and further building.
pub fn tower(
    manager: &mut Manager,
    tile_map: &mut TileMap,
    position: IVec2,
) -> Result<EntityId, SpawnError> {
    place(manager, tile_map, position, TOWER_SORT, |e| {
        e.add_tag(names::TOWER)?;
        e.add_tag(names::BLOCK_MOVEMENT)?;
        e.add_tag(names::BLOCK_BUILDING)?;
        Ok(())
    })
}

/// The build cursor, driven by the movement systems.
pub fn player(
    manager: &mut Manager,
    tile_map: &mut TileMap,
    position: IVec2,
) -> Result<EntityId, SpawnError> {
    place(manager, tile_map, position, PLAYER_SORT, |e| {
        e.add_tag(names::PLAYER)?;
        e.add_component(names::TARGET_TILE, position)?;
        for flag in [
            names::MOVING,
            names::MOVING_LEFT,
            names::MOVING_RIGHT,
            names::MOVING_UP,
            names::MOVING_DOWN,
        ] {
            e.add_component(flag, false)?;
        }
        Ok(())
    })
}
