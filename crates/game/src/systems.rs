//! Per-frame systems for the build cursor.
//!
//! A frame runs [`handle_player_input`], then [`handle_collision`] and
//! [`Movement::move_entity`] while the entity is moving. See
//! [`Movement::update`].

use std::collections::HashMap;

use bulwark_common::{Easing, EntityId, Interpolator, tile_to_pixel};
use bulwark_ecs::{EcsError, Manager, names};
use bulwark_tilemap::TileMap;
use glam::{IVec2, Vec2};

use crate::SpawnError;

/// Milliseconds to slide one tile.
pub const MOVE_DURATION_MS: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Intent {
    left: bool,
    right: bool,
    up: bool,
    down: bool,
}

impl Intent {
    fn read(manager: &Manager, id: EntityId) -> Result<Self, EcsError> {
        Ok(Self {
            left: *manager.require::<bool>(id, names::MOVING_LEFT)?,
            right: *manager.require::<bool>(id, names::MOVING_RIGHT)?,
            up: *manager.require::<bool>(id, names::MOVING_UP)?,
            down: *manager.require::<bool>(id, names::MOVING_DOWN)?,
        })
    }
}

/// Set the directional flags, as an input binding would.
pub fn set_intent(
    manager: &mut Manager,
    id: EntityId,
    direction: IVec2,
) -> Result<(), EcsError> {
    *manager.require_mut::<bool>(id, names::MOVING_LEFT)? = direction.x < 0;
    *manager.require_mut::<bool>(id, names::MOVING_RIGHT)? = direction.x > 0;
    *manager.require_mut::<bool>(id, names::MOVING_UP)? = direction.y < 0;
    *manager.require_mut::<bool>(id, names::MOVING_DOWN)? = direction.y > 0;
    Ok(())
}

/// Turn held directions into a target tile. Ignored mid-move.
pub fn handle_player_input(manager: &mut Manager, id: EntityId) -> Result<(), EcsError> {
    if *manager.require::<bool>(id, names::MOVING)? {
        return Ok(());
    }
    let intent = Intent::read(manager, id)?;
    let tile = *manager.require::<IVec2>(id, names::TILE_POS)?;

    let target = manager.require_mut::<IVec2>(id, names::TARGET_TILE)?;
    if intent.right {
        target.x += 1;
    }
    if intent.left {
        target.x -= 1;
    }
    if intent.up {
        target.y -= 1;
    }
    if intent.down {
        target.y += 1;
    }
    let target = *target;

    if target != tile {
        *manager.require_mut::<bool>(id, names::MOVING)? = true;
    }
    Ok(())
}

/// Cancel each axis of a move that would step onto blocked terrain.
pub fn handle_collision(
    manager: &mut Manager,
    id: EntityId,
    tile_map: &TileMap,
) -> Result<(), EcsError> {
    let intent = Intent::read(manager, id)?;
    let tile = *manager.require::<IVec2>(id, names::TILE_POS)?;
    let mut target = *manager.require::<IVec2>(id, names::TARGET_TILE)?;

    if (intent.left || intent.right) && tile_map.is_blocked(IVec2::new(target.x, tile.y)) {
        *manager.require_mut::<bool>(id, names::MOVING_LEFT)? = false;
        *manager.require_mut::<bool>(id, names::MOVING_RIGHT)? = false;
        target.x = tile.x;
    }
    if (intent.up || intent.down) && tile_map.is_blocked(IVec2::new(tile.x, target.y)) {
        *manager.require_mut::<bool>(id, names::MOVING_UP)? = false;
        *manager.require_mut::<bool>(id, names::MOVING_DOWN)? = false;
        target.y = tile.y;
    }

    *manager.require_mut::<IVec2>(id, names::TARGET_TILE)? = target;
    if target == tile {
        *manager.require_mut::<bool>(id, names::MOVING)? = false;
    }
    Ok(())
}

/// In-flight tile-to-tile slides, one per moving entity.
#[derive(Debug, Clone)]
pub struct Movement {
    tweens: HashMap<EntityId, Interpolator>,
    duration: f64,
    easing: Easing,
}

impl Default for Movement {
    fn default() -> Self {
        Self::new(MOVE_DURATION_MS, Easing::Linear)
    }
}

impl Movement {
    pub fn new(duration: f64, easing: Easing) -> Self {
        Self {
            tweens: HashMap::new(),
            duration,
            easing,
        }
    }

    pub fn is_sliding(&self, id: EntityId) -> bool {
        self.tweens.contains_key(&id)
    }

    /// Advance the slide from `tilePos` toward `targetTile`.
    ///
    /// `renderPos` follows the eased progress, rounded to whole pixels. When
    /// the slide completes the entity lands on the target tile, is re-mapped
    /// in `tile_map`, and `true` is returned.
    pub fn move_entity(
        &mut self,
        manager: &mut Manager,
        tile_map: &mut TileMap,
        id: EntityId,
        now: f64,
    ) -> Result<bool, SpawnError> {
        let tile = *manager.require::<IVec2>(id, names::TILE_POS)?;
        let target = *manager.require::<IVec2>(id, names::TARGET_TILE)?;
        let (duration, easing) = (self.duration, self.easing);
        let step = self
            .tweens
            .entry(id)
            .or_insert_with(|| Interpolator::new(now, duration, easing))
            .tick(now);

        let origin = tile_to_pixel(tile, tile_map.tile_size());
        let dest = tile_to_pixel(target, tile_map.tile_size());
        let offset = ((dest - origin) * step.value).round();
        *manager.require_mut::<Vec2>(id, names::RENDER_POS)? = origin + offset;

        if !step.done {
            return Ok(false);
        }
        self.tweens.remove(&id);
        tile_map.map_entity(id, target)?;
        *manager.require_mut::<bool>(id, names::MOVING)? = false;
        *manager.require_mut::<IVec2>(id, names::TILE_POS)? = target;
        *manager.require_mut::<Vec2>(id, names::RENDER_POS)? = dest;
        tracing::trace!(%id, from = %tile, to = %target, "move finished");
        Ok(true)
    }

    /// Run one frame of input, collision and movement for `id`.
    pub fn update(
        &mut self,
        manager: &mut Manager,
        tile_map: &mut TileMap,
        id: EntityId,
        now: f64,
    ) -> Result<(), SpawnError> {
        handle_player_input(manager, id)?;
        if !*manager.require::<bool>(id, names::MOVING)? {
            return Ok(());
        }
        if !self.is_sliding(id) {
            handle_collision(manager, id, tile_map)?;
            if !*manager.require::<bool>(id, names::MOVING)? {
                return Ok(());
            }
        }
        self.move_entity(manager, tile_map, id, now)?;
        Ok(())
    }
}
