//! Entity/component store.
//!
//! Entities carry named components. A [`Manager`] indexes attached entities
//! into one collection per component name and notifies subscribers when an
//! entity enters or leaves a collection.
//!
//! # Invariants
//! - An entity is in collection `C` iff it is attached and holds an active
//!   component named `C`.
//! - Component names are unique per entity.
//! - Notifications are delivered synchronously, in subscription order.

mod component;
mod entity;
mod manager;

pub use component::{Component, ComponentValue, Value};
pub use entity::Entity;
pub use manager::{CollectionChange, CollectionEvent, EntityTable, Handler, Manager, sort_by_number};

use bulwark_common::EntityId;

/// Well-known component names shared by gameplay, pathing and rendering.
pub mod names {
    pub const TILE_POS: &str = "tilePos";
    pub const RENDER_POS: &str = "renderPos";
    pub const TARGET_TILE: &str = "targetTile";
    pub const SORT: &str = "sort";
    pub const WAYPOINT_NUMBER: &str = "waypointNumber";

    pub const MOVING: &str = "moving";
    pub const MOVING_LEFT: &str = "movingLeft";
    pub const MOVING_RIGHT: &str = "movingRight";
    pub const MOVING_UP: &str = "movingUp";
    pub const MOVING_DOWN: &str = "movingDown";

    pub const RENDERABLE: &str = "renderable";
    pub const PLAYER: &str = "player";
    pub const BLOCK_MOVEMENT: &str = "blockMovement";
    pub const BLOCK_BUILDING: &str = "blockBuilding";
    pub const WAYPOINT: &str = "waypoint";
    pub const SPAWN_POINT: &str = "spawnPoint";
    pub const ENDPOINT: &str = "endpoint";
    pub const TOWER: &str = "tower";
}

/// Contract violations raised by the component store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    #[error("entity {entity} already has a component named '{name}'")]
    DuplicateComponent { entity: EntityId, name: String },
    #[error("entity {entity} is missing required component '{name}'")]
    MissingComponent { entity: EntityId, name: String },
    #[error("component '{name}' on entity {entity} holds a {found} value")]
    WrongValueType {
        entity: EntityId,
        name: String,
        found: &'static str,
    },
    #[error("entity {0} is not attached to this manager")]
    EntityNotFound(EntityId),
    #[error("entity {0} is already attached to this manager")]
    AlreadyAttached(EntityId),
    #[error("entity id {0} cannot be adopted")]
    InvalidId(EntityId),
}
