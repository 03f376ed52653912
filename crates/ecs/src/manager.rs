use std::collections::{BTreeMap, HashMap, HashSet};

use bulwark_common::{EntityId, IdAllocator};

use crate::EcsError;
use crate::component::{Component, ComponentValue, Value};
use crate::entity::Entity;

/// All attached entities, in id order.
pub type EntityTable = BTreeMap<EntityId, Entity>;

/// Collection membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionEvent {
    Added,
    Removed,
}

/// What a subscriber sees when a collection changes.
///
/// `collection` is the live collection, already updated. Handlers may reorder
/// it (e.g. render order by a numeric component).
pub struct CollectionChange<'a> {
    pub entity: EntityId,
    pub event: CollectionEvent,
    pub collection: &'a mut Vec<EntityId>,
    pub entities: &'a EntityTable,
}

pub type Handler = Box<dyn FnMut(CollectionChange<'_>)>;

/// Owns attached entities and indexes them by component name.
pub struct Manager {
    ids: IdAllocator,
    entities: EntityTable,
    collections: HashMap<String, Vec<EntityId>>,
    subscribers: HashMap<String, HashMap<CollectionEvent, Vec<Handler>>>,
}

impl Default for Manager {
    fn default() -> Self {
        Self::with_allocator(IdAllocator::new())
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("entities", &self.entities.len())
            .field("collections", &self.collections.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl Manager {
    /// Empty manager with ids starting at 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty manager drawing ids from `ids`.
    pub fn with_allocator(ids: IdAllocator) -> Self {
        Self {
            ids,
            entities: BTreeMap::new(),
            collections: HashMap::new(),
            subscribers: HashMap::new(),
        }
    }

    /// Build a detached entity from this manager's id source.
    pub fn create_entity(&mut self) -> Entity {
        Entity::new(&mut self.ids)
    }

    /// Attach a new empty entity.
    pub fn spawn(&mut self) -> EntityId {
        let id = self.ids.allocate();
        self.entities.insert(id, Entity::with_id(id));
        tracing::trace!(%id, "entity spawned");
        id
    }

    /// Attach `existing`, or a fresh entity when `None`.
    ///
    /// Every active component of an adopted entity is registered again, and
    /// `Added` fires for each in component order. Entities built outside
    /// [`Entity::add_component`] (e.g. deserialized) are validated first:
    /// the id must leave room for a successor and names must be unique.
    pub fn add_entity(&mut self, existing: Option<Entity>) -> Result<EntityId, EcsError> {
        let Some(entity) = existing else {
            return Ok(self.spawn());
        };
        let id = entity.id();
        if id.0 == 0 || id.0 == u32::MAX {
            return Err(EcsError::InvalidId(id));
        }
        if self.entities.contains_key(&id) {
            return Err(EcsError::AlreadyAttached(id));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = entity.components().find(|c| !seen.insert(c.name())) {
            return Err(EcsError::DuplicateComponent {
                entity: id,
                name: dup.name().to_owned(),
            });
        }
        self.ids.observe(id);
        let names: Vec<String> = entity
            .components()
            .filter(|c| c.is_active())
            .map(|c| c.name().to_owned())
            .collect();
        self.entities.insert(id, entity);
        for name in &names {
            self.register(id, name);
        }
        tracing::debug!(%id, components = names.len(), "entity attached");
        Ok(id)
    }

    /// Remove an entity from every collection and hand it back with its
    /// components intact, ready to be attached elsewhere.
    pub fn detach(&mut self, id: EntityId) -> Option<Entity> {
        let names: Vec<String> = self
            .entities
            .get(&id)?
            .components()
            .filter(|c| c.is_active())
            .map(|c| c.name().to_owned())
            .collect();
        for name in &names {
            self.unregister(id, name);
        }
        tracing::debug!(%id, "entity detached");
        self.entities.remove(&id)
    }

    /// Detach and drop all components.
    ///
    /// Tile-map links are not touched; whoever mapped the entity unmaps it
    /// (see `Level::remove_entity` in the gameplay crate).
    pub fn destroy(&mut self, id: EntityId) -> bool {
        match self.detach(id) {
            Some(mut entity) => {
                entity.remove_all_components();
                true
            }
            None => false,
        }
    }

    /// Add a named value and enter the matching collection.
    pub fn add_component<T: ComponentValue>(
        &mut self,
        id: EntityId,
        name: impl Into<String>,
        value: T,
    ) -> Result<(), EcsError> {
        self.attach_component(id, Component::new(name, value.into_value()))
    }

    /// Add a marker component.
    pub fn add_tag(&mut self, id: EntityId, name: impl Into<String>) -> Result<(), EcsError> {
        self.attach_component(id, Component::tag(name))
    }

    fn attach_component(&mut self, id: EntityId, component: Component) -> Result<(), EcsError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(EcsError::EntityNotFound(id))?;
        let name = entity.insert(component)?.name().to_owned();
        self.register(id, &name);
        Ok(())
    }

    /// Remove a component, leaving its collection if it was active.
    pub fn remove_component(
        &mut self,
        id: EntityId,
        name: &str,
    ) -> Result<Option<Component>, EcsError> {
        let entity = self
            .entities
            .get(&id)
            .ok_or(EcsError::EntityNotFound(id))?;
        if entity.has_active(name) {
            self.unregister(id, name);
        }
        Ok(self
            .entities
            .get_mut(&id)
            .and_then(|e| e.remove_component(name)))
    }

    /// Strip every component and leave every collection.
    pub fn remove_all_components(&mut self, id: EntityId) -> Result<Vec<Component>, EcsError> {
        let entity = self
            .entities
            .get(&id)
            .ok_or(EcsError::EntityNotFound(id))?;
        let names: Vec<String> = entity
            .components()
            .filter(|c| c.is_active())
            .map(|c| c.name().to_owned())
            .collect();
        for name in &names {
            self.unregister(id, name);
        }
        Ok(self
            .entities
            .get_mut(&id)
            .map(Entity::remove_all_components)
            .unwrap_or_default())
    }

    /// Toggle a component, moving the entity in or out of its collection.
    pub fn set_active(&mut self, id: EntityId, name: &str, active: bool) -> Result<(), EcsError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(EcsError::EntityNotFound(id))?;
        let was_active = entity
            .component(name)
            .ok_or_else(|| EcsError::MissingComponent {
                entity: id,
                name: name.to_owned(),
            })?
            .is_active();
        if was_active == active {
            return Ok(());
        }
        entity.set_active(name, active);
        if active {
            self.register(id, name);
        } else {
            self.unregister(id, name);
        }
        Ok(())
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Whether `id` is attached here.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// True for active and inactive components alike.
    pub fn has_component(&self, id: EntityId, name: &str) -> bool {
        self.entities.get(&id).is_some_and(|e| e.has_component(name))
    }

    pub fn component_mut(&mut self, id: EntityId, name: &str) -> Option<&mut Component> {
        self.entities.get_mut(&id)?.component_mut(name)
    }

    /// Typed value of a component, `None` on a missing entity, name or type.
    pub fn value<T: ComponentValue>(&self, id: EntityId, name: &str) -> Option<&T> {
        self.entities.get(&id)?.value(name)
    }

    pub fn value_mut<T: ComponentValue>(&mut self, id: EntityId, name: &str) -> Option<&mut T> {
        self.entities.get_mut(&id)?.value_mut(name)
    }

    /// Like [`value`](Self::value) but reports why the value is absent.
    pub fn require<T: ComponentValue>(&self, id: EntityId, name: &str) -> Result<&T, EcsError> {
        self.entities
            .get(&id)
            .ok_or(EcsError::EntityNotFound(id))?
            .require(name)
    }

    pub fn require_mut<T: ComponentValue>(
        &mut self,
        id: EntityId,
        name: &str,
    ) -> Result<&mut T, EcsError> {
        self.entities
            .get_mut(&id)
            .ok_or(EcsError::EntityNotFound(id))?
            .require_mut(name)
    }

    /// Replace a component's value. Returns `false` when there is nothing to replace.
    pub fn set_value(&mut self, id: EntityId, name: &str, value: Value) -> bool {
        self.entities
            .get_mut(&id)
            .is_some_and(|e| e.set_value(name, value))
    }

    /// Snapshot of a collection; safe to hold while mutating the manager.
    pub fn get_all(&self, name: &str) -> Vec<EntityId> {
        self.collection(name).to_vec()
    }

    /// Oldest member of a collection, after any handler reordering.
    pub fn get_first(&self, name: &str) -> Option<EntityId> {
        self.collection(name).first().copied()
    }

    /// Borrow a collection without copying.
    pub fn collection(&self, name: &str) -> &[EntityId] {
        self.collections.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every attached entity, keyed by id.
    pub fn entities(&self) -> &EntityTable {
        &self.entities
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Subscribe to membership changes of a collection.
    pub fn on<F>(&mut self, collection: impl Into<String>, event: CollectionEvent, handler: F)
    where
        F: FnMut(CollectionChange<'_>) + 'static,
    {
        self.subscribers
            .entry(collection.into())
            .or_default()
            .entry(event)
            .or_default()
            .push(Box::new(handler));
    }

    /// Drop every handler. Collections are kept.
    pub fn clear_subscribers(&mut self) {
        self.subscribers.clear();
    }

    fn register(&mut self, id: EntityId, name: &str) {
        let collection = self.collections.entry(name.to_owned()).or_default();
        collection.push(id);
        notify(
            &mut self.subscribers,
            &self.entities,
            collection,
            name,
            id,
            CollectionEvent::Added,
        );
    }

    fn unregister(&mut self, id: EntityId, name: &str) {
        let Some(collection) = self.collections.get_mut(name) else {
            return;
        };
        let Some(index) = collection.iter().position(|e| *e == id) else {
            return;
        };
        collection.remove(index);
        notify(
            &mut self.subscribers,
            &self.entities,
            collection,
            name,
            id,
            CollectionEvent::Removed,
        );
    }
}

fn notify(
    subscribers: &mut HashMap<String, HashMap<CollectionEvent, Vec<Handler>>>,
    entities: &EntityTable,
    collection: &mut Vec<EntityId>,
    name: &str,
    entity: EntityId,
    event: CollectionEvent,
) {
    let Some(handlers) = subscribers.get_mut(name).and_then(|m| m.get_mut(&event)) else {
        return;
    };
    for handler in handlers.iter_mut() {
        handler(CollectionChange {
            entity,
            event,
            collection: &mut *collection,
            entities,
        });
    }
}

/// Stable ascending sort of the changed collection by a numeric component.
/// Entities without the component sort as `0`.
pub fn sort_by_number(change: CollectionChange<'_>, component: &str) {
    let entities = change.entities;
    let key = |id: &EntityId| {
        entities
            .get(id)
            .and_then(|e| e.value::<f64>(component))
            .copied()
            .unwrap_or(0.0)
    };
    change.collection.sort_by(|a, b| key(a).total_cmp(&key(b)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names;
    use glam::IVec2;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn collections_follow_components() {
        let mut m = Manager::new();
        let a = m.spawn();
        let b = m.spawn();
        m.add_tag(a, names::RENDERABLE).unwrap();
        m.add_tag(b, names::RENDERABLE).unwrap();
        m.add_tag(b, names::PLAYER).unwrap();

        assert_eq!(m.get_all(names::RENDERABLE), vec![a, b]);
        assert_eq!(m.get_first(names::PLAYER), Some(b));
        assert_eq!(m.get_first("nothing"), None);
        assert!(m.get_all("nothing").is_empty());
    }

    #[test]
    fn added_events_fire_synchronously_with_live_collection() {
        let mut m = Manager::new();
        let seen: Rc<RefCell<Vec<(EntityId, usize)>>> = Rc::default();
        let sink = Rc::clone(&seen);
        m.on(names::RENDERABLE, CollectionEvent::Added, move |change| {
            assert!(change.collection.contains(&change.entity));
            sink.borrow_mut().push((change.entity, change.collection.len()));
        });

        let mut spawned = Vec::new();
        for _ in 0..5 {
            let id = m.spawn();
            m.add_tag(id, names::RENDERABLE).unwrap();
            spawned.push(id);
            // Delivered before add_tag returns.
            assert_eq!(seen.borrow().len(), spawned.len());
        }

        let seen = seen.borrow();
        let expected: Vec<(EntityId, usize)> =
            spawned.iter().enumerate().map(|(i, id)| (*id, i + 1)).collect();
        assert_eq!(*seen, expected);
    }

    #[test]
    fn handlers_can_resort_the_collection() {
        let mut m = Manager::new();
        m.on(names::RENDERABLE, CollectionEvent::Added, |change| {
            sort_by_number(change, names::SORT)
        });

        let mut make = |sort: f64| {
            let id = m.spawn();
            m.add_component(id, names::SORT, sort).unwrap();
            m.add_tag(id, names::RENDERABLE).unwrap();
            id
        };
        let top = make(10.0);
        let floor = make(1.0);
        let middle = make(3.0);

        assert_eq!(m.get_all(names::RENDERABLE), vec![floor, middle, top]);
    }

    #[test]
    fn duplicate_component_through_manager_is_an_error() {
        let mut m = Manager::new();
        let id = m.spawn();
        m.add_tag(id, names::TOWER).unwrap();
        assert!(matches!(
            m.add_tag(id, names::TOWER),
            Err(EcsError::DuplicateComponent { .. })
        ));
        assert_eq!(m.collection(names::TOWER).len(), 1);
    }

    #[test]
    fn unknown_entity_is_reported() {
        let mut m = Manager::new();
        let ghost = EntityId(99);
        assert_eq!(m.add_tag(ghost, "x"), Err(EcsError::EntityNotFound(ghost)));
    }

    #[test]
    fn detach_keeps_components_and_reattach_replays() {
        let mut first = Manager::new();
        let id = first.spawn();
        first.add_tag(id, names::WAYPOINT).unwrap();
        first.add_component(id, names::TILE_POS, IVec2::new(4, 0)).unwrap();

        let entity = first.detach(id).unwrap();
        assert!(first.get_all(names::WAYPOINT).is_empty());
        assert!(first.get(id).is_none());
        assert_eq!(entity.value::<IVec2>(names::TILE_POS), Some(&IVec2::new(4, 0)));

        let mut second = Manager::new();
        let added: Rc<RefCell<Vec<String>>> = Rc::default();
        for name in [names::WAYPOINT, names::TILE_POS] {
            let sink = Rc::clone(&added);
            second.on(name, CollectionEvent::Added, move |_| {
                sink.borrow_mut().push(name.to_owned())
            });
        }
        assert_eq!(second.add_entity(Some(entity)).unwrap(), id);
        assert_eq!(*added.borrow(), vec![names::WAYPOINT, names::TILE_POS]);
        assert_eq!(second.get_first(names::WAYPOINT), Some(id));

        // The adopted id is never handed out again.
        assert!(second.spawn() > id);
    }

    #[test]
    fn attaching_twice_is_rejected() {
        let mut m = Manager::new();
        let entity = m.create_entity();
        let copy = entity.clone();
        m.add_entity(Some(entity)).unwrap();
        assert!(matches!(
            m.add_entity(Some(copy)),
            Err(EcsError::AlreadyAttached(_))
        ));
    }

    #[test]
    fn remove_component_leaves_collection_and_notifies() {
        let mut m = Manager::new();
        let removed: Rc<RefCell<usize>> = Rc::default();
        let sink = Rc::clone(&removed);
        m.on(names::BLOCK_MOVEMENT, CollectionEvent::Removed, move |change| {
            assert!(!change.collection.contains(&change.entity));
            *sink.borrow_mut() += 1;
        });

        let id = m.spawn();
        m.add_tag(id, names::BLOCK_MOVEMENT).unwrap();
        let component = m.remove_component(id, names::BLOCK_MOVEMENT).unwrap();
        assert!(component.is_some_and(|c| c.is_tag()));
        assert!(m.get_all(names::BLOCK_MOVEMENT).is_empty());
        assert_eq!(*removed.borrow(), 1);

        assert_eq!(m.remove_component(id, names::BLOCK_MOVEMENT), Ok(None));
    }

    #[test]
    fn inactive_components_leave_their_collection() {
        let mut m = Manager::new();
        let id = m.spawn();
        m.add_tag(id, names::RENDERABLE).unwrap();

        m.set_active(id, names::RENDERABLE, false).unwrap();
        assert!(m.get_all(names::RENDERABLE).is_empty());
        assert!(m.has_component(id, names::RENDERABLE));

        m.set_active(id, names::RENDERABLE, true).unwrap();
        assert_eq!(m.get_all(names::RENDERABLE), vec![id]);

        assert!(matches!(
            m.set_active(id, "missing", true),
            Err(EcsError::MissingComponent { .. })
        ));
    }

    #[test]
    fn destroy_clears_everything() {
        let mut m = Manager::new();
        let id = m.spawn();
        m.add_tag(id, names::TOWER).unwrap();
        m.add_tag(id, names::BLOCK_MOVEMENT).unwrap();
        assert!(m.destroy(id));
        assert!(!m.destroy(id));
        assert_eq!(m.entity_count(), 0);
        assert!(m.collection(names::TOWER).is_empty());
        assert!(m.collection(names::BLOCK_MOVEMENT).is_empty());
    }

    #[test]
    fn values_can_be_mutated_in_place() {
        let mut m = Manager::new();
        let id = m.spawn();
        m.add_component(id, names::TILE_POS, IVec2::ZERO).unwrap();
        m.value_mut::<IVec2>(id, names::TILE_POS).unwrap().x = 3;
        assert_eq!(m.value::<IVec2>(id, names::TILE_POS), Some(&IVec2::new(3, 0)));

        assert!(m.set_value(id, names::TILE_POS, Value::Tile(IVec2::ONE)));
        assert_eq!(m.require::<IVec2>(id, names::TILE_POS), Ok(&IVec2::ONE));
    }

    #[test]
    fn handlers_run_in_subscription_order() {
        let mut m = Manager::new();
        let calls: Rc<RefCell<Vec<&str>>> = Rc::default();
        for label in ["first", "second", "third"] {
            let sink = Rc::clone(&calls);
            m.on(names::RENDERABLE, CollectionEvent::Added, move |_| {
                sink.borrow_mut().push(label)
            });
        }
        let other = Rc::clone(&calls);
        m.on(names::PLAYER, CollectionEvent::Added, move |_| {
            other.borrow_mut().push("player")
        });

        let a = m.spawn();
        m.add_tag(a, names::RENDERABLE).unwrap();
        let b = m.spawn();
        m.add_tag(b, names::RENDERABLE).unwrap();
        assert_eq!(
            *calls.borrow(),
            vec!["first", "second", "third", "first", "second", "third"]
        );
    }

    #[test]
    fn adopting_an_id_without_successor_is_rejected() {
        let mut m = Manager::new();
        let top: Entity = serde_json::from_str(r#"{"id":4294967295,"components":[]}"#).unwrap();
        assert_eq!(
            m.add_entity(Some(top)),
            Err(EcsError::InvalidId(EntityId(u32::MAX)))
        );
        assert_eq!(
            m.add_entity(Some(Entity::with_id(EntityId(0)))),
            Err(EcsError::InvalidId(EntityId(0)))
        );
        assert_eq!(m.entity_count(), 0);
        // The allocator was left alone.
        assert_eq!(m.spawn(), EntityId(1));
    }

    #[test]
    fn adopting_duplicate_names_is_rejected() {
        let mut source = Manager::new();
        let mut entity = source.create_entity();
        entity.add_tag(names::TOWER).unwrap();
        entity.add_tag(names::RENDERABLE).unwrap();

        let mut json = serde_json::to_value(&entity).unwrap();
        let components = json["components"].as_array_mut().unwrap();
        let tower = components[0].clone();
        components.push(tower);
        let twice: Entity = serde_json::from_value(json).unwrap();
        assert_eq!(twice.components().count(), 3);

        let mut m = Manager::new();
        assert_eq!(
            m.add_entity(Some(twice)),
            Err(EcsError::DuplicateComponent {
                entity: entity.id(),
                name: names::TOWER.to_owned(),
            })
        );
        assert!(m.get_all(names::TOWER).is_empty());
        assert!(m.get_all(names::RENDERABLE).is_empty());
        assert!(!m.contains(entity.id()));
    }
}
