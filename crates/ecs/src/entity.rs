use bulwark_common::{EntityId, IdAllocator};
use serde::{Deserialize, Serialize};

use crate::EcsError;
use crate::component::{Component, ComponentValue, Value};

/// An identity plus its components, kept in insertion order.
///
/// A detached entity is a plain value. Once handed to a
/// [`Manager`](crate::Manager), structural changes go through the manager so
/// collections stay in sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    components: Vec<Component>,
}

impl Entity {
    pub fn new(ids: &mut IdAllocator) -> Self {
        Self::with_id(ids.allocate())
    }

    pub(crate) fn with_id(id: EntityId) -> Self {
        Self {
            id,
            components: Vec::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn add_component<T: ComponentValue>(
        &mut self,
        name: impl Into<String>,
        value: T,
    ) -> Result<&mut Component, EcsError> {
        self.insert(Component::new(name, value.into_value()))
    }

    /// Add a marker component whose value is its own name.
    pub fn add_tag(&mut self, name: impl Into<String>) -> Result<&mut Component, EcsError> {
        self.insert(Component::tag(name))
    }

    pub(crate) fn insert(&mut self, component: Component) -> Result<&mut Component, EcsError> {
        if self.has_component(component.name()) {
            return Err(EcsError::DuplicateComponent {
                entity: self.id,
                name: component.name().to_owned(),
            });
        }
        self.components.push(component);
        let last = self.components.len() - 1;
        Ok(&mut self.components[last])
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name() == name)
    }

    pub fn component_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.name() == name)
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.component(name).is_some()
    }

    /// True if the component exists and is active.
    pub fn has_active(&self, name: &str) -> bool {
        self.component(name).is_some_and(Component::is_active)
    }

    pub fn value<T: ComponentValue>(&self, name: &str) -> Option<&T> {
        self.component(name)?.get()
    }

    pub fn value_mut<T: ComponentValue>(&mut self, name: &str) -> Option<&mut T> {
        self.component_mut(name)?.get_mut()
    }

    /// Like [`value`](Self::value) but a missing or mistyped component is an
    /// error. Systems use this for components they cannot run without.
    pub fn require<T: ComponentValue>(&self, name: &str) -> Result<&T, EcsError> {
        let component = self.component(name).ok_or_else(|| EcsError::MissingComponent {
            entity: self.id,
            name: name.to_owned(),
        })?;
        component.get().ok_or_else(|| EcsError::WrongValueType {
            entity: self.id,
            name: name.to_owned(),
            found: component.value.kind(),
        })
    }

    pub fn require_mut<T: ComponentValue>(&mut self, name: &str) -> Result<&mut T, EcsError> {
        let id = self.id;
        let component = self
            .component_mut(name)
            .ok_or_else(|| EcsError::MissingComponent {
                entity: id,
                name: name.to_owned(),
            })?;
        let found = component.value.kind();
        component.get_mut().ok_or_else(|| EcsError::WrongValueType {
            entity: id,
            name: name.to_owned(),
            found,
        })
    }

    /// Toggle a component. Returns false if it does not exist.
    pub fn set_active(&mut self, name: &str, active: bool) -> bool {
        match self.component_mut(name) {
            Some(c) => {
                c.set_active(active);
                true
            }
            None => false,
        }
    }

    pub fn remove_component(&mut self, name: &str) -> Option<Component> {
        let index = self.components.iter().position(|c| c.name() == name)?;
        Some(self.components.remove(index))
    }

    pub fn remove_all_components(&mut self) -> Vec<Component> {
        std::mem::take(&mut self.components)
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.iter()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Replace a component value in place, keeping its slot and active flag.
    pub fn set_value(&mut self, name: &str, value: Value) -> bool {
        match self.component_mut(name) {
            Some(c) => {
                c.value = value;
                true
            }
            None => false,
        }
    }
}
