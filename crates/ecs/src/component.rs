use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

/// Payload of a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Marker whose value equals the component name.
    Tag(String),
    Flag(bool),
    Number(f64),
    /// Grid coordinate.
    Tile(IVec2),
    /// Pixel coordinate.
    Pixel(Vec2),
    Text(String),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tag(_) => "tag",
            Self::Flag(_) => "flag",
            Self::Number(_) => "number",
            Self::Tile(_) => "tile",
            Self::Pixel(_) => "pixel",
            Self::Text(_) => "text",
        }
    }
}

/// Rust types that can live inside a [`Value`].
pub trait ComponentValue: Sized + 'static {
    fn into_value(self) -> Value;
    fn from_ref(value: &Value) -> Option<&Self>;
    fn from_mut(value: &mut Value) -> Option<&mut Self>;
}

macro_rules! component_value {
    ($ty:ty, $variant:ident) => {
        impl ComponentValue for $ty {
            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_ref(value: &Value) -> Option<&Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn from_mut(value: &mut Value) -> Option<&mut Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

component_value!(bool, Flag);
component_value!(f64, Number);
component_value!(IVec2, Tile);
component_value!(Vec2, Pixel);

// Strings are stored as text; reads also accept tags.
impl ComponentValue for String {
    fn into_value(self) -> Value {
        Value::Text(self)
    }

    fn from_ref(value: &Value) -> Option<&Self> {
        match value {
            Value::Text(s) | Value::Tag(s) => Some(s),
            _ => None,
        }
    }

    fn from_mut(value: &mut Value) -> Option<&mut Self> {
        match value {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A named, togglable value attached to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    name: String,
    pub value: Value,
    active: bool,
}

impl Component {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            active: true,
        }
    }

    pub fn tag(name: impl Into<String>) -> Self {
        let name = name.into();
        let value = Value::Tag(name.clone());
        Self::new(name, value)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn is_tag(&self) -> bool {
        matches!(&self.value, Value::Tag(v) if *v == self.name)
    }

    pub fn get<T: ComponentValue>(&self) -> Option<&T> {
        T::from_ref(&self.value)
    }

    pub fn get_mut<T: ComponentValue>(&mut self) -> Option<&mut T> {
        T::from_mut(&mut self.value)
    }
}
