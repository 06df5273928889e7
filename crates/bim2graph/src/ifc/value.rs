//! Attribute values and entity instances of a STEP physical file.

use std::fmt;

/// Instance name of an entity (`#123`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Unset optional attribute (`$`).
    Null,
    /// Attribute redeclared as derived in a subtype (`*`).
    Derived,
    Integer(i64),
    Real(f64),
    /// Decoded string literal.
    String(String),
    /// Enumeration or boolean literal without the dots (`.T.` is `Enum("T")`).
    Enum(String),
    /// Binary literal as written, without quotes.
    Binary(String),
    Ref(EntityId),
    List(Vec<Value>),
    /// Typed value such as `IFCBOOLEAN(.T.)` or `IFCLABEL('x')`.
    Typed { type_name: String, value: Box<Value> },
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null | Value::Derived)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            Value::Ref(id) => Some(*id),
            _ => None,
        }
    }

    /// Numeric value; integers widen to `f64`.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(r) => Some(*r),
            Value::Integer(i) => Some(*i as f64),
            Value::Typed { value, .. } => value.as_real(),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&str> {
        match self {
            Value::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// References held in a list attribute; other items are skipped.
    pub fn refs(&self) -> Vec<EntityId> {
        self.as_list()
            .map(|items| items.iter().filter_map(Value::as_entity).collect())
            .unwrap_or_default()
    }
}

/// One entity instance from the DATA section.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    /// Upper-case STEP keyword, e.g. `IFCWALLSTANDARDCASE`.
    pub class: String,
    pub attributes: Vec<Value>,
}

impl Entity {
    pub fn attr(&self, index: usize) -> Option<&Value> {
        self.attributes.get(index).filter(|v| !v.is_null())
    }

    pub fn str_attr(&self, index: usize) -> Option<&str> {
        self.attr(index).and_then(Value::as_str)
    }

    pub fn ref_attr(&self, index: usize) -> Option<EntityId> {
        self.attr(index).and_then(Value::as_entity)
    }

    pub fn refs_attr(&self, index: usize) -> Vec<EntityId> {
        self.attr(index).map(Value::refs).unwrap_or_default()
    }

    pub fn real_attr(&self, index: usize) -> Option<f64> {
        self.attr(index).and_then(Value::as_real)
    }

    pub fn enum_attr(&self, index: usize) -> Option<&str> {
        self.attr(index).and_then(Value::as_enum)
    }
}
