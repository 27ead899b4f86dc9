use std::fmt;
use serde::{Deserialize, Serialize};
use super::{PureError, Result, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
    Timestamp,
}

impl DataType {
    pub fn is_compatible(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Integer, Value::Integer(_)) => true,
            (Self::Float, Value::Float(_)) => true,
            (Self::Float, Value::Integer(_)) => true,
            (Self::Text, Value::Text(_)) => true,
            (Self::Boolean, Value::Boolean(_)) => true,
            (Self::Timestamp, Value::Timestamp(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Text => write!(f, "varchar"),
            Self::Boolean => write!(f, "boolean"),
            Self::Timestamp => write!(f, "datetime"),
        }
    }
}

/// A typed scalar column of a stored entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    /// Presence validation: the value must be non-null for a record to be valid.
    pub required: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        if value.is_null() {
            if self.required {
                return Err(PureError::ConstraintViolation(format!(
                    "Column '{}' can't be blank",
                    self.name
                )));
            }
            return Ok(());
        }

        if !self.data_type.is_compatible(value) {
            return Err(PureError::TypeMismatch(format!(
                "Column '{}' expects type {}, got {}",
                self.name,
                self.data_type,
                value.type_name()
            )));
        }

        Ok(())
    }
}

/// Either a single item or an ordered collection of them.
///
/// Conversions mirror the shape of their input: one in, one out; a collection
/// in, a collection of the same length and order out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            Self::One(item) => std::slice::from_ref(item).iter(),
            Self::Many(items) => items.iter(),
        }
    }

    pub fn as_one(&self) -> Option<&T> {
        match self {
            Self::One(item) => Some(item),
            Self::Many(_) => None,
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }

    /// Apply a fallible conversion to every item, keeping the shape.
    pub fn try_map<U, F>(self, mut f: F) -> Result<OneOrMany<U>>
    where
        F: FnMut(T) -> Result<U>,
    {
        match self {
            Self::One(item) => Ok(OneOrMany::One(f(item)?)),
            Self::Many(items) => items
                .into_iter()
                .map(f)
                .collect::<Result<Vec<_>>>()
                .map(OneOrMany::Many),
        }
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(items: Vec<T>) -> Self {
        Self::Many(items)
    }
}

/// The loaded value of a relation: a to-one target (possibly null) or an
/// ordered to-many list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Related<T> {
    One(Option<T>),
    Many(Vec<T>),
}

impl<T> Related<T> {
    pub fn targets(&self) -> Vec<&T> {
        match self {
            Self::One(target) => target.iter().collect(),
            Self::Many(targets) => targets.iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::One(target) => target.is_none(),
            Self::Many(targets) => targets.is_empty(),
        }
    }

    pub fn try_map<U, F>(self, mut f: F) -> Result<Related<U>>
    where
        F: FnMut(T) -> Result<U>,
    {
        match self {
            Self::One(target) => Ok(Related::One(target.map(&mut f).transpose()?)),
            Self::Many(targets) => targets
                .into_iter()
                .map(f)
                .collect::<Result<Vec<_>>>()
                .map(Related::Many),
        }
    }
}
