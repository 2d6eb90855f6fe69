//! Weakly-typed property values.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::dataset::DataSetRef;
use crate::units::Units;

/// Map payload for `METADATA`, `USER_PROPERTIES` and `CACHE_TAG`.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// The kinds of value a property may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    DataSet,
    Units,
    String,
    Number,
    Map,
    Bool,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueKind::DataSet => "dataset",
            ValueKind::Units => "units",
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Map => "map",
            ValueKind::Bool => "bool",
        };
        f.write_str(s)
    }
}

/// A property value. Cloning is cheap: datasets and maps are shared.
#[derive(Debug, Clone)]
pub enum PropertyValue {
    DataSet(DataSetRef),
    Units(Units),
    String(String),
    Number(f64),
    Map(Arc<PropertyMap>),
    Bool(bool),
}

impl PropertyValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            PropertyValue::DataSet(_) => ValueKind::DataSet,
            PropertyValue::Units(_) => ValueKind::Units,
            PropertyValue::String(_) => ValueKind::String,
            PropertyValue::Number(_) => ValueKind::Number,
            PropertyValue::Map(_) => ValueKind::Map,
            PropertyValue::Bool(_) => ValueKind::Bool,
        }
    }

    pub fn as_dataset(&self) -> Option<&DataSetRef> {
        match self {
            PropertyValue::DataSet(ds) => Some(ds),
            _ => None,
        }
    }

    pub fn into_dataset(self) -> Option<DataSetRef> {
        match self {
            PropertyValue::DataSet(ds) => Some(ds),
            _ => None,
        }
    }

    pub fn as_units(&self) -> Option<&Units> {
        match self {
            PropertyValue::Units(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&PropertyMap> {
        match self {
            PropertyValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

/// Datasets compare by identity; everything else by value.
impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropertyValue::DataSet(a), PropertyValue::DataSet(b)) => Arc::ptr_eq(a, b),
            (PropertyValue::Units(a), PropertyValue::Units(b)) => a == b,
            (PropertyValue::String(a), PropertyValue::String(b)) => a == b,
            (PropertyValue::Number(a), PropertyValue::Number(b)) => a == b,
            (PropertyValue::Map(a), PropertyValue::Map(b)) => a == b,
            (PropertyValue::Bool(a), PropertyValue::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl From<DataSetRef> for PropertyValue {
    fn from(ds: DataSetRef) -> Self {
        PropertyValue::DataSet(ds)
    }
}

impl From<Units> for PropertyValue {
    fn from(u: Units) -> Self {
        PropertyValue::Units(u)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<f64> for PropertyValue {
    fn from(x: f64) -> Self {
        PropertyValue::Number(x)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<PropertyMap> for PropertyValue {
    fn from(m: PropertyMap) -> Self {
        PropertyValue::Map(Arc::new(m))
    }
}
