//! The closed set of typed values objects are built from.
//!
//! A [`Value`] always knows its own [`TypeHint`]. The hint is appended to a
//! map key to form its wire name (`"name:s"`), which is what gets hashed and
//! serialized, so two values that render the same but differ in kind never
//! collide.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// Single-character type hint carried by every value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeHint {
    Bool,
    String,
    Int,
    Float,
    Bytes,
    Map,
    List,
}

impl TypeHint {
    /// The wire character for this hint.
    pub const fn as_char(self) -> char {
        match self {
            Self::Bool => 'b',
            Self::String => 's',
            Self::Int => 'i',
            Self::Float => 'f',
            Self::Bytes => 'd',
            Self::Map => 'm',
            Self::List => 'a',
        }
    }

    /// Parse a wire hint.
    pub fn parse(hint: &str) -> TypeResult<Self> {
        match hint {
            "b" => Ok(Self::Bool),
            "s" => Ok(Self::String),
            "i" => Ok(Self::Int),
            "f" => Ok(Self::Float),
            "d" => Ok(Self::Bytes),
            "m" => Ok(Self::Map),
            "a" => Ok(Self::List),
            other => Err(TypeError::UnknownHint(other.to_string())),
        }
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A typed value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    String(String),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    Map(Map),
    List(Vec<Value>),
}

impl Value {
    /// The type hint of this value.
    pub fn hint(&self) -> TypeHint {
        match self {
            Self::Bool(_) => TypeHint::Bool,
            Self::String(_) => TypeHint::String,
            Self::Int(_) => TypeHint::Int,
            Self::Float(_) => TypeHint::Float,
            Self::Bytes(_) => TypeHint::Bytes,
            Self::Map(_) => TypeHint::Map,
            Self::List(_) => TypeHint::List,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Map> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<Map> for Value {
    fn from(v: Map) -> Self {
        Self::Map(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

/// Insertion-ordered, key-unique association of names to values.
///
/// Keys are plain names; the type hint is derived from the value when the
/// wire name is needed. Replacing an existing key keeps its position.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Map(IndexMap<String, Value>);

impl Map {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Remove a key, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Entries keyed by wire name (`"name:hint"`), in insertion order.
    pub fn wire_entries(&self) -> impl Iterator<Item = (String, &Value)> {
        self.0.iter().map(|(k, v)| (wire_name(k, v), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Map {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a Map {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Private keys start with `_` and are excluded from hashing.
pub fn is_private_key(key: &str) -> bool {
    key.starts_with('_')
}

/// The wire name of a key holding `value`.
pub fn wire_name(key: &str, value: &Value) -> String {
    format!("{key}:{}", value.hint())
}

/// Split a wire name into its key and type hint.
pub fn split_wire_name(wire: &str) -> TypeResult<(&str, TypeHint)> {
    let (key, hint) = wire
        .rsplit_once(':')
        .ok_or_else(|| TypeError::InvalidWireName(wire.to_string()))?;
    if key.is_empty() {
        return Err(TypeError::InvalidWireName(wire.to_string()));
    }
    Ok((key, TypeHint::parse(hint)?))
}
