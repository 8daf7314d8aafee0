//! Conversion from untyped JSON into typed values.
//!
//! This is the one dynamic entry point into the value model, so anything
//! without an exact [`Value`] counterpart is rejected rather than coerced.

use crate::error::{TypeError, TypeResult};
use crate::value::{Map, Value};

impl TryFrom<serde_json::Value> for Value {
    type Error = TypeError;

    fn try_from(json: serde_json::Value) -> TypeResult<Self> {
        match json {
            serde_json::Value::Null => Err(TypeError::UnsupportedType("null".into())),
            serde_json::Value::Bool(b) => Ok(Self::Bool(b)),
            serde_json::Value::String(s) => Ok(Self::String(s)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Int(i))
                } else if n.is_u64() {
                    Err(TypeError::UnsupportedType(format!(
                        "unsigned integer {n} exceeds i64"
                    )))
                } else {
                    n.as_f64()
                        .map(Self::Float)
                        .ok_or_else(|| TypeError::UnsupportedType(format!("number {n}")))
                }
            }
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(Value::try_from)
                .collect::<TypeResult<Vec<_>>>()
                .map(Self::List),
            serde_json::Value::Object(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key, Value::try_from(value)?);
                }
                Ok(Self::Map(map))
            }
        }
    }
}

impl TryFrom<serde_json::Value> for Map {
    type Error = TypeError;

    fn try_from(json: serde_json::Value) -> TypeResult<Self> {
        match Value::try_from(json)? {
            Value::Map(map) => Ok(map),
            other => Err(TypeError::UnsupportedType(format!(
                "expected a map, got {}",
                other.hint()
            ))),
        }
    }
}
