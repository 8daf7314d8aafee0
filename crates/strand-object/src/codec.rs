//! Explicit conversion between concrete payload types and [`Object`]s.
//!
//! Each payload type implements [`Typed`] (its object type and field table)
//! plus [`ToObject`] / [`FromObject`] by hand. [`DataReader`] validates an
//! incoming object against the field table before any field is read, so a
//! structurally mismatched object is rejected as a whole rather than
//! partially decoded.

use strand_types::{Hash, TypeHint, Value};

use crate::error::{ObjectError, ObjectResult};
use crate::object::{strings_from, Metadata, Object};

/// Wire description of one data field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    /// Key name, without the hint suffix.
    pub name: &'static str,
    /// Expected hint (element hint when repeated). `None` accepts any kind.
    pub hint: Option<TypeHint>,
    /// The field is a list of `hint` values.
    pub repeated: bool,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, hint: TypeHint) -> Self {
        Self {
            name,
            hint: Some(hint),
            repeated: false,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, hint: TypeHint) -> Self {
        Self {
            name,
            hint: Some(hint),
            repeated: false,
            required: false,
        }
    }

    /// A required field of any kind.
    pub const fn any(name: &'static str) -> Self {
        Self {
            name,
            hint: None,
            repeated: false,
            required: true,
        }
    }

    pub const fn repeated(self) -> Self {
        Self {
            repeated: true,
            ..self
        }
    }

    fn check(&self, value: &Value) -> ObjectResult<()> {
        if self.repeated {
            let items = value.as_list().ok_or_else(|| self.mismatch(value))?;
            if let Some(hint) = self.hint {
                if let Some(bad) = items.iter().find(|item| item.hint() != hint) {
                    return Err(ObjectError::Decode(format!(
                        "field {} expects elements of kind {hint}, got {}",
                        self.name,
                        bad.hint()
                    )));
                }
            }
            return Ok(());
        }
        match self.hint {
            Some(hint) if value.hint() != hint => Err(self.mismatch(value)),
            _ => Ok(()),
        }
    }

    fn mismatch(&self, value: &Value) -> ObjectError {
        let expected = match (self.repeated, self.hint) {
            (true, _) => TypeHint::List.to_string(),
            (false, Some(hint)) => hint.to_string(),
            (false, None) => "any".to_string(),
        };
        ObjectError::Decode(format!(
            "field {} expects kind {expected}, got {}",
            self.name,
            value.hint()
        ))
    }
}

/// A payload type with a fixed object type and field table.
pub trait Typed {
    const TYPE: &'static str;
    const FIELDS: &'static [FieldSpec];
}

/// Encode a payload into an object.
pub trait ToObject: Typed {
    fn to_object(&self) -> Object;
}

/// Decode a payload from an object.
pub trait FromObject: Typed + Sized {
    fn from_object(object: &Object) -> ObjectResult<Self>;
}

/// Schema-checked read access to an object's data.
#[derive(Debug)]
pub struct DataReader<'a> {
    object: &'a Object,
    fields: &'static [FieldSpec],
}

impl<'a> DataReader<'a> {
    /// Check `object` against `T`'s type and field table.
    pub fn new<T: Typed>(object: &'a Object) -> ObjectResult<Self> {
        if object.object_type != T::TYPE {
            return Err(ObjectError::TypeMismatch {
                expected: T::TYPE.to_string(),
                actual: object.object_type.clone(),
            });
        }
        for (key, value) in object.data.iter() {
            let spec = T::FIELDS
                .iter()
                .find(|spec| spec.name == key)
                .ok_or_else(|| {
                    ObjectError::Decode(format!("unexpected field {key} in {}", T::TYPE))
                })?;
            spec.check(value)?;
        }
        for spec in T::FIELDS.iter().filter(|spec| spec.required) {
            if !object.data.contains_key(spec.name) {
                return Err(ObjectError::MissingField(spec.name.to_string()));
            }
        }
        Ok(Self {
            object,
            fields: T::FIELDS,
        })
    }

    pub fn metadata(&self) -> &'a Metadata {
        &self.object.metadata
    }

    /// A field's raw value, if present.
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        debug_assert!(
            self.fields.iter().any(|spec| spec.name == name),
            "{name} is not in the field table"
        );
        self.object.data.get(name)
    }

    pub fn value(&self, name: &str) -> ObjectResult<&'a Value> {
        self.get(name)
            .ok_or_else(|| ObjectError::MissingField(name.to_string()))
    }

    pub fn string(&self, name: &str) -> ObjectResult<String> {
        self.value(name)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ObjectError::Decode(format!("field {name} must be a string")))
    }

    /// A repeated string field; absent means empty.
    pub fn strings(&self, name: &str) -> ObjectResult<Vec<String>> {
        match self.get(name) {
            Some(value) => strings_from(value, name),
            None => Ok(Vec::new()),
        }
    }

    /// A repeated string field holding hashes; absent means empty.
    pub fn hashes(&self, name: &str) -> ObjectResult<Vec<Hash>> {
        self.strings(name)?
            .iter()
            .map(|s| Hash::parse(s).map_err(ObjectError::from))
            .collect()
    }

    /// A repeated field of nested objects; absent means empty.
    pub fn objects(&self, name: &str) -> ObjectResult<Vec<Object>> {
        let Some(value) = self.get(name) else {
            return Ok(Vec::new());
        };
        let items = value
            .as_list()
            .ok_or_else(|| ObjectError::Decode(format!("field {name} must be a list")))?;
        items
            .iter()
            .map(|item| {
                item.as_map()
                    .ok_or_else(|| ObjectError::Decode(format!("{name} items must be objects")))
                    .and_then(Object::from_map)
            })
            .collect()
    }
}
