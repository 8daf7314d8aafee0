use std::fmt;

use strand_object::{DataReader, FieldSpec, FromObject, Object, ObjectError, ObjectResult, ToObject, Typed};
use strand_types::{Map, TypeHint, Value};

use crate::cursor::Cursor;
use crate::error::{MutationError, MutationResult};

/// What an operation does at its cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// Push onto an existing list.
    Append,
    /// Overwrite, creating intermediate maps.
    Assign,
    /// Reserved.
    Delete,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Assign => "assign",
            Self::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> ObjectResult<Self> {
        match s {
            "append" => Ok(Self::Append),
            "assign" => Ok(Self::Assign),
            "delete" => Ok(Self::Delete),
            other => Err(ObjectError::Decode(format!("unknown operation {other:?}"))),
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single path-addressed edit.
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub op: OpKind,
    pub cursor: Cursor,
    pub value: Option<Value>,
}

impl Operation {
    pub fn append(cursor: Cursor, value: impl Into<Value>) -> Self {
        Self {
            op: OpKind::Append,
            cursor,
            value: Some(value.into()),
        }
    }

    pub fn assign(cursor: Cursor, value: impl Into<Value>) -> Self {
        Self {
            op: OpKind::Assign,
            cursor,
            value: Some(value.into()),
        }
    }

    pub fn delete(cursor: Cursor) -> Self {
        Self {
            op: OpKind::Delete,
            cursor,
            value: None,
        }
    }

    /// Apply this operation to `object`'s data in place.
    ///
    /// On error the data may be left with intermediate maps created by an
    /// `assign`, never with a partial value.
    pub fn apply(&self, object: &mut Object) -> MutationResult<()> {
        match self.op {
            OpKind::Delete => Err(MutationError::NotImplemented(self.op.to_string())),
            OpKind::Assign => {
                let value = self.required_value()?;
                let parent = self.cursor.parent_map(&mut object.data, true)?;
                parent.insert(self.cursor.key(), value.clone());
                Ok(())
            }
            OpKind::Append => {
                let value = self.required_value()?;
                let parent = self.cursor.parent_map(&mut object.data, false)?;
                let existing = parent.get_mut(self.cursor.key()).ok_or_else(|| {
                    MutationError::ApplyingOperation(format!("nothing to append to at {}", self.cursor))
                })?;
                let hint = existing.hint();
                let list = existing.as_list_mut().ok_or_else(|| {
                    MutationError::ApplyingOperation(format!(
                        "cannot append to {hint} at {}",
                        self.cursor
                    ))
                })?;
                list.push(value.clone());
                Ok(())
            }
        }
    }

    fn required_value(&self) -> MutationResult<&Value> {
        self.value.as_ref().ok_or_else(|| {
            MutationError::ApplyingOperation(format!("{} at {} has no value", self.op, self.cursor))
        })
    }
}

impl Typed for Operation {
    const TYPE: &'static str = "strand.io/mutation.operation";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("op", TypeHint::String),
        FieldSpec::required("cursor", TypeHint::String),
        FieldSpec {
            name: "value",
            hint: None,
            repeated: false,
            required: false,
        },
    ];
}

impl ToObject for Operation {
    fn to_object(&self) -> Object {
        let mut data = Map::new()
            .with("op", self.op.as_str())
            .with("cursor", self.cursor.to_string());
        if let Some(value) = &self.value {
            data.insert("value", value.clone());
        }
        Object::new(Self::TYPE).with_data(data)
    }
}

impl FromObject for Operation {
    fn from_object(object: &Object) -> ObjectResult<Self> {
        let reader = DataReader::new::<Self>(object)?;
        let op = OpKind::parse(&reader.string("op")?)?;
        let cursor = Cursor::parse(&reader.string("cursor")?)
            .map_err(|e| ObjectError::Decode(e.to_string()))?;
        Ok(Self {
            op,
            cursor,
            value: reader.get("value").cloned(),
        })
    }
}
