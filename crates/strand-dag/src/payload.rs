//! Wire payloads of the sync protocol.
//!
//! Each payload travels as an ordinary object. `request_id` correlates a
//! reply with the request that caused it.

use strand_object::{
    string_list, DataReader, FieldSpec, FromObject, Object, ObjectResult, ToObject, Typed,
};
use strand_types::{Hash, Map, TypeHint};

/// Ask a peer for the hash inventory of a graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectGraphRequest {
    pub request_id: String,
    /// The first entry names the graph's root.
    pub selector: Vec<String>,
}

impl ObjectGraphRequest {
    pub fn new(request_id: impl Into<String>, root: &Hash) -> Self {
        Self {
            request_id: request_id.into(),
            selector: vec![root.to_string()],
        }
    }
}

impl Typed for ObjectGraphRequest {
    const TYPE: &'static str = "strand.io/dag.graph-request";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("request_id", TypeHint::String),
        FieldSpec::required("selector", TypeHint::String).repeated(),
    ];
}

impl ToObject for ObjectGraphRequest {
    fn to_object(&self) -> Object {
        Object::new(Self::TYPE).with_data(
            Map::new()
                .with("request_id", self.request_id.as_str())
                .with("selector", string_list(self.selector.iter().map(String::as_str))),
        )
    }
}

impl FromObject for ObjectGraphRequest {
    fn from_object(object: &Object) -> ObjectResult<Self> {
        let reader = DataReader::new::<Self>(object)?;
        Ok(Self {
            request_id: reader.string("request_id")?,
            selector: reader.strings("selector")?,
        })
    }
}

/// A peer's hash inventory for a requested graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectGraphResponse {
    pub request_id: String,
    pub object_hashes: Vec<Hash>,
}

impl Typed for ObjectGraphResponse {
    const TYPE: &'static str = "strand.io/dag.graph-response";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("request_id", TypeHint::String),
        FieldSpec::optional("object_hashes", TypeHint::String).repeated(),
    ];
}

impl ToObject for ObjectGraphResponse {
    fn to_object(&self) -> Object {
        Object::new(Self::TYPE).with_data(
            Map::new()
                .with("request_id", self.request_id.as_str())
                .with(
                    "object_hashes",
                    string_list(self.object_hashes.iter().map(Hash::as_str)),
                ),
        )
    }
}

impl FromObject for ObjectGraphResponse {
    fn from_object(object: &Object) -> ObjectResult<Self> {
        let reader = DataReader::new::<Self>(object)?;
        Ok(Self {
            request_id: reader.string("request_id")?,
            object_hashes: reader.hashes("object_hashes")?,
        })
    }
}

/// Point-to-point request for a single object body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectRequest {
    pub request_id: String,
    pub hash: Hash,
}

impl Typed for ObjectRequest {
    const TYPE: &'static str = "strand.io/object.request";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("request_id", TypeHint::String),
        FieldSpec::required("hash", TypeHint::String),
    ];
}

impl ToObject for ObjectRequest {
    fn to_object(&self) -> Object {
        Object::new(Self::TYPE).with_data(
            Map::new()
                .with("request_id", self.request_id.as_str())
                .with("hash", self.hash.as_str()),
        )
    }
}

impl FromObject for ObjectRequest {
    fn from_object(object: &Object) -> ObjectResult<Self> {
        let reader = DataReader::new::<Self>(object)?;
        Ok(Self {
            request_id: reader.string("request_id")?,
            hash: Hash::parse(&reader.string("hash")?)?,
        })
    }
}
