use serde::{Deserialize, Serialize};
use strand_types::{Hash, Map, Value};

use crate::error::{ObjectError, ObjectResult};
use crate::identity::PublicKey;

/// Reserved top-level key holding the object type.
pub const TYPE_KEY: &str = "@type";
/// Reserved top-level key holding the metadata block.
pub const METADATA_KEY: &str = "@metadata";

const OWNER_KEY: &str = "owner";
const PARENTS_KEY: &str = "parents";
const POLICY_KEY: &str = "policy";
const STREAM_KEY: &str = "stream";
const SIGNATURE_KEY: &str = "_signature";

/// An immutable, typed, hashable unit of data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Object {
    /// Type tag, e.g. `"strand.io/mutation"`.
    pub object_type: String,
    pub metadata: Metadata,
    pub data: Map,
}

impl Object {
    /// Create an empty object of the given type.
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            metadata: Metadata::default(),
            data: Map::new(),
        }
    }

    pub fn with_data(mut self, data: Map) -> Self {
        self.data = data;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Objects without parents are roots of their stream.
    pub fn is_root(&self) -> bool {
        self.metadata.parents.is_empty()
    }

    /// The generic map form: `@type`, `@metadata` (when non-empty) and the
    /// data entries alongside them.
    ///
    /// Data keys that collide with the reserved names have no map form and
    /// are left out here; [`Object::hash`] rejects such objects.
    pub fn to_map(&self) -> Map {
        self.map_form(true)
    }

    fn map_form(&self, with_private: bool) -> Map {
        let mut map = Map::new();
        map.insert(TYPE_KEY, self.object_type.as_str());
        let emit_metadata = if with_private {
            !self.metadata.is_empty()
        } else {
            self.metadata.has_hashed_fields()
        };
        if emit_metadata {
            map.insert(METADATA_KEY, self.metadata.to_map());
        }
        for (key, value) in self.data.iter() {
            if !is_reserved_key(key) {
                map.insert(key, value.clone());
            }
        }
        map
    }

    /// Inverse of [`Object::to_map`].
    pub fn from_map(map: &Map) -> ObjectResult<Self> {
        let object_type = match map.get(TYPE_KEY) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(ObjectError::Decode(format!(
                    "{TYPE_KEY} must be a string, got {}",
                    other.hint()
                )))
            }
            None => return Err(ObjectError::MissingField(TYPE_KEY.into())),
        };
        let metadata = match map.get(METADATA_KEY) {
            Some(Value::Map(m)) => Metadata::from_map(m)?,
            Some(other) => {
                return Err(ObjectError::Decode(format!(
                    "{METADATA_KEY} must be a map, got {}",
                    other.hint()
                )))
            }
            None => Metadata::default(),
        };
        let data = map
            .iter()
            .filter(|(key, _)| !is_reserved_key(key))
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect();
        Ok(Self {
            object_type,
            metadata,
            data,
        })
    }

    /// Fails if a data key shadows `@type` or `@metadata`.
    pub fn validate(&self) -> ObjectResult<()> {
        match self.data.keys().find(|key| is_reserved_key(key)) {
            Some(key) => Err(ObjectError::Decode(format!("data key {key} is reserved"))),
            None => Ok(()),
        }
    }

    /// Canonical content hash. The signature does not contribute, even on
    /// objects with no other metadata.
    pub fn hash(&self) -> ObjectResult<Hash> {
        self.validate()?;
        Ok(self.map_form(false).hash()?)
    }
}

fn is_reserved_key(key: &str) -> bool {
    key == TYPE_KEY || key == METADATA_KEY
}

/// Object metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub owner: Option<PublicKey>,
    /// Causal predecessors within the graph.
    pub parents: Vec<Hash>,
    pub policy: Option<Policy>,
    /// Root of the stream this object belongs to.
    pub stream: Option<Hash>,
    /// Kept under a private key, so it never affects the hash.
    pub signature: Option<Signature>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        !self.has_hashed_fields() && self.signature.is_none()
    }

    /// Whether any field other than the signature is set.
    pub fn has_hashed_fields(&self) -> bool {
        self.owner.is_some()
            || !self.parents.is_empty()
            || self.policy.is_some()
            || self.stream.is_some()
    }

    /// Map form. Empty fields are omitted so a decoded object hashes the
    /// same as the original.
    pub fn to_map(&self) -> Map {
        let mut map = Map::new();
        if let Some(owner) = &self.owner {
            map.insert(OWNER_KEY, owner.as_str());
        }
        if !self.parents.is_empty() {
            map.insert(PARENTS_KEY, string_list(self.parents.iter().map(Hash::as_str)));
        }
        if let Some(policy) = &self.policy {
            map.insert(POLICY_KEY, policy.to_map());
        }
        if let Some(stream) = &self.stream {
            map.insert(STREAM_KEY, stream.as_str());
        }
        if let Some(signature) = &self.signature {
            map.insert(SIGNATURE_KEY, signature.to_map());
        }
        map
    }

    pub fn from_map(map: &Map) -> ObjectResult<Self> {
        let mut metadata = Self::default();
        for (key, value) in map.iter() {
            match key {
                OWNER_KEY => metadata.owner = Some(PublicKey::new(expect_str(value, key)?)),
                PARENTS_KEY => {
                    metadata.parents = strings_from(value, key)?
                        .iter()
                        .map(|s| Hash::parse(s))
                        .collect::<Result<_, _>>()?;
                }
                POLICY_KEY => metadata.policy = Some(Policy::from_map(expect_map(value, key)?)?),
                STREAM_KEY => metadata.stream = Some(Hash::parse(expect_str(value, key)?)?),
                SIGNATURE_KEY => {
                    metadata.signature = Some(Signature::from_map(expect_map(value, key)?)?)
                }
                other => {
                    return Err(ObjectError::Decode(format!("unknown metadata field {other}")))
                }
            }
        }
        Ok(metadata)
    }
}

/// Whether a policy grants or denies its actions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyEffect {
    #[default]
    Allow,
    Deny,
}

impl PolicyEffect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }

    fn parse(s: &str) -> ObjectResult<Self> {
        match s {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            other => Err(ObjectError::Decode(format!("unknown policy effect {other}"))),
        }
    }
}

/// Access policy carried with an object.
///
/// Policies are hashed and transported but not evaluated here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub subjects: Vec<PublicKey>,
    pub resources: Vec<String>,
    pub actions: Vec<String>,
    pub effect: PolicyEffect,
}

impl Policy {
    pub fn to_map(&self) -> Map {
        Map::new()
            .with("subjects", string_list(self.subjects.iter().map(PublicKey::as_str)))
            .with("resources", string_list(self.resources.iter().map(String::as_str)))
            .with("actions", string_list(self.actions.iter().map(String::as_str)))
            .with("effect", self.effect.as_str())
    }

    pub fn from_map(map: &Map) -> ObjectResult<Self> {
        let list = |key: &str| -> ObjectResult<Vec<String>> {
            map.get(key).map_or(Ok(Vec::new()), |v| strings_from(v, key))
        };
        let effect = match map.get("effect") {
            Some(v) => PolicyEffect::parse(expect_str(v, "effect")?)?,
            None => PolicyEffect::default(),
        };
        Ok(Self {
            subjects: list("subjects")?.into_iter().map(PublicKey::new).collect(),
            resources: list("resources")?,
            actions: list("actions")?,
            effect,
        })
    }
}

/// Detached signature over an object's hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub signer: PublicKey,
    pub alg: String,
    pub x: Vec<u8>,
}

impl Signature {
    pub fn to_map(&self) -> Map {
        Map::new()
            .with("signer", self.signer.as_str())
            .with("alg", self.alg.as_str())
            .with("x", self.x.clone())
    }

    pub fn from_map(map: &Map) -> ObjectResult<Self> {
        let field = |key: &str| {
            map.get(key)
                .ok_or_else(|| ObjectError::MissingField(format!("signature.{key}")))
        };
        let x = field("x")?
            .as_bytes()
            .ok_or_else(|| ObjectError::Decode("signature.x must be bytes".into()))?
            .to_vec();
        Ok(Self {
            signer: PublicKey::new(expect_str(field("signer")?, "signer")?),
            alg: expect_str(field("alg")?, "alg")?.to_string(),
            x,
        })
    }
}

/// A list of string values.
pub fn string_list<'a>(items: impl Iterator<Item = &'a str>) -> Value {
    Value::List(items.map(Value::from).collect())
}

fn expect_str<'a>(value: &'a Value, field: &str) -> ObjectResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| ObjectError::Decode(format!("{field} must be a string, got {}", value.hint())))
}

fn expect_map<'a>(value: &'a Value, field: &str) -> ObjectResult<&'a Map> {
    value
        .as_map()
        .ok_or_else(|| ObjectError::Decode(format!("{field} must be a map, got {}", value.hint())))
}

pub(crate) fn strings_from(value: &Value, field: &str) -> ObjectResult<Vec<String>> {
    let items = value
        .as_list()
        .ok_or_else(|| ObjectError::Decode(format!("{field} must be a list, got {}", value.hint())))?;
    items
        .iter()
        .map(|item| expect_str(item, field).map(str::to_string))
        .collect()
}
