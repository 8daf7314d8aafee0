use strand_object::{
    DataReader, FieldSpec, FromObject, Metadata, Object, ObjectResult, PublicKey, ToObject, Typed,
};
use strand_types::{Hash, Map, TypeHint, Value};
use tracing::trace;

use crate::error::MutationResult;
use crate::operation::Operation;

/// An object carrying ordered operations against its stream's root.
///
/// `parents` are the graph tails the mutation was created against.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mutation {
    pub operations: Vec<Operation>,
    pub parents: Vec<Hash>,
    pub stream: Option<Hash>,
    pub owner: Option<PublicKey>,
}

impl Mutation {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self {
            operations,
            ..Self::default()
        }
    }

    /// Apply every operation in order, stopping at the first failure.
    pub fn mutate(&self, object: &mut Object) -> MutationResult<()> {
        for (i, operation) in self.operations.iter().enumerate() {
            operation.apply(object)?;
            trace!(index = i, op = %operation.op, cursor = %operation.cursor, "applied operation");
        }
        Ok(())
    }
}

/// Whether `object` is encoded as a [`Mutation`].
pub fn is_mutation(object: &Object) -> bool {
    object.object_type == Mutation::TYPE
}

impl Typed for Mutation {
    const TYPE: &'static str = "strand.io/mutation";
    const FIELDS: &'static [FieldSpec] =
        &[FieldSpec::required("operations", TypeHint::Map).repeated()];
}

impl ToObject for Mutation {
    fn to_object(&self) -> Object {
        let operations = self
            .operations
            .iter()
            .map(|op| Value::Map(op.to_object().to_map()))
            .collect::<Vec<_>>();
        Object::new(Self::TYPE)
            .with_metadata(Metadata {
                owner: self.owner.clone(),
                parents: self.parents.clone(),
                stream: self.stream.clone(),
                ..Metadata::default()
            })
            .with_data(Map::new().with("operations", operations))
    }
}

impl FromObject for Mutation {
    fn from_object(object: &Object) -> ObjectResult<Self> {
        let reader = DataReader::new::<Self>(object)?;
        let operations = reader
            .objects("operations")?
            .iter()
            .map(Operation::from_object)
            .collect::<ObjectResult<_>>()?;
        let metadata = reader.metadata();
        Ok(Self {
            operations,
            parents: metadata.parents.clone(),
            stream: metadata.stream.clone(),
            owner: metadata.owner.clone(),
        })
    }
}
