use strand_mutation::Mutation;
use strand_object::Object;
use tracing::warn;

use crate::config::OnMutationError;
use crate::error::AggregateResult;

/// A root, the mutations folded into it, and the result.
#[derive(Clone, Debug, PartialEq)]
pub struct AggregateObject {
    pub root: Object,
    /// In application order.
    pub mutations: Vec<Mutation>,
    pub aggregate: Object,
}

/// Folds mutations into a root object.
#[derive(Clone, Copy, Debug, Default)]
pub struct Aggregator {
    pub policy: OnMutationError,
}

impl Aggregator {
    pub fn new(policy: OnMutationError) -> Self {
        Self { policy }
    }

    /// Apply `mutations` in the given order on top of a copy of `root`.
    ///
    /// Each mutation applies atomically: under [`OnMutationError::Skip`] a
    /// failing mutation leaves no trace in the aggregate.
    pub fn aggregate(&self, root: &Object, mutations: &[Mutation]) -> AggregateResult<AggregateObject> {
        let mut aggregate = root.clone();
        for (index, mutation) in mutations.iter().enumerate() {
            let mut next = aggregate.clone();
            match mutation.mutate(&mut next) {
                Ok(()) => aggregate = next,
                Err(e) => match self.policy {
                    OnMutationError::Skip => {
                        warn!(index, error = %e, "skipping mutation");
                    }
                    OnMutationError::Abort => return Err(e.into()),
                },
            }
        }
        Ok(AggregateObject {
            root: root.clone(),
            mutations: mutations.to_vec(),
            aggregate,
        })
    }
}
