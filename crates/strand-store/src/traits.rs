use strand_object::Object;
use strand_types::Hash;

use crate::error::StoreResult;

/// Hash-keyed object store with a per-stream index.
///
/// Implementations must be internally synchronized: `put`, `get` and the
/// graph scans may run concurrently from many tasks.
pub trait GraphStore: Send + Sync {
    /// Persist an object under its hash and its stream root.
    ///
    /// Idempotent. Returns `true` when the object was not stored before.
    fn put(&self, object: &Object) -> StoreResult<bool>;

    /// Read an object by hash. Fails with `NotFound` when absent.
    fn get(&self, hash: &Hash) -> StoreResult<Object>;

    /// Check whether an object is stored.
    fn contains(&self, hash: &Hash) -> StoreResult<bool>;

    /// Every stored member of the stream `hash` belongs to, parents first.
    ///
    /// Fails with `NotFound` when `hash` itself is not stored. The result may
    /// be incomplete; callers check with [`crate::is_complete`].
    fn graph(&self, hash: &Hash) -> StoreResult<Vec<Object>>;

    /// All locally known root objects.
    fn heads(&self) -> StoreResult<Vec<Object>>;

    /// Members of the stream of `hash` that no other member lists as a parent.
    fn tails(&self, hash: &Hash) -> StoreResult<Vec<Object>> {
        Ok(crate::graph::tails_of(&self.graph(hash)?)?)
    }
}
