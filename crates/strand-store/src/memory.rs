use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::RwLock;

use strand_object::Object;
use strand_types::Hash;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::graph::{sort_hashed, stream_root};
use crate::snapshot;
use crate::traits::GraphStore;

#[derive(Default)]
struct Index {
    /// hash -> object
    objects: BTreeMap<Hash, Object>,
    /// `"<root>.<hash>"` -> hash
    streams: BTreeMap<String, Hash>,
    roots: BTreeSet<Hash>,
}

impl Index {
    fn stream_members(&self, root: &Hash) -> Vec<(Hash, Object)> {
        let prefix = stream_key_prefix(root);
        self.streams
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(_, hash)| {
                self.objects
                    .get(hash)
                    .map(|object| (hash.clone(), object.clone()))
            })
            .collect()
    }
}

fn stream_key_prefix(root: &Hash) -> String {
    format!("{root}.")
}

fn stream_key(root: &Hash, hash: &Hash) -> String {
    format!("{root}.{hash}")
}

/// In-memory graph store over ordered indexes.
///
/// Intended for tests and embedding. Everything lives behind one `RwLock`;
/// objects are cloned on read and write. [`InMemoryGraphStore::save`] and
/// [`InMemoryGraphStore::open`] persist the contents as a snapshot file.
pub struct InMemoryGraphStore {
    index: RwLock<Index>,
}

impl InMemoryGraphStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            index: RwLock::new(Index::default()),
        }
    }

    /// Load a store from a snapshot written by [`InMemoryGraphStore::save`].
    ///
    /// A missing file yields an empty store.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let store = Self::new();
        if !path.exists() {
            debug!(path = %path.display(), "no snapshot; starting empty");
            return Ok(store);
        }
        for object in snapshot::read_snapshot(path)? {
            store.put(&object)?;
        }
        debug!(path = %path.display(), objects = store.len(), "snapshot loaded");
        Ok(store)
    }

    /// Write every stored object to a snapshot file.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let index = self.index.read().expect("lock poisoned");
        let written = snapshot::write_snapshot(path, index.objects.values())?;
        debug!(path = %path.display(), objects = written, "snapshot saved");
        Ok(())
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.index.read().expect("lock poisoned").objects.len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.index.read().expect("lock poisoned").objects.is_empty()
    }

    /// All stored hashes, sorted.
    pub fn all_hashes(&self) -> Vec<Hash> {
        self.index
            .read()
            .expect("lock poisoned")
            .objects
            .keys()
            .cloned()
            .collect()
    }
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore for InMemoryGraphStore {
    fn put(&self, object: &Object) -> StoreResult<bool> {
        let hash = object.hash()?;
        let root = stream_root(object)?;
        let mut index = self.index.write().expect("lock poisoned");
        if index.objects.contains_key(&hash) {
            return Ok(false);
        }
        if object.is_root() {
            index.roots.insert(hash.clone());
        }
        index.streams.insert(stream_key(&root, &hash), hash.clone());
        index.objects.insert(hash.clone(), object.clone());
        debug!(hash = %hash.short(), root = %root.short(), "stored object");
        Ok(true)
    }

    fn get(&self, hash: &Hash) -> StoreResult<Object> {
        let index = self.index.read().expect("lock poisoned");
        index
            .objects
            .get(hash)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(hash.clone()))
    }

    fn contains(&self, hash: &Hash) -> StoreResult<bool> {
        let index = self.index.read().expect("lock poisoned");
        Ok(index.objects.contains_key(hash))
    }

    fn graph(&self, hash: &Hash) -> StoreResult<Vec<Object>> {
        let index = self.index.read().expect("lock poisoned");
        let anchor = index
            .objects
            .get(hash)
            .ok_or_else(|| StoreError::NotFound(hash.clone()))?;
        let root = stream_root(anchor)?;
        let members = index.stream_members(&root);
        drop(index);
        Ok(sort_hashed(members))
    }

    fn heads(&self) -> StoreResult<Vec<Object>> {
        let index = self.index.read().expect("lock poisoned");
        Ok(index
            .roots
            .iter()
            .filter_map(|hash| index.objects.get(hash).cloned())
            .collect())
    }
}

impl std::fmt::Debug for InMemoryGraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let index = self.index.read().expect("lock poisoned");
        f.debug_struct("InMemoryGraphStore")
            .field("object_count", &index.objects.len())
            .field("root_count", &index.roots.len())
            .finish()
    }
}
