use std::sync::Arc;

use strand_crypto::{Ed25519Signer, KeyPair, Signer};
use strand_dag::{Broadcaster, DagManager, GraphUpdate, Subscription};
use strand_mutation::{is_mutation, Mutation, Operation};
use strand_object::{FromObject, Object, ToObject};
use strand_store::tails_of;
use strand_types::Hash;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::aggregator::{AggregateObject, Aggregator};
use crate::config::{AggregateConfig, OnMutationError};
use crate::error::{AggregateError, AggregateResult};

/// Reads, extends, and republishes aggregates on top of a [`DagManager`].
pub struct Manager {
    dag: Arc<DagManager>,
    aggregator: Aggregator,
    key: Option<Arc<KeyPair>>,
    signer: Arc<dyn Signer>,
    updates: Broadcaster<AggregateObject>,
}

impl Manager {
    /// Mutations appended through this manager are owned and signed by `key`
    /// when one is given.
    pub fn new(dag: Arc<DagManager>, config: AggregateConfig, key: Option<Arc<KeyPair>>) -> Self {
        Self {
            dag,
            aggregator: Aggregator::new(config.on_mutation_error),
            key,
            signer: Arc::new(Ed25519Signer),
            updates: Broadcaster::new(config.subscriber_capacity),
        }
    }

    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = signer;
        self
    }

    pub fn subscribe(&self) -> Subscription<AggregateObject> {
        self.updates.subscribe()
    }

    /// The current aggregate of the stream containing `hash`.
    pub async fn get(&self, hash: &Hash) -> AggregateResult<AggregateObject> {
        let graph = self.dag.get(hash).await?;
        let (root, mutations) = self.partition(hash, graph)?;
        self.aggregator.aggregate(&root, &mutations)
    }

    /// Append a mutation carrying `operations` to the stream containing
    /// `hash`, parented on the stream's current tails.
    pub async fn append(&self, hash: &Hash, operations: Vec<Operation>) -> AggregateResult<Hash> {
        let graph = self.dag.get(hash).await?;
        let parents = tails_of(&graph)?
            .iter()
            .map(Object::hash)
            .collect::<Result<Vec<_>, _>>()?;
        let root = root_of(hash, &graph)?;

        let mutation = Mutation {
            operations,
            parents,
            stream: Some(root.hash()?),
            owner: self.key.as_ref().map(|key| key.public_key()),
        };
        let mut object = mutation.to_object();
        if let Some(key) = &self.key {
            self.signer.sign(&mut object, key)?;
        }
        let mutation_hash = object.hash()?;
        self.dag.put(&[object]).await?;
        debug!(hash = %mutation_hash.short(), parents = mutation.parents.len(), "appended mutation");
        Ok(mutation_hash)
    }

    /// Run [`Manager::process`] on a new task.
    ///
    /// The DAG subscription is taken before the task starts, so no update
    /// published after this call is missed.
    pub fn spawn_processor(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let updates = self.dag.subscribe();
        let manager = self.clone();
        tokio::spawn(async move { manager.process(updates, cancel).await })
    }

    /// Recompute and publish the aggregate of every updated stream.
    ///
    /// Runs until `updates` closes or `cancel` fires. Failures for one
    /// stream are logged and do not stop the loop.
    pub async fn process(&self, mut updates: Subscription<GraphUpdate>, cancel: CancellationToken) {
        info!("aggregate processor started");
        loop {
            let update = tokio::select! {
                _ = cancel.cancelled() => break,
                update = updates.recv() => match update {
                    Some(update) => update,
                    None => break,
                },
            };

            // Coalesce updates already queued for the same streams.
            let mut roots = vec![update.root];
            while let Some(next) = updates.try_recv() {
                if !roots.contains(&next.root) {
                    roots.push(next.root);
                }
            }

            for root in roots {
                match self.get(&root).await {
                    Ok(aggregate) => {
                        debug!(root = %root.short(), mutations = aggregate.mutations.len(), "aggregate updated");
                        self.updates.publish(aggregate).await;
                    }
                    Err(e) => warn!(root = %root.short(), error = %e, "failed to aggregate"),
                }
            }
        }
        info!("aggregate processor stopped");
    }

    /// Split a graph into its single root object and its mutations.
    fn partition(&self, hash: &Hash, graph: Vec<Object>) -> AggregateResult<(Object, Vec<Mutation>)> {
        let root = root_of(hash, &graph)?.clone();
        let mut mutations = Vec::new();
        for object in graph.iter().filter(|object| is_mutation(object)) {
            match Mutation::from_object(object) {
                Ok(mutation) => mutations.push(mutation),
                Err(e) if self.aggregator.policy == OnMutationError::Skip => {
                    warn!(error = %e, "skipping undecodable mutation");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok((root, mutations))
    }
}

/// The single non-mutation object of a graph.
fn root_of<'a>(hash: &Hash, graph: &'a [Object]) -> AggregateResult<&'a Object> {
    let mut roots = graph.iter().filter(|object| !is_mutation(object));
    let root = roots
        .next()
        .ok_or_else(|| AggregateError::MissingRoot(hash.clone()))?;
    if roots.next().is_some() {
        return Err(AggregateError::MultipleRoots(hash.clone()));
    }
    Ok(root)
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("dag", &self.dag)
            .field("aggregator", &self.aggregator)
            .field("signing", &self.key.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use strand_crypto::CryptoError;
    use strand_dag::{DagConfig, DagError, InMemoryLocalInfo, MemoryExchange, MemoryNetwork};
    use strand_mutation::Cursor;
    use strand_object::{Metadata, PublicKey};
    use strand_store::InMemoryGraphStore;
    use strand_types::{Map, Value};

    fn setup(key: Option<Arc<KeyPair>>, config: AggregateConfig) -> (Arc<Manager>, Arc<DagManager>) {
        let network = MemoryNetwork::new();
        let store = Arc::new(InMemoryGraphStore::new());
        let exchange = MemoryExchange::connect(&network, PublicKey::new("local"), store.clone());
        let dag = Arc::new(DagManager::new(
            store,
            exchange,
            Arc::new(InMemoryLocalInfo::new()),
            DagConfig::default(),
        ));
        (Arc::new(Manager::new(dag.clone(), config, key)), dag)
    }

    fn cursor(path: &str) -> Cursor {
        Cursor::parse(path).unwrap()
    }

    fn root() -> Object {
        Object::new("test/doc").with_data(
            Map::new()
                .with("foo", "bar")
                .with("numbers", Value::List(vec![Value::Int(1)])),
        )
    }

    #[tokio::test]
    async fn get_of_bare_root_is_identity() {
        let (manager, dag) = setup(None, AggregateConfig::default());
        dag.put(&[root()]).await.unwrap();
        let result = manager.get(&root().hash().unwrap()).await.unwrap();
        assert_eq!(result.aggregate, root());
        assert!(result.mutations.is_empty());
    }

    #[tokio::test]
    async fn append_then_get() {
        let (manager, dag) = setup(None, AggregateConfig::default());
        dag.put(&[root()]).await.unwrap();
        let root_hash = root().hash().unwrap();

        manager
            .append(&root_hash, vec![Operation::assign(cursor("foo"), "baz")])
            .await
            .unwrap();
        let second = manager
            .append(&root_hash, vec![Operation::append(cursor("numbers"), 2i64)])
            .await
            .unwrap();

        let result = manager.get(&second).await.unwrap();
        assert_eq!(result.mutations.len(), 2);
        assert_eq!(result.aggregate.data.get("foo"), Some(&Value::from("baz")));
        assert_eq!(
            result.aggregate.data.get("numbers"),
            Some(&Value::List(vec![Value::Int(1), Value::Int(2)]))
        );
    }

    #[tokio::test]
    async fn appended_mutations_chain_on_tails() {
        let (manager, dag) = setup(None, AggregateConfig::default());
        dag.put(&[root()]).await.unwrap();
        let root_hash = root().hash().unwrap();

        let first = manager
            .append(&root_hash, vec![Operation::assign(cursor("a"), 1i64)])
            .await
            .unwrap();
        let second = manager
            .append(&root_hash, vec![Operation::assign(cursor("b"), 2i64)])
            .await
            .unwrap();

        let tails = dag.tails(&root_hash).await.unwrap();
        assert_eq!(tails.len(), 1);
        assert_eq!(tails[0].hash().unwrap(), second);
        assert_eq!(tails[0].metadata.parents, vec![first]);
        assert_eq!(tails[0].metadata.stream, Some(root_hash));
    }

    #[tokio::test]
    async fn appended_mutations_are_signed() {
        let key = Arc::new(KeyPair::generate());
        let (manager, dag) = setup(Some(key.clone()), AggregateConfig::default());
        dag.put(&[root()]).await.unwrap();

        let hash = manager
            .append(&root().hash().unwrap(), vec![Operation::assign(cursor("foo"), "x")])
            .await
            .unwrap();
        let graph = dag.get(&hash).await.unwrap();
        let object = graph.iter().find(|o| o.hash().unwrap() == hash).unwrap();
        assert_eq!(object.metadata.owner, Some(key.public_key()));
        assert_eq!(Ed25519Signer::verify(object), Ok::<(), CryptoError>(()));
    }

    #[tokio::test]
    async fn append_to_unknown_stream_fails() {
        let (manager, _) = setup(None, AggregateConfig::default());
        let err = manager
            .append(&root().hash().unwrap(), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AggregateError::Dag(DagError::Store(_))));
    }

    #[tokio::test]
    async fn two_roots_in_one_stream_are_rejected() {
        let (manager, dag) = setup(None, AggregateConfig::default());
        let r = root();
        let intruder = Object::new("test/other").with_metadata(Metadata {
            parents: vec![r.hash().unwrap()],
            stream: Some(r.hash().unwrap()),
            ..Metadata::default()
        });
        dag.put(&[r.clone(), intruder]).await.unwrap();
        assert!(matches!(
            manager.get(&r.hash().unwrap()).await,
            Err(AggregateError::MultipleRoots(_))
        ));
    }

    #[tokio::test]
    async fn failing_appends_are_skipped_by_default() {
        let (manager, dag) = setup(None, AggregateConfig::default());
        dag.put(&[root()]).await.unwrap();
        let root_hash = root().hash().unwrap();
        manager
            .append(&root_hash, vec![Operation::delete(cursor("foo"))])
            .await
            .unwrap();
        let result = manager.get(&root_hash).await.unwrap();
        assert_eq!(result.aggregate, root());
        assert_eq!(result.mutations.len(), 1);
    }

    #[tokio::test]
    async fn abort_policy_surfaces_failures() {
        let config = AggregateConfig {
            on_mutation_error: OnMutationError::Abort,
            ..AggregateConfig::default()
        };
        let (manager, dag) = setup(None, config);
        dag.put(&[root()]).await.unwrap();
        let root_hash = root().hash().unwrap();
        manager
            .append(&root_hash, vec![Operation::delete(cursor("foo"))])
            .await
            .unwrap();
        assert!(matches!(
            manager.get(&root_hash).await,
            Err(AggregateError::Mutation(_))
        ));
    }

    #[tokio::test]
    async fn processor_publishes_aggregates() {
        let (manager, dag) = setup(None, AggregateConfig::default());
        let mut aggregates = manager.subscribe();
        let cancel = CancellationToken::new();
        let processor = manager.spawn_processor(cancel.clone());

        dag.put(&[root()]).await.unwrap();
        let first = tokio::time::timeout(Duration::from_secs(1), aggregates.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.aggregate, root());

        manager
            .append(&root().hash().unwrap(), vec![Operation::assign(cursor("foo"), "new")])
            .await
            .unwrap();
        let second = tokio::time::timeout(Duration::from_secs(1), aggregates.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.aggregate.data.get("foo"), Some(&Value::from("new")));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), processor)
            .await
            .unwrap()
            .unwrap();
    }
}
