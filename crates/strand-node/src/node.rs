use std::sync::{Arc, Mutex};

use strand_aggregate::{AggregateObject, Manager};
use strand_crypto::{Ed25519Signer, KeyPair, Signer};
use strand_dag::{DagManager, Discovery, Exchange, GraphState, LocalInfo, Subscription};
use strand_mutation::Operation;
use strand_object::{Object, PeerAddress, PublicKey};
use strand_store::{GraphStore, InMemoryGraphStore};
use strand_types::Hash;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::NodeConfig;
use crate::error::{NodeError, NodeResult};

/// A Strand peer: one store, one DAG manager and one aggregate manager
/// sharing an identity.
pub struct Node {
    config: NodeConfig,
    key: Arc<KeyPair>,
    store: Arc<InMemoryGraphStore>,
    exchange: Arc<dyn Exchange>,
    dag: Arc<DagManager>,
    aggregates: Arc<Manager>,
    discovery: Option<Arc<dyn Discovery>>,
    cancel: CancellationToken,
    processor: Mutex<Option<JoinHandle<()>>>,
}

impl Node {
    /// Build a node from `config`.
    ///
    /// The exchange serves objects out of the node's store, so it is created
    /// by `connect` once the store is open.
    pub fn new<F>(
        config: NodeConfig,
        key: KeyPair,
        local_info: Arc<dyn LocalInfo>,
        connect: F,
    ) -> NodeResult<Self>
    where
        F: FnOnce(PublicKey, Arc<dyn GraphStore>) -> Arc<dyn Exchange>,
    {
        let store = Arc::new(match &config.store_path {
            Some(path) => InMemoryGraphStore::open(path)?,
            None => InMemoryGraphStore::new(),
        });
        let key = Arc::new(key);
        let shared: Arc<dyn GraphStore> = store.clone();
        let exchange = connect(key.public_key(), shared.clone());
        let dag = Arc::new(DagManager::new(
            shared,
            exchange.clone(),
            local_info,
            config.dag.clone(),
        ));
        let aggregates = Arc::new(Manager::new(
            dag.clone(),
            config.aggregate.clone(),
            Some(key.clone()),
        ));

        Ok(Self {
            config,
            key,
            store,
            exchange,
            dag,
            aggregates,
            discovery: None,
            cancel: CancellationToken::new(),
            processor: Mutex::new(None),
        })
    }

    /// Use `discovery` to find peers for [`Node::sync`].
    pub fn with_discovery(mut self, discovery: Arc<dyn Discovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    pub fn address(&self) -> PeerAddress {
        self.exchange.local_key().address()
    }

    pub fn dag(&self) -> &Arc<DagManager> {
        &self.dag
    }

    pub fn aggregates(&self) -> &Arc<Manager> {
        &self.aggregates
    }

    /// Number of objects in the local store.
    pub fn object_count(&self) -> usize {
        self.store.len()
    }

    /// Register protocol handlers and start the aggregate processor.
    pub fn start(&self) -> NodeResult<()> {
        let mut processor = self.processor.lock().expect("processor lock poisoned");
        if processor.is_some() {
            return Ok(());
        }
        self.dag.start()?;
        *processor = Some(self.aggregates.spawn_processor(self.cancel.child_token()));
        info!(peer = %self.key.public_key(), objects = self.store.len(), "node started");
        Ok(())
    }

    /// Stop the processor, unregister handlers, and persist the store when
    /// a snapshot path is configured.
    pub async fn shutdown(&self) -> NodeResult<()> {
        self.cancel.cancel();
        let handle = self
            .processor
            .lock()
            .expect("processor lock poisoned")
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "aggregate processor ended abnormally");
            }
        }
        self.dag.stop();

        if let Some(path) = &self.config.store_path {
            self.store.save(path)?;
        }
        info!(peer = %self.key.public_key(), "node stopped");
        Ok(())
    }

    /// Own, sign and store a new object. Returns its hash.
    ///
    /// An object without parents starts a new stream.
    pub async fn create(&self, mut object: Object) -> NodeResult<Hash> {
        if object.metadata.owner.is_none() {
            object.metadata.owner = Some(self.key.public_key());
        }
        Ed25519Signer.sign(&mut object, &self.key)?;
        let hash = object.hash()?;
        self.dag.put(&[object]).await?;
        Ok(hash)
    }

    /// The current aggregate of the stream containing `hash`.
    pub async fn get(&self, hash: &Hash) -> NodeResult<AggregateObject> {
        Ok(self.aggregates.get(hash).await?)
    }

    /// Append a signed mutation to the stream containing `hash`.
    pub async fn append(&self, hash: &Hash, operations: Vec<Operation>) -> NodeResult<Hash> {
        Ok(self.aggregates.append(hash, operations).await?)
    }

    pub fn state(&self, hash: &Hash) -> NodeResult<GraphState> {
        Ok(self.dag.state(hash)?)
    }

    /// Fetch the graph of `root` from the peers discovery reports for it.
    pub async fn sync(&self, root: &Hash, cancel: &CancellationToken) -> NodeResult<Vec<Object>> {
        let discovery = self
            .discovery
            .as_ref()
            .ok_or_else(|| NodeError::Config("no discovery configured".into()))?;
        let peers = discovery.find_by_content(root).await?;
        self.sync_with(root, &peers, cancel).await
    }

    /// Fetch the graph of `root` from `peers`.
    pub async fn sync_with(
        &self,
        root: &Hash,
        peers: &[PeerAddress],
        cancel: &CancellationToken,
    ) -> NodeResult<Vec<Object>> {
        Ok(self.dag.sync(root, peers, cancel).await?)
    }

    /// Aggregates published by the processor after every stream change.
    pub fn subscribe(&self) -> Subscription<AggregateObject> {
        self.aggregates.subscribe()
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("peer", &self.key.public_key())
            .field("objects", &self.store.len())
            .field("store_path", &self.config.store_path)
            .finish()
    }
}
