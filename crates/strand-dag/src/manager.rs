use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use strand_object::{FromObject, Object, PeerAddress, ToObject, Typed};
use strand_store::{is_complete, stream_root, GraphStore, StoreError};
use strand_types::Hash;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broadcast::{Broadcaster, Subscription};
use crate::config::DagConfig;
use crate::error::{DagError, DagResult, ExchangeError, ExchangeResult};
use crate::exchange::{Envelope, EnvelopeHandler, Exchange, LocalInfo, Registration, SendOptions};
use crate::payload::{ObjectGraphRequest, ObjectGraphResponse};

/// How much of a graph is known locally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GraphState {
    /// The anchor object is not stored.
    Unknown,
    /// Some referenced parents are missing.
    Partial,
    /// Every referenced parent is stored.
    Complete,
}

/// Published once per newly stored object of a complete graph.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphUpdate {
    /// Root of the stream the object belongs to.
    pub root: Hash,
    pub hash: Hash,
    pub object: Object,
}

/// Owns graph writes, reads, and peer synchronization.
///
/// Subscribers only ever see objects whose whole graph is stored, so any
/// [`GraphUpdate`] can be followed by a successful [`DagManager::get`].
pub struct DagManager {
    store: Arc<dyn GraphStore>,
    exchange: Arc<dyn Exchange>,
    local_info: Arc<dyn LocalInfo>,
    updates: Broadcaster<GraphUpdate>,
    registration: Mutex<Option<Registration>>,
    config: DagConfig,
}

impl DagManager {
    pub fn new(
        store: Arc<dyn GraphStore>,
        exchange: Arc<dyn Exchange>,
        local_info: Arc<dyn LocalInfo>,
        config: DagConfig,
    ) -> Self {
        Self {
            updates: Broadcaster::new(config.subscriber_capacity),
            store,
            exchange,
            local_info,
            registration: Mutex::new(None),
            config,
        }
    }

    pub fn config(&self) -> &DagConfig {
        &self.config
    }

    /// Register the graph request handler and announce every stored root.
    pub fn start(self: &Arc<Self>) -> DagResult<()> {
        let handler = Arc::new(GraphRequestHandler(Arc::downgrade(self)));
        let registration = self.exchange.handle(ObjectGraphRequest::TYPE, handler)?;
        *self.registration.lock().expect("registration lock poisoned") = Some(registration);

        let heads = self
            .store
            .heads()?
            .iter()
            .map(Object::hash)
            .collect::<Result<Vec<_>, _>>()?;
        self.local_info.add_content_hash(&heads);
        info!(peer = %self.exchange.local_key(), heads = heads.len(), "dag manager started");
        Ok(())
    }

    /// Unregister the graph request handler.
    pub fn stop(&self) {
        if let Some(registration) = self
            .registration
            .lock()
            .expect("registration lock poisoned")
            .take()
        {
            registration.unregister();
        }
    }

    pub fn subscribe(&self) -> Subscription<GraphUpdate> {
        self.updates.subscribe()
    }

    /// Store objects and publish them once their graphs are complete.
    ///
    /// Objects are stored even when some graph is incomplete; in that case
    /// nothing is published and `IncompleteGraph` names the first object
    /// whose graph is missing parents.
    pub async fn put(&self, objects: &[Object]) -> DagResult<()> {
        let mut fresh = Vec::new();
        let mut hashes = Vec::with_capacity(objects.len());
        for object in objects {
            let hash = object.hash()?;
            if self.store.put(object)? {
                fresh.push((hash.clone(), object.clone()));
            }
            hashes.push(hash);
        }

        for hash in &hashes {
            let graph = self.store.graph(hash)?;
            if !is_complete(&graph)? {
                debug!(hash = %hash.short(), "graph incomplete; not publishing");
                return Err(DagError::IncompleteGraph(hash.clone()));
            }
        }

        self.publish(fresh).await
    }

    /// The complete graph anchored at `hash`, parents first.
    pub async fn get(&self, hash: &Hash) -> DagResult<Vec<Object>> {
        let graph = self.store.graph(hash)?;
        if !is_complete(&graph)? {
            return Err(DagError::IncompleteGraph(hash.clone()));
        }
        Ok(graph)
    }

    /// Current frontier of the graph anchored at `hash`.
    pub async fn tails(&self, hash: &Hash) -> DagResult<Vec<Object>> {
        Ok(self.store.tails(hash)?)
    }

    pub fn state(&self, hash: &Hash) -> DagResult<GraphState> {
        let graph = match self.store.graph(hash) {
            Ok(graph) => graph,
            Err(StoreError::NotFound(_)) => return Ok(GraphState::Unknown),
            Err(e) => return Err(e.into()),
        };
        if is_complete(&graph)? {
            Ok(GraphState::Complete)
        } else {
            Ok(GraphState::Partial)
        }
    }

    /// Fetch the graph of `root` from `addresses`.
    ///
    /// Peers that fail or stay silent are skipped, and a hash they failed to
    /// deliver is retried from the next peer that reported it. The whole sync
    /// is bounded by the configured sync timeout and by `cancel`; either
    /// aborts it with an error. Objects already fetched stay stored.
    ///
    /// The returned graph is whatever is stored for `root` afterwards and can
    /// still be partial when peers did not deliver everything. Check
    /// [`DagManager::state`] before relying on it; nothing is published
    /// unless the graph is complete.
    pub async fn sync(
        &self,
        root: &Hash,
        addresses: &[PeerAddress],
        cancel: &CancellationToken,
    ) -> DagResult<Vec<Object>> {
        tokio::select! {
            _ = cancel.cancelled() => {
                warn!(root = %root.short(), "sync cancelled");
                Err(DagError::Cancelled)
            }
            result = tokio::time::timeout(self.config.sync_timeout(), self.sync_inner(root, addresses)) => {
                result.map_err(|_| {
                    warn!(root = %root.short(), "sync timed out");
                    DagError::Timeout
                })?
            }
        }
    }

    async fn sync_inner(&self, root: &Hash, addresses: &[PeerAddress]) -> DagResult<Vec<Object>> {
        let queue = self.collect_inventories(root, addresses).await;

        let mut fresh = Vec::new();
        let mut seen = BTreeSet::new();
        for (hash, address) in queue {
            if !seen.insert(hash.clone()) || self.store.contains(&hash)? {
                continue;
            }
            match self.fetch(&hash, &address).await {
                Ok(Some(object)) => {
                    if self.store.put(&object)? {
                        fresh.push((hash, object));
                    }
                }
                Ok(None) => {
                    warn!(hash = %hash.short(), peer = %address, "object not received");
                    seen.remove(&hash);
                }
                Err(e) => {
                    warn!(hash = %hash.short(), peer = %address, error = %e, "object request failed");
                    seen.remove(&hash);
                }
            }
        }

        let graph = self.store.graph(root)?;
        if is_complete(&graph)? {
            self.publish(fresh).await?;
        }
        info!(root = %root.short(), objects = graph.len(), "sync finished");
        Ok(graph)
    }

    /// Ask every address for its inventory of `root`'s graph.
    async fn collect_inventories(
        &self,
        root: &Hash,
        addresses: &[PeerAddress],
    ) -> VecDeque<(Hash, PeerAddress)> {
        let mut tasks = JoinSet::new();
        for address in addresses {
            let exchange = self.exchange.clone();
            let address = address.clone();
            let root = root.clone();
            let buffer = self.config.response_buffer;
            let timeout = self.config.fetch_timeout();
            tasks.spawn(async move {
                let response = tokio::time::timeout(
                    timeout,
                    request_inventory(exchange.as_ref(), &root, &address, buffer),
                )
                .await
                .unwrap_or(Err(DagError::Timeout));
                (address, response)
            });
        }

        let mut queue = VecDeque::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((address, Ok(response))) => {
                    debug!(peer = %address, hashes = response.object_hashes.len(), "inventory received");
                    queue.extend(
                        response
                            .object_hashes
                            .into_iter()
                            .map(|hash| (hash, address.clone())),
                    );
                }
                Ok((address, Err(e))) => {
                    warn!(peer = %address, error = %e, "inventory request failed");
                }
                Err(e) => warn!(error = %e, "inventory task failed"),
            }
        }
        queue
    }

    /// Request one object, waiting for a reply that hashes to `hash`.
    ///
    /// `Ok(None)` when the peer stays silent past the fetch timeout.
    async fn fetch(&self, hash: &Hash, address: &PeerAddress) -> DagResult<Option<Object>> {
        let request_id = uuid::Uuid::now_v7().to_string();
        let (tx, mut rx) = mpsc::channel(self.config.response_buffer.max(1));
        self.exchange
            .request(hash, address, SendOptions::with_response(request_id, tx))
            .await?;

        let wait = async {
            while let Some(envelope) = rx.recv().await {
                match envelope.payload.hash() {
                    Ok(received) if &received == hash => return Some(envelope.payload),
                    Ok(received) => {
                        debug!(expected = %hash.short(), received = %received.short(), "discarding mismatched object")
                    }
                    Err(e) => debug!(error = %e, "discarding unhashable object"),
                }
            }
            None
        };
        Ok(tokio::time::timeout(self.config.fetch_timeout(), wait)
            .await
            .unwrap_or(None))
    }

    /// Answer an inbound [`ObjectGraphRequest`] with the local inventory.
    ///
    /// An unknown root yields an empty inventory.
    pub async fn process(&self, envelope: Envelope) -> DagResult<()> {
        let request = ObjectGraphRequest::from_object(&envelope.payload)?;
        let selector = request
            .selector
            .first()
            .ok_or_else(|| DagError::InvalidSelector("empty selector".into()))?;
        let root = Hash::parse(selector).map_err(|e| DagError::InvalidSelector(e.to_string()))?;

        let object_hashes = match self.store.graph(&root) {
            Ok(graph) => graph.iter().map(Object::hash).collect::<Result<Vec<_>, _>>()?,
            Err(StoreError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(
            root = %root.short(),
            peer = %envelope.sender,
            hashes = object_hashes.len(),
            "answering graph request"
        );

        let response = ObjectGraphResponse {
            request_id: request.request_id.clone(),
            object_hashes,
        };
        self.exchange
            .send(
                response.to_object(),
                &envelope.sender.address(),
                SendOptions::as_response(request.request_id),
            )
            .await?;
        Ok(())
    }

    async fn publish(&self, fresh: Vec<(Hash, Object)>) -> DagResult<()> {
        let mut roots = BTreeSet::new();
        for (hash, object) in fresh {
            let root = stream_root(&object)?;
            debug!(hash = %hash.short(), root = %root.short(), "publishing graph update");
            roots.insert(root.clone());
            self.updates.publish(GraphUpdate { root, hash, object }).await;
        }
        if !roots.is_empty() {
            self.local_info
                .add_content_hash(&roots.into_iter().collect::<Vec<_>>());
        }
        Ok(())
    }
}

impl std::fmt::Debug for DagManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DagManager")
            .field("peer", self.exchange.local_key())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

async fn request_inventory(
    exchange: &dyn Exchange,
    root: &Hash,
    address: &PeerAddress,
    buffer: usize,
) -> DagResult<ObjectGraphResponse> {
    let request = ObjectGraphRequest::new(uuid::Uuid::now_v7().to_string(), root);
    let (tx, mut rx) = mpsc::channel(buffer.max(1));
    exchange
        .send(
            request.to_object(),
            address,
            SendOptions::with_response(request.request_id.clone(), tx),
        )
        .await?;

    while let Some(envelope) = rx.recv().await {
        match ObjectGraphResponse::from_object(&envelope.payload) {
            Ok(response) if response.request_id == request.request_id => return Ok(response),
            Ok(_) => debug!(peer = %address, "ignoring response to another request"),
            Err(e) => debug!(peer = %address, error = %e, "ignoring malformed inventory"),
        }
    }
    Err(ExchangeError::Closed.into())
}

/// Routes inbound graph requests to a manager without keeping it alive.
struct GraphRequestHandler(Weak<DagManager>);

#[async_trait]
impl EnvelopeHandler for GraphRequestHandler {
    async fn handle(&self, envelope: Envelope) -> ExchangeResult<()> {
        let Some(manager) = self.0.upgrade() else {
            return Ok(());
        };
        manager
            .process(envelope)
            .await
            .map_err(|e| ExchangeError::Handler(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryLocalInfo, MemoryExchange, MemoryNetwork};
    use strand_object::{Metadata, PublicKey};
    use strand_store::InMemoryGraphStore;
    use strand_types::Map;

    struct Peer {
        manager: Arc<DagManager>,
        store: Arc<InMemoryGraphStore>,
        exchange: Arc<MemoryExchange>,
        info: Arc<InMemoryLocalInfo>,
    }

    fn fast_config() -> DagConfig {
        DagConfig {
            sync_timeout_ms: 2_000,
            fetch_timeout_ms: 200,
            ..DagConfig::default()
        }
    }

    fn peer(network: &Arc<MemoryNetwork>, name: &str, config: DagConfig) -> Peer {
        let store = Arc::new(InMemoryGraphStore::new());
        let exchange = MemoryExchange::connect(network, PublicKey::new(name), store.clone());
        let info = Arc::new(InMemoryLocalInfo::new());
        let manager = Arc::new(DagManager::new(
            store.clone(),
            exchange.clone(),
            info.clone(),
            config,
        ));
        Peer {
            manager,
            store,
            exchange,
            info,
        }
    }

    fn root() -> Object {
        Object::new("test/root").with_data(Map::new().with("name", "root"))
    }

    fn child(label: &str, root: &Object, parents: &[&Object]) -> Object {
        Object::new("test/child")
            .with_metadata(Metadata {
                parents: parents.iter().map(|p| p.hash().unwrap()).collect(),
                stream: Some(root.hash().unwrap()),
                ..Metadata::default()
            })
            .with_data(Map::new().with("label", label))
    }

    /// root <- a <- b, root <- c
    fn graph() -> Vec<Object> {
        let r = root();
        let a = child("a", &r, &[&r]);
        let b = child("b", &r, &[&a]);
        let c = child("c", &r, &[&r]);
        vec![r, a, b, c]
    }

    fn hash(object: &Object) -> Hash {
        object.hash().unwrap()
    }

    // ---------------------------------------------------------------
    // Put / Get
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn put_publishes_complete_graphs() {
        let network = MemoryNetwork::new();
        let p = peer(&network, "a", fast_config());
        let mut updates = p.manager.subscribe();
        let objects = graph();

        p.manager.put(&objects).await.unwrap();
        for object in &objects {
            let update = updates.recv().await.unwrap();
            assert_eq!(&update.object, object);
            assert_eq!(update.root, hash(&objects[0]));
        }
        assert!(p.info.contains(&hash(&objects[0])));
        assert_eq!(p.manager.get(&hash(&objects[2])).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn incomplete_put_is_stored_but_not_published() {
        let network = MemoryNetwork::new();
        let p = peer(&network, "a", fast_config());
        let mut updates = p.manager.subscribe();
        let objects = graph();

        let err = p.manager.put(&objects[1..2]).await.unwrap_err();
        assert!(matches!(err, DagError::IncompleteGraph(h) if h == hash(&objects[1])));
        assert!(p.store.contains(&hash(&objects[1])).unwrap());
        assert!(updates.try_recv().is_none());
        assert!(p.info.content_hashes().is_empty());

        assert!(matches!(
            p.manager.get(&hash(&objects[1])).await,
            Err(DagError::IncompleteGraph(_))
        ));
    }

    #[tokio::test]
    async fn put_is_idempotent() {
        let network = MemoryNetwork::new();
        let p = peer(&network, "a", fast_config());
        let mut updates = p.manager.subscribe();
        let r = root();

        p.manager.put(&[r.clone()]).await.unwrap();
        p.manager.put(&[r.clone()]).await.unwrap();
        assert!(updates.recv().await.is_some());
        assert!(updates.try_recv().is_none());
        assert_eq!(p.store.len(), 1);
    }

    #[tokio::test]
    async fn get_unknown_is_not_found() {
        let network = MemoryNetwork::new();
        let p = peer(&network, "a", fast_config());
        assert!(matches!(
            p.manager.get(&hash(&root())).await,
            Err(DagError::Store(StoreError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn state_machine() {
        let network = MemoryNetwork::new();
        let p = peer(&network, "a", fast_config());
        let objects = graph();
        let anchor = hash(&objects[2]);

        assert_eq!(p.manager.state(&anchor).unwrap(), GraphState::Unknown);
        let _ = p.manager.put(&objects[2..3]).await;
        assert_eq!(p.manager.state(&anchor).unwrap(), GraphState::Partial);
        let _ = p.manager.put(&objects[..1]).await;
        assert_eq!(p.manager.state(&anchor).unwrap(), GraphState::Partial);
        p.manager.put(&objects[1..2]).await.unwrap();
        assert_eq!(p.manager.state(&anchor).unwrap(), GraphState::Complete);
    }

    #[tokio::test]
    async fn tails_follow_the_frontier() {
        let network = MemoryNetwork::new();
        let p = peer(&network, "a", fast_config());
        let objects = graph();
        p.manager.put(&objects).await.unwrap();
        let tails = p.manager.tails(&hash(&objects[0])).await.unwrap();
        assert_eq!(tails.len(), 2);
        assert!(tails.contains(&objects[2]));
        assert!(tails.contains(&objects[3]));
    }

    #[tokio::test]
    async fn start_announces_heads() {
        let network = MemoryNetwork::new();
        let p = peer(&network, "a", fast_config());
        p.store.put(&root()).unwrap();
        p.manager.start().unwrap();
        assert_eq!(p.info.content_hashes(), vec![hash(&root())]);
    }

    // ---------------------------------------------------------------
    // Sync
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn sync_fetches_the_whole_graph() {
        let network = MemoryNetwork::new();
        let local = peer(&network, "local", fast_config());
        let remote = peer(&network, "remote", fast_config());
        remote.manager.start().unwrap();
        let objects = graph();
        remote.manager.put(&objects).await.unwrap();

        let mut updates = local.manager.subscribe();
        let root_hash = hash(&objects[0]);
        let synced = local
            .manager
            .sync(&root_hash, &[remote.exchange.address()], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(synced.len(), objects.len());
        assert_eq!(local.manager.state(&root_hash).unwrap(), GraphState::Complete);
        assert_eq!(local.manager.get(&root_hash).await.unwrap(), synced);
        assert!(local.info.contains(&root_hash));
        for _ in 0..objects.len() {
            assert_eq!(updates.recv().await.unwrap().root, root_hash);
        }
    }

    #[tokio::test]
    async fn sync_skips_failing_peers() {
        let network = MemoryNetwork::new();
        let local = peer(&network, "local", fast_config());
        let remote = peer(&network, "remote", fast_config());
        // Connected but never started, so it never answers graph requests.
        let silent = peer(&network, "silent", fast_config());
        remote.manager.start().unwrap();
        let objects = graph();
        remote.manager.put(&objects).await.unwrap();

        let addresses = [
            PeerAddress::new("peer:nobody"),
            silent.exchange.address(),
            remote.exchange.address(),
        ];
        let synced = local
            .manager
            .sync(&hash(&objects[0]), &addresses, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(synced.len(), objects.len());
    }

    #[tokio::test]
    async fn sync_keeps_local_objects() {
        let network = MemoryNetwork::new();
        let local = peer(&network, "local", fast_config());
        let remote = peer(&network, "remote", fast_config());
        remote.manager.start().unwrap();
        let objects = graph();
        remote.manager.put(&objects).await.unwrap();
        local.manager.put(&objects[..2]).await.unwrap();

        let synced = local
            .manager
            .sync(&hash(&objects[0]), &[remote.exchange.address()], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(synced.len(), objects.len());
    }

    #[tokio::test]
    async fn sync_of_unknown_root_finds_nothing() {
        let network = MemoryNetwork::new();
        let local = peer(&network, "local", fast_config());
        let remote = peer(&network, "remote", fast_config());
        remote.manager.start().unwrap();

        let err = local
            .manager
            .sync(&hash(&root()), &[remote.exchange.address()], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DagError::Store(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn cancelled_sync_returns_cancelled() {
        let network = MemoryNetwork::new();
        let local = peer(&network, "local", fast_config());
        let silent = peer(&network, "silent", fast_config());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = local
            .manager
            .sync(&hash(&root()), &[silent.exchange.address()], &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, DagError::Cancelled));
    }

    #[tokio::test]
    async fn sync_deadline_is_a_hard_stop() {
        let network = MemoryNetwork::new();
        let config = DagConfig {
            sync_timeout_ms: 50,
            fetch_timeout_ms: 5_000,
            ..DagConfig::default()
        };
        let local = peer(&network, "local", config);
        let silent = peer(&network, "silent", fast_config());

        let err = local
            .manager
            .sync(&hash(&root()), &[silent.exchange.address()], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DagError::Timeout));
    }

    /// Serves inventories of `objects` honestly. Object requests get an
    /// unrelated `decoy` first; peers in `liars` send nothing else.
    struct ScriptedExchange {
        key: PublicKey,
        objects: Vec<Object>,
        decoy: Object,
        liars: Vec<PeerAddress>,
    }

    fn reply(payload: Object, request_id: &str) -> Envelope {
        Envelope {
            payload,
            sender: PublicKey::new("scripted"),
            in_reply_to: Some(request_id.to_string()),
        }
    }

    #[async_trait]
    impl Exchange for ScriptedExchange {
        fn local_key(&self) -> &PublicKey {
            &self.key
        }

        async fn send(&self, object: Object, _to: &PeerAddress, options: SendOptions) -> ExchangeResult<()> {
            let request = ObjectGraphRequest::from_object(&object)?;
            let Some((id, tx)) = options.response else {
                return Ok(());
            };
            let response = ObjectGraphResponse {
                request_id: request.request_id,
                object_hashes: self.objects.iter().map(hash).collect(),
            };
            tx.send(reply(response.to_object(), &id))
                .await
                .map_err(|_| ExchangeError::Closed)
        }

        async fn request(&self, wanted: &Hash, to: &PeerAddress, options: SendOptions) -> ExchangeResult<()> {
            let Some((id, tx)) = options.response else {
                return Ok(());
            };
            tx.send(reply(self.decoy.clone(), &id))
                .await
                .map_err(|_| ExchangeError::Closed)?;
            if self.liars.contains(to) {
                return Ok(());
            }
            if let Some(object) = self.objects.iter().find(|o| &hash(o) == wanted) {
                tx.send(reply(object.clone(), &id))
                    .await
                    .map_err(|_| ExchangeError::Closed)?;
            }
            Ok(())
        }

        fn handle(&self, _object_type: &str, _handler: Arc<dyn EnvelopeHandler>) -> ExchangeResult<Registration> {
            Ok(Registration::new(|| {}))
        }
    }

    fn scripted(liars: Vec<PeerAddress>) -> (Arc<DagManager>, Arc<InMemoryGraphStore>, Object) {
        let store = Arc::new(InMemoryGraphStore::new());
        let decoy = Object::new("test/decoy").with_data(Map::new().with("label", "decoy"));
        let exchange = Arc::new(ScriptedExchange {
            key: PublicKey::new("local"),
            objects: graph(),
            decoy: decoy.clone(),
            liars,
        });
        let manager = Arc::new(DagManager::new(
            store.clone(),
            exchange,
            Arc::new(InMemoryLocalInfo::new()),
            fast_config(),
        ));
        (manager, store, decoy)
    }

    #[tokio::test]
    async fn sync_discards_mismatched_replies() {
        let (manager, store, decoy) = scripted(Vec::new());
        let root_hash = hash(&root());
        let synced = manager
            .sync(&root_hash, &[PeerAddress::new("peer:mixed")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(synced.len(), graph().len());
        assert_eq!(manager.state(&root_hash).unwrap(), GraphState::Complete);
        assert!(!store.contains(&hash(&decoy)).unwrap());
        assert_eq!(store.len(), graph().len());
    }

    #[tokio::test]
    async fn sync_retries_wrongly_answered_hashes_elsewhere() {
        let liar = PeerAddress::new("peer:liar");
        let (manager, store, decoy) = scripted(vec![liar.clone()]);
        let root_hash = hash(&root());
        let synced = manager
            .sync(
                &root_hash,
                &[liar, PeerAddress::new("peer:honest")],
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(synced.len(), graph().len());
        assert_eq!(manager.state(&root_hash).unwrap(), GraphState::Complete);
        assert!(!store.contains(&hash(&decoy)).unwrap());
    }

    #[tokio::test]
    async fn sync_with_only_wrong_replies_keeps_what_was_stored() {
        let liar = PeerAddress::new("peer:liar");
        let (manager, store, decoy) = scripted(vec![liar.clone()]);
        store.put(&root()).unwrap();
        let mut updates = manager.subscribe();

        let synced = manager
            .sync(&hash(&root()), &[liar], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(synced, vec![root()]);
        assert!(!store.contains(&hash(&decoy)).unwrap());
        assert_eq!(store.len(), 1);
        assert!(updates.try_recv().is_none());
    }

    #[tokio::test]
    async fn process_rejects_bad_selectors() {
        let network = MemoryNetwork::new();
        let p = peer(&network, "a", fast_config());
        let request = ObjectGraphRequest {
            request_id: "r".into(),
            selector: vec!["not-a-hash".into()],
        };
        let envelope = Envelope {
            payload: request.to_object(),
            sender: PublicKey::new("b"),
            in_reply_to: None,
        };
        assert!(matches!(
            p.manager.process(envelope).await,
            Err(DagError::InvalidSelector(_))
        ));

        let empty = Envelope {
            payload: ObjectGraphRequest {
                request_id: "r".into(),
                selector: Vec::new(),
            }
            .to_object(),
            sender: PublicKey::new("b"),
            in_reply_to: None,
        };
        assert!(matches!(
            p.manager.process(empty).await,
            Err(DagError::InvalidSelector(_))
        ));
    }

    #[tokio::test]
    async fn stopped_manager_does_not_answer() {
        let network = MemoryNetwork::new();
        let local = peer(&network, "local", fast_config());
        let remote = peer(&network, "remote", fast_config());
        remote.manager.start().unwrap();
        remote.manager.put(&graph()).await.unwrap();
        remote.manager.stop();

        let err = local
            .manager
            .sync(&hash(&root()), &[remote.exchange.address()], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DagError::Store(StoreError::NotFound(_))));
    }
}
