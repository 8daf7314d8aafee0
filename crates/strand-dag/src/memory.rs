//! In-process implementations of the collaborator traits.
//!
//! Peers on a [`MemoryNetwork`] exchange envelopes through spawned tokio
//! tasks, so delivery is asynchronous and unordered like a real network.
//! Each [`MemoryExchange`] serves [`ObjectRequest`]s straight from its
//! peer's store.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use async_trait::async_trait;
use strand_object::{FromObject, Object, PeerAddress, PublicKey, ToObject, Typed};
use strand_store::{GraphStore, StoreError};
use strand_types::Hash;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{ExchangeError, ExchangeResult};
use crate::exchange::{Discovery, Envelope, EnvelopeHandler, Exchange, LocalInfo, Registration, SendOptions};
use crate::payload::ObjectRequest;

/// Routing table connecting [`MemoryExchange`]s.
#[derive(Default)]
pub struct MemoryNetwork {
    peers: RwLock<HashMap<PeerAddress, Weak<MemoryExchange>>>,
}

impl MemoryNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Addresses of every connected peer.
    pub fn peers(&self) -> Vec<PeerAddress> {
        self.peers
            .read()
            .expect("network lock poisoned")
            .iter()
            .filter(|(_, peer)| peer.strong_count() > 0)
            .map(|(address, _)| address.clone())
            .collect()
    }

    /// Take a peer off the network. Returns whether it was connected.
    pub fn disconnect(&self, address: &PeerAddress) -> bool {
        self.peers
            .write()
            .expect("network lock poisoned")
            .remove(address)
            .is_some()
    }

    fn register(&self, exchange: &Arc<MemoryExchange>) {
        self.peers
            .write()
            .expect("network lock poisoned")
            .insert(exchange.address(), Arc::downgrade(exchange));
    }

    fn route(&self, to: &PeerAddress, envelope: Envelope) -> ExchangeResult<()> {
        let peer = self
            .peers
            .read()
            .expect("network lock poisoned")
            .get(to)
            .and_then(Weak::upgrade)
            .ok_or_else(|| ExchangeError::Unreachable(to.clone()))?;
        tokio::spawn(async move { peer.deliver(envelope).await });
        Ok(())
    }
}

impl std::fmt::Debug for MemoryNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryNetwork")
            .field("peers", &self.peers().len())
            .finish()
    }
}

type HandlerTable = HashMap<String, (u64, Arc<dyn EnvelopeHandler>)>;

/// One peer's endpoint on a [`MemoryNetwork`].
pub struct MemoryExchange {
    key: PublicKey,
    network: Arc<MemoryNetwork>,
    store: Arc<dyn GraphStore>,
    handlers: Arc<RwLock<HandlerTable>>,
    next_handler: AtomicU64,
    pending: Mutex<HashMap<String, mpsc::Sender<Envelope>>>,
}

impl MemoryExchange {
    /// Join `network` as the peer `key`, serving objects from `store`.
    pub fn connect(
        network: &Arc<MemoryNetwork>,
        key: PublicKey,
        store: Arc<dyn GraphStore>,
    ) -> Arc<Self> {
        let exchange = Arc::new(Self {
            key,
            network: network.clone(),
            store,
            handlers: Arc::new(RwLock::new(HashMap::new())),
            next_handler: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
        });
        network.register(&exchange);
        exchange
    }

    pub fn address(&self) -> PeerAddress {
        self.key.address()
    }

    async fn deliver(self: Arc<Self>, envelope: Envelope) {
        if let Some(request_id) = envelope.in_reply_to.clone() {
            self.deliver_reply(request_id, envelope).await;
            return;
        }
        if envelope.payload.object_type == ObjectRequest::TYPE {
            self.serve(envelope).await;
            return;
        }

        let handler = self
            .handlers
            .read()
            .expect("handler lock poisoned")
            .get(&envelope.payload.object_type)
            .map(|(_, handler)| handler.clone());
        match handler {
            Some(handler) => {
                let object_type = envelope.payload.object_type.clone();
                if let Err(e) = handler.handle(envelope).await {
                    warn!(peer = %self.key, object_type, error = %e, "handler failed");
                }
            }
            None => debug!(
                peer = %self.key,
                object_type = envelope.payload.object_type,
                "no handler; dropping envelope"
            ),
        }
    }

    async fn deliver_reply(&self, request_id: String, envelope: Envelope) {
        let sender = self
            .pending
            .lock()
            .expect("pending lock poisoned")
            .get(&request_id)
            .cloned();
        let Some(sender) = sender else {
            debug!(peer = %self.key, request_id, "unsolicited reply dropped");
            return;
        };
        if sender.send(envelope).await.is_err() {
            self.pending
                .lock()
                .expect("pending lock poisoned")
                .remove(&request_id);
        }
    }

    async fn serve(&self, envelope: Envelope) {
        let request = match ObjectRequest::from_object(&envelope.payload) {
            Ok(request) => request,
            Err(e) => {
                warn!(peer = %self.key, error = %e, "malformed object request");
                return;
            }
        };
        match self.store.get(&request.hash) {
            Ok(object) => {
                let to = envelope.sender.address();
                let options = SendOptions::as_response(request.request_id);
                if let Err(e) = self.send(object, &to, options).await {
                    warn!(peer = %self.key, to = %to, error = %e, "failed to serve object");
                }
            }
            Err(StoreError::NotFound(_)) => {
                debug!(peer = %self.key, hash = %request.hash.short(), "requested object not stored");
            }
            Err(e) => warn!(peer = %self.key, error = %e, "store read failed"),
        }
    }
}

#[async_trait]
impl Exchange for MemoryExchange {
    fn local_key(&self) -> &PublicKey {
        &self.key
    }

    async fn send(&self, object: Object, to: &PeerAddress, options: SendOptions) -> ExchangeResult<()> {
        if let Some((request_id, sender)) = options.response {
            let mut pending = self.pending.lock().expect("pending lock poisoned");
            pending.retain(|_, sender| !sender.is_closed());
            pending.insert(request_id, sender);
        }
        let envelope = Envelope {
            payload: object,
            sender: self.key.clone(),
            in_reply_to: options.in_reply_to,
        };
        self.network.route(to, envelope)
    }

    async fn request(&self, hash: &Hash, to: &PeerAddress, options: SendOptions) -> ExchangeResult<()> {
        let request_id = options
            .request_id()
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
        let payload = ObjectRequest {
            request_id,
            hash: hash.clone(),
        }
        .to_object();
        self.send(payload, to, options).await
    }

    fn handle(&self, object_type: &str, handler: Arc<dyn EnvelopeHandler>) -> ExchangeResult<Registration> {
        let id = self.next_handler.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .write()
            .expect("handler lock poisoned")
            .insert(object_type.to_string(), (id, handler));

        let handlers = Arc::downgrade(&self.handlers);
        let object_type = object_type.to_string();
        Ok(Registration::new(move || {
            if let Some(handlers) = handlers.upgrade() {
                let mut handlers = handlers.write().expect("handler lock poisoned");
                // A later registration for the same type replaced this one.
                if handlers.get(&object_type).is_some_and(|(current, _)| *current == id) {
                    handlers.remove(&object_type);
                }
            }
        }))
    }
}

impl std::fmt::Debug for MemoryExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryExchange")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// [`LocalInfo`] that records announced hashes.
#[derive(Debug, Default)]
pub struct InMemoryLocalInfo {
    hashes: RwLock<BTreeSet<Hash>>,
}

impl InMemoryLocalInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_hashes(&self) -> Vec<Hash> {
        self.hashes
            .read()
            .expect("local info lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.hashes
            .read()
            .expect("local info lock poisoned")
            .contains(hash)
    }
}

impl LocalInfo for InMemoryLocalInfo {
    fn add_content_hash(&self, hashes: &[Hash]) {
        self.hashes
            .write()
            .expect("local info lock poisoned")
            .extend(hashes.iter().cloned());
    }
}

/// [`Discovery`] over a fixed table.
///
/// Content without an explicit entry resolves to the fallback peers.
#[derive(Clone, Debug, Default)]
pub struct StaticDiscovery {
    by_content: HashMap<Hash, Vec<PeerAddress>>,
    fallback: Vec<PeerAddress>,
}

impl StaticDiscovery {
    pub fn new(fallback: Vec<PeerAddress>) -> Self {
        Self {
            by_content: HashMap::new(),
            fallback,
        }
    }

    pub fn with_content(mut self, hash: Hash, peers: Vec<PeerAddress>) -> Self {
        self.by_content.insert(hash, peers);
        self
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn find_by_content(&self, hash: &Hash) -> ExchangeResult<Vec<PeerAddress>> {
        Ok(self
            .by_content
            .get(hash)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}
