//! Collaborator contracts consumed by the DAG manager.
//!
//! Transport, discovery, and content announcement live outside the core.
//! [`crate::memory`] has in-process implementations of all three.

use std::sync::Arc;

use async_trait::async_trait;
use strand_object::{Object, PeerAddress, PublicKey};
use strand_types::Hash;
use tokio::sync::mpsc;

use crate::error::ExchangeResult;

/// An object received from a peer.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    pub payload: Object,
    pub sender: PublicKey,
    /// Set when this envelope answers the request with this id.
    pub in_reply_to: Option<String>,
}

/// Per-message delivery options.
#[derive(Clone, Debug, Default)]
pub struct SendOptions {
    /// Route replies tagged with this id into the channel.
    pub response: Option<(String, mpsc::Sender<Envelope>)>,
    /// Tag the outgoing envelope as a reply to this id.
    pub in_reply_to: Option<String>,
}

impl SendOptions {
    /// Deliver replies to `request_id` into `sender`.
    pub fn with_response(request_id: impl Into<String>, sender: mpsc::Sender<Envelope>) -> Self {
        Self {
            response: Some((request_id.into(), sender)),
            in_reply_to: None,
        }
    }

    /// Mark the outgoing envelope as the reply to `request_id`.
    pub fn as_response(request_id: impl Into<String>) -> Self {
        Self {
            response: None,
            in_reply_to: Some(request_id.into()),
        }
    }

    /// The correlation id this message carries, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.response.as_ref().map(|(id, _)| id.as_str())
    }
}

/// Receives envelopes of one object type.
#[async_trait]
pub trait EnvelopeHandler: Send + Sync {
    async fn handle(&self, envelope: Envelope) -> ExchangeResult<()>;
}

/// Handle for a registered [`EnvelopeHandler`].
///
/// The handler stays registered until [`Registration::unregister`] is called
/// or the registration is dropped.
pub struct Registration {
    unregister: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Registration {
    pub fn new(unregister: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            unregister: Some(Box::new(unregister)),
        }
    }

    pub fn unregister(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(unregister) = self.unregister.take() {
            unregister();
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.run();
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("active", &self.unregister.is_some())
            .finish()
    }
}

/// Message transport between peers.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// This peer's identity, used as the sender of outgoing envelopes.
    fn local_key(&self) -> &PublicKey;

    /// Send an object to a peer.
    async fn send(&self, object: Object, to: &PeerAddress, options: SendOptions) -> ExchangeResult<()>;

    /// Ask a peer for the object with `hash`. The object arrives as a reply
    /// on the channel given in `options`.
    async fn request(&self, hash: &Hash, to: &PeerAddress, options: SendOptions) -> ExchangeResult<()>;

    /// Route envelopes whose payload has type `object_type` to `handler`.
    fn handle(&self, object_type: &str, handler: Arc<dyn EnvelopeHandler>) -> ExchangeResult<Registration>;
}

/// Finds peers serving some content.
#[async_trait]
pub trait Discovery: Send + Sync {
    async fn find_by_content(&self, hash: &Hash) -> ExchangeResult<Vec<PeerAddress>>;
}

/// The local peer's discoverable content index.
pub trait LocalInfo: Send + Sync {
    /// Announce that this peer now serves `hashes`.
    fn add_content_hash(&self, hashes: &[Hash]);
}
