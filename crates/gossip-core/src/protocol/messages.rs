//! Payload types carried inside a [`GossipPacket`](super::GossipPacket).
//!
//! Every payload is a plain serde struct; the envelope decides which one a
//! datagram carries.

use crate::NodeName;
use serde::{Deserialize, Serialize};

/// A broadcast message relayed verbatim to every peer (simple mode).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimpleMessage {
    /// Node that first sent the message
    pub original_name: NodeName,
    /// Gossip address of the node that relayed it to us
    pub relay_peer_addr: String,
    /// Message text
    pub contents: String,
}

/// An origin-sequenced gossip message.
///
/// `(origin, id)` is unique: an origin never reuses an id. A rumor with empty
/// text is a route rumor, disseminated only so that routes to its origin get
/// learned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RumorMessage {
    /// Originating node
    pub origin: NodeName,
    /// Per-origin sequence number, starting at 1
    pub id: u32,
    /// Message text (empty for route rumors)
    pub text: String,
}

impl RumorMessage {
    /// Create a rumor.
    pub fn new(origin: NodeName, id: u32, text: impl Into<String>) -> Self {
        Self {
            origin,
            id,
            text: text.into(),
        }
    }

    /// Create a route rumor (empty text).
    pub fn route(origin: NodeName, id: u32) -> Self {
        Self::new(origin, id, String::new())
    }

    /// Whether this rumor only exists to advertise a route.
    pub fn is_route_rumor(&self) -> bool {
        self.text.is_empty()
    }
}

/// One vector-clock entry: the lowest id not yet seen from `identifier`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeerStatus {
    pub identifier: NodeName,
    pub next_id: u32,
}

impl PeerStatus {
    pub fn new(identifier: NodeName, next_id: u32) -> Self {
        Self {
            identifier,
            next_id,
        }
    }
}

/// A node's full vector clock, exchanged to reconcile knowledge.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusDigest {
    pub want: Vec<PeerStatus>,
}

impl StatusDigest {
    pub fn new(want: Vec<PeerStatus>) -> Self {
        Self { want }
    }

    /// Next expected id for `origin` according to this digest.
    pub fn next_id_for(&self, origin: &NodeName) -> Option<u32> {
        self.want
            .iter()
            .find(|status| &status.identifier == origin)
            .map(|status| status.next_id)
    }

    /// Whether this digest proves the sender has stored `rumor`.
    pub fn acknowledges(&self, rumor: &RumorMessage) -> bool {
        self.next_id_for(&rumor.origin)
            .is_some_and(|next| next > rumor.id)
    }
}

/// Point-to-point text message routed through the next-hop table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrivateMessage {
    pub origin: NodeName,
    /// Always 0: private messages are not sequenced
    pub id: u32,
    pub text: String,
    pub destination: NodeName,
    pub hop_limit: u32,
}

impl PrivateMessage {
    pub fn new(origin: NodeName, destination: NodeName, text: impl Into<String>, hop_limit: u32) -> Self {
        Self {
            origin,
            id: 0,
            text: text.into(),
            destination,
            hop_limit,
        }
    }
}

/// Request for a chunk or metafile, identified by its hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataRequest {
    pub origin: NodeName,
    pub destination: NodeName,
    pub hop_limit: u32,
    pub hash_value: Vec<u8>,
}

/// Reply to a [`DataRequest`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataReply {
    pub origin: NodeName,
    pub destination: NodeName,
    pub hop_limit: u32,
    pub hash_value: Vec<u8>,
    pub data: Vec<u8>,
}

/// Keyword search flooded with a budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchRequest {
    pub origin: NodeName,
    pub budget: u64,
    pub keywords: Vec<String>,
}

/// A file matching a search, with the chunks the replier holds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub file_name: String,
    pub metafile_hash: Vec<u8>,
    pub chunk_map: Vec<u64>,
    pub chunk_count: u64,
}

/// Reply to a [`SearchRequest`], routed back to the searcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchReply {
    pub origin: NodeName,
    pub destination: NodeName,
    pub hop_limit: u32,
    pub results: Vec<SearchResult>,
}

/// A published file: the transaction TLC agrees on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BlockPublish {
    pub name: String,
    pub size: u64,
    pub metafile_hash: Vec<u8>,
}

/// Confirmation state of a [`TlcMessage`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Confirmation {
    Unconfirmed,
    /// Committed; carries the id the transaction was first published under
    Confirmed(u32),
}

impl Confirmation {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }
}

/// A candidate or committed transaction gossiped by its origin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TlcMessage {
    pub origin: NodeName,
    pub id: u32,
    pub confirmed: Confirmation,
    pub transaction: BlockPublish,
}

impl TlcMessage {
    /// The id that identifies the transaction across its lifetime.
    ///
    /// Confirmation assigns a fresh outgoing id, so a confirmed message is
    /// keyed by the id it was originally published under.
    pub fn transaction_id(&self) -> u32 {
        match self.confirmed {
            Confirmation::Unconfirmed => self.id,
            Confirmation::Confirmed(original) => original,
        }
    }
}

/// Acknowledgment of an unconfirmed [`TlcMessage`], routed to its origin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TlcAck {
    /// The acknowledging node
    pub origin: NodeName,
    /// Id of the acknowledged transaction
    pub id: u32,
    /// Origin of the acknowledged transaction
    pub destination: NodeName,
    pub hop_limit: u32,
}

/// Payloads forwarded hop by hop towards a named destination.
pub trait Routable {
    fn destination(&self) -> &NodeName;
    fn hop_limit_mut(&mut self) -> &mut u32;
}

macro_rules! impl_routable {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Routable for $ty {
                fn destination(&self) -> &NodeName {
                    &self.destination
                }

                fn hop_limit_mut(&mut self) -> &mut u32 {
                    &mut self.hop_limit
                }
            }
        )*
    };
}

impl_routable!(PrivateMessage, DataRequest, DataReply, SearchReply, TlcAck);
