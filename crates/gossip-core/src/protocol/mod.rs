//! Wire protocol for gossiper datagrams.
//!
//! - Envelope and payload variants exchanged between peers
//! - Control-plane message sent by the local client

pub mod client;
pub mod envelope;
pub mod messages;

pub use client::{ClientIntent, ClientMessage};
pub use envelope::{GossipPacket, MAX_PACKET_SIZE, PacketError, Payload};
pub use messages::{
    BlockPublish, Confirmation, DataReply, DataRequest, PeerStatus, PrivateMessage, Routable,
    RumorMessage, SearchReply, SearchRequest, SearchResult, SimpleMessage, StatusDigest, TlcAck,
    TlcMessage,
};
