//! Wire envelope for peer-to-peer datagrams.
//!
//! A datagram carries one [`GossipPacket`], which holds at most one
//! [`Payload`]. Receivers dispatch on the payload variant; a packet with no
//! payload is a no-op. The encoding is bincode.

use super::messages::{
    DataReply, DataRequest, PrivateMessage, RumorMessage, SearchReply, SearchRequest,
    SimpleMessage, StatusDigest, TlcAck, TlcMessage,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Receive buffer size; larger datagrams are truncated by the socket.
pub const MAX_PACKET_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum PacketError {
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    #[error("Failed to encode packet: {0}")]
    Encode(String),
}

/// The single payload a packet carries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Payload {
    Simple(SimpleMessage),
    Rumor(RumorMessage),
    Status(StatusDigest),
    Private(PrivateMessage),
    DataRequest(DataRequest),
    DataReply(DataReply),
    SearchRequest(SearchRequest),
    SearchReply(SearchReply),
    Tlc(TlcMessage),
    TlcAck(TlcAck),
}

impl Payload {
    /// Short variant name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Simple(_) => "simple",
            Self::Rumor(_) => "rumor",
            Self::Status(_) => "status",
            Self::Private(_) => "private",
            Self::DataRequest(_) => "data-request",
            Self::DataReply(_) => "data-reply",
            Self::SearchRequest(_) => "search-request",
            Self::SearchReply(_) => "search-reply",
            Self::Tlc(_) => "tlc",
            Self::TlcAck(_) => "tlc-ack",
        }
    }
}

macro_rules! impl_from_payload {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Payload {
                fn from(msg: $ty) -> Self {
                    Self::$variant(msg)
                }
            }
        )*
    };
}

impl_from_payload!(
    Simple(SimpleMessage),
    Rumor(RumorMessage),
    Status(StatusDigest),
    Private(PrivateMessage),
    DataRequest(DataRequest),
    DataReply(DataReply),
    SearchRequest(SearchRequest),
    SearchReply(SearchReply),
    Tlc(TlcMessage),
    TlcAck(TlcAck),
);

/// The datagram envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GossipPacket {
    pub payload: Option<Payload>,
}

impl GossipPacket {
    /// Wrap a payload.
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            payload: Some(payload.into()),
        }
    }

    /// A packet with no payload.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Serialize to datagram bytes.
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        bincode::serialize(self).map_err(|e| PacketError::Encode(e.to_string()))
    }

    /// Parse datagram bytes.
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        bincode::deserialize(data).map_err(|e| PacketError::MalformedPacket(e.to_string()))
    }

    /// Variant name for logs ("empty" when there is no payload).
    pub fn kind(&self) -> &'static str {
        self.payload.as_ref().map(Payload::kind).unwrap_or("empty")
    }
}
