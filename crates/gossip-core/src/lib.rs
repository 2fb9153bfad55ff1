//! gossip-core: protocol state for an epidemic gossip node.
//!
//! This crate provides, without any async runtime:
//! - The datagram envelope and every payload it carries
//! - Vector clock, rumor log and anti-entropy reconciliation
//! - The mongering queue (one monitored push at a time)
//! - Next-hop route learning and hop-limited forwarding decisions
//! - Majority-ack confirmation of published transactions
//! - Transport and file sharing hand-off trait abstractions

pub mod handoff;
pub mod mongering;
pub mod node_name;
pub mod peers;
pub mod protocol;
pub mod routing;
pub mod rumor_log;
pub mod tlc;
pub mod transport;
pub mod vector_clock;

pub use handoff::{Collaborator, Delivery, NullCollaborator};
pub use mongering::{HeadState, MongerQueue, MongeringState};
pub use node_name::{NodeName, NodeNameError};
pub use peers::{PeerError, PeerSet};
pub use protocol::{GossipPacket, PacketError, Payload};
pub use routing::{RouteError, RouteTable};
pub use rumor_log::{RumorLog, SyncAction};
pub use tlc::{AckOutcome, Observation, ObservedTlc, Publications};
pub use transport::{Transport, TransportError};
pub use vector_clock::{Reconciliation, VectorClock, Verdict};
