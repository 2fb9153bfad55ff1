//! gossip-daemon library: the node runtime behind the `gossiper` binary.
//!
//! Exposed as a library so integration tests can drive real nodes.

pub mod config;
pub mod dispatch;
pub mod node;
pub mod rumor;
pub mod tlc;
pub mod transport;

// Re-export key types for convenience
pub use config::{Args, ConfigError, NodeConfig};
pub use node::{Gossiper, NodeHandle, launch};
pub use transport::UdpTransport;
