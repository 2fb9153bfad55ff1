//! Command line arguments and validated node configuration.

use clap::Parser;
use gossip_core::peers::{PeerError, parse_peer_list};
use gossip_core::{NodeName, NodeNameError};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;

/// Ack timeout of a mongered rumor.
pub const ACK_TIMEOUT: Duration = Duration::from_secs(10);
/// Default hop limit of point-to-point payloads.
pub const DEFAULT_HOP_LIMIT: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid node name: {0}")]
    InvalidName(#[from] NodeNameError),

    #[error("Invalid gossip address {0:?}")]
    InvalidAddress(String),

    #[error("Invalid peer list: {0}")]
    InvalidPeers(#[from] PeerError),

    #[error("Network size must be at least 1")]
    InvalidNetworkSize,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "gossiper")]
#[command(about = "Epidemic gossip node")]
pub struct Args {
    /// Port the local client sends requests to (on 127.0.0.1)
    #[arg(long, default_value_t = 8080)]
    pub ui_port: u16,

    /// Address to exchange gossip on
    #[arg(long, default_value = "127.0.0.1:5000")]
    pub gossip_addr: String,

    /// Name of this node
    #[arg(long)]
    pub name: String,

    /// Comma separated list of peers (ip:port)
    #[arg(long, default_value = "")]
    pub peers: String,

    /// Relay every message to every peer instead of mongering rumors
    #[arg(long)]
    pub simple: bool,

    /// Seconds between anti-entropy digests (0 disables them)
    #[arg(long = "antiEntropy", default_value_t = 10)]
    pub anti_entropy: u64,

    /// Seconds between route rumors (0 disables them)
    #[arg(long, default_value_t = 0)]
    pub rtimer: u64,

    /// Number of nodes in the network, used for the confirmation majority
    #[arg(long)]
    pub network_size: Option<usize>,

    /// Seconds between retransmissions of an unconfirmed transaction
    #[arg(long, default_value_t = 5)]
    pub stubborn_timeout: u64,

    /// Hop limit of point-to-point payloads
    #[arg(long, default_value_t = DEFAULT_HOP_LIMIT)]
    pub hop_limit: u32,

    /// Enable verbose logging
    #[arg(long)]
    pub verbose: bool,
}

/// Everything a node needs to start.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub name: NodeName,
    /// Gossip socket; port 0 picks a free one
    pub gossip_addr: SocketAddr,
    /// Client socket, if any
    pub ui_addr: Option<SocketAddr>,
    /// Seed peers, de-duplicated, own address removed
    pub peers: Vec<SocketAddr>,
    pub simple: bool,
    /// Zero disables periodic digests
    pub anti_entropy: Duration,
    /// Zero disables route rumors
    pub route_rumor: Duration,
    pub ack_timeout: Duration,
    pub stubborn_timeout: Duration,
    pub hop_limit: u32,
    /// Fixed confirmation population; known peers + 1 when unset
    pub network_size: Option<usize>,
}

impl NodeConfig {
    /// A rumor-mongering node with default timings and no client socket.
    pub fn new(name: NodeName, gossip_addr: SocketAddr) -> Self {
        Self {
            name,
            gossip_addr,
            ui_addr: None,
            peers: Vec::new(),
            simple: false,
            anti_entropy: Duration::from_secs(10),
            route_rumor: Duration::ZERO,
            ack_timeout: ACK_TIMEOUT,
            stubborn_timeout: Duration::from_secs(5),
            hop_limit: DEFAULT_HOP_LIMIT,
            network_size: None,
        }
    }

    pub fn with_peers(mut self, peers: impl IntoIterator<Item = SocketAddr>) -> Self {
        let gossip_addr = self.gossip_addr;
        self.peers = peers.into_iter().filter(|p| *p != gossip_addr).collect();
        self
    }

    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let name: NodeName = args.name.parse()?;
        let gossip_addr: SocketAddr = args
            .gossip_addr
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(args.gossip_addr.clone()))?;
        if args.network_size == Some(0) {
            return Err(ConfigError::InvalidNetworkSize);
        }
        let peers = parse_peer_list(&args.peers)?;

        let mut config = Self::new(name, gossip_addr).with_peers(peers);
        config.ui_addr = Some(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            args.ui_port,
        ));
        config.simple = args.simple;
        config.anti_entropy = Duration::from_secs(args.anti_entropy);
        config.route_rumor = Duration::from_secs(args.rtimer);
        config.stubborn_timeout = Duration::from_secs(args.stubborn_timeout);
        config.hop_limit = args.hop_limit;
        config.network_size = args.network_size;
        Ok(config)
    }
}

impl TryFrom<&Args> for NodeConfig {
    type Error = ConfigError;

    fn try_from(args: &Args) -> Result<Self, Self::Error> {
        Self::from_args(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("gossiper").chain(argv.iter().copied())).unwrap()
    }

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["--name", "alice"]);
        let config = NodeConfig::from_args(&args).unwrap();

        assert_eq!(config.name.as_str(), "alice");
        assert_eq!(config.gossip_addr, addr(5000));
        assert_eq!(config.ui_addr, Some(addr(8080)));
        assert!(config.peers.is_empty());
        assert!(!config.simple);
        assert_eq!(config.anti_entropy, Duration::from_secs(10));
        assert_eq!(config.route_rumor, Duration::ZERO);
        assert_eq!(config.ack_timeout, Duration::from_secs(10));
        assert_eq!(config.stubborn_timeout, Duration::from_secs(5));
        assert_eq!(config.hop_limit, 10);
        assert_eq!(config.network_size, None);
    }

    #[test]
    fn test_all_flags() {
        let args = parse(&[
            "--name",
            "bob",
            "--gossip-addr",
            "127.0.0.1:5001",
            "--ui-port",
            "8081",
            "--peers",
            "127.0.0.1:5002,127.0.0.1:5001,127.0.0.1:5002",
            "--simple",
            "--antiEntropy",
            "0",
            "--rtimer",
            "3",
            "--network-size",
            "5",
            "--stubborn-timeout",
            "2",
            "--hop-limit",
            "4",
        ]);
        let config = NodeConfig::try_from(&args).unwrap();

        // Duplicates and our own address are dropped
        assert_eq!(config.peers, vec![addr(5002)]);
        assert_eq!(config.ui_addr, Some(addr(8081)));
        assert!(config.simple);
        assert!(config.anti_entropy.is_zero());
        assert_eq!(config.route_rumor, Duration::from_secs(3));
        assert_eq!(config.network_size, Some(5));
        assert_eq!(config.stubborn_timeout, Duration::from_secs(2));
        assert_eq!(config.hop_limit, 4);
    }

    #[test]
    fn test_name_is_required() {
        assert!(Args::try_parse_from(["gossiper"]).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_name = parse(&["--name", "two words"]);
        assert!(matches!(
            NodeConfig::from_args(&bad_name),
            Err(ConfigError::InvalidName(_))
        ));

        let bad_addr = parse(&["--name", "a", "--gossip-addr", "nowhere"]);
        assert!(matches!(
            NodeConfig::from_args(&bad_addr),
            Err(ConfigError::InvalidAddress(_))
        ));

        let bad_peers = parse(&["--name", "a", "--peers", "127.0.0.1:1,oops"]);
        assert!(matches!(
            NodeConfig::from_args(&bad_peers),
            Err(ConfigError::InvalidPeers(_))
        ));

        let bad_size = parse(&["--name", "a", "--network-size", "0"]);
        assert!(matches!(
            NodeConfig::from_args(&bad_size),
            Err(ConfigError::InvalidNetworkSize)
        ));
    }
}
