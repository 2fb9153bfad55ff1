//! Peer set: the gossip addresses this node talks to.
//!
//! Peers are learned from configuration, from the sender address of every
//! decoded datagram, and from relay addresses of simple messages. Addresses
//! that cannot be used as a UDP destination are rejected.

use rand::seq::IndexedRandom;
use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeerError {
    #[error("Invalid peer address: {0:?}")]
    InvalidAddress(String),
}

/// Parse one `host:port` endpoint.
///
/// Returns `None` for anything that is not a usable unicast destination
/// (unparseable, port 0, unspecified IP).
pub fn parse_peer(s: &str) -> Option<SocketAddr> {
    let addr: SocketAddr = s.trim().parse().ok()?;
    is_usable(&addr).then_some(addr)
}

/// Parse a comma-separated peer list, de-duplicated in order.
///
/// Empty entries are skipped; any invalid entry fails the whole list.
pub fn parse_peer_list(list: &str) -> Result<Vec<SocketAddr>, PeerError> {
    let mut seen = HashSet::new();
    let mut peers = Vec::new();
    for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let addr = parse_peer(entry).ok_or_else(|| PeerError::InvalidAddress(entry.to_string()))?;
        if seen.insert(addr) {
            peers.push(addr);
        }
    }
    Ok(peers)
}

fn is_usable(addr: &SocketAddr) -> bool {
    addr.port() != 0 && !addr.ip().is_unspecified()
}

/// The set of known peers, in discovery order.
#[derive(Debug, Clone)]
pub struct PeerSet {
    /// Our own gossip address, never added as a peer
    local: SocketAddr,
    peers: Vec<SocketAddr>,
}

impl PeerSet {
    pub fn new(local: SocketAddr) -> Self {
        Self {
            local,
            peers: Vec::new(),
        }
    }

    /// Create with seed peers.
    pub fn with_peers(local: SocketAddr, seeds: impl IntoIterator<Item = SocketAddr>) -> Self {
        let mut set = Self::new(local);
        for addr in seeds {
            set.add(addr);
        }
        set
    }

    /// Add a peer. Returns true if it was not known before.
    pub fn add(&mut self, addr: SocketAddr) -> bool {
        if addr == self.local || !is_usable(&addr) || self.peers.contains(&addr) {
            return false;
        }
        self.peers.push(addr);
        true
    }

    /// Parse and add a peer given as text. Returns true if newly added.
    pub fn add_str(&mut self, addr: &str) -> bool {
        parse_peer(addr).is_some_and(|addr| self.add(addr))
    }

    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.peers.contains(addr)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// All peers in discovery order.
    pub fn all(&self) -> Vec<SocketAddr> {
        self.peers.clone()
    }

    /// All peers except the given ones.
    pub fn all_except(&self, exclude: &[SocketAddr]) -> Vec<SocketAddr> {
        self.peers
            .iter()
            .filter(|addr| !exclude.contains(addr))
            .copied()
            .collect()
    }

    /// Pick a random peer.
    pub fn random(&self) -> Option<SocketAddr> {
        self.peers.choose(&mut rand::rng()).copied()
    }

    /// Pick a random peer not in `exclude`.
    pub fn random_excluding<'a>(
        &self,
        exclude: impl IntoIterator<Item = &'a SocketAddr>,
    ) -> Option<SocketAddr> {
        let exclude: HashSet<&SocketAddr> = exclude.into_iter().collect();
        let candidates: Vec<SocketAddr> = self
            .peers
            .iter()
            .filter(|addr| !exclude.contains(addr))
            .copied()
            .collect();
        candidates.choose(&mut rand::rng()).copied()
    }

    /// Comma-separated list for logs.
    pub fn display(&self) -> String {
        self.peers
            .iter()
            .map(SocketAddr::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    // ==================== Parsing ====================

    #[test]
    fn test_parse_peer_valid() {
        assert_eq!(parse_peer("127.0.0.1:5001"), Some(addr(5001)));
        assert_eq!(parse_peer(" 127.0.0.1:5001 "), Some(addr(5001)));
    }

    #[test]
    fn test_parse_peer_invalid() {
        assert_eq!(parse_peer("localhost"), None);
        assert_eq!(parse_peer("127.0.0.1"), None);
        assert_eq!(parse_peer("127.0.0.1:0"), None);
        assert_eq!(parse_peer("0.0.0.0:5000"), None);
        assert_eq!(parse_peer("300.1.1.1:5000"), None);
    }

    #[test]
    fn test_parse_peer_list_dedupes() {
        let peers = parse_peer_list("127.0.0.1:5001, 127.0.0.1:5002,127.0.0.1:5001,").unwrap();
        assert_eq!(peers, vec![addr(5001), addr(5002)]);
    }

    #[test]
    fn test_parse_peer_list_rejects_invalid() {
        assert_eq!(
            parse_peer_list("127.0.0.1:5001,nope"),
            Err(PeerError::InvalidAddress("nope".into()))
        );
        assert_eq!(parse_peer_list("").unwrap(), vec![]);
    }

    // ==================== Membership ====================

    #[test]
    fn test_add_ignores_self_and_duplicates() {
        let mut set = PeerSet::new(addr(5000));
        assert!(!set.add(addr(5000)));
        assert!(set.add(addr(5001)));
        assert!(!set.add(addr(5001)));
        assert!(!set.add(SocketAddr::from(([0, 0, 0, 0], 5002))));
        assert_eq!(set.all(), vec![addr(5001)]);
    }

    #[test]
    fn test_add_str_validates() {
        let mut set = PeerSet::new(addr(5000));
        assert!(!set.add_str("garbage"));
        assert!(set.add_str("127.0.0.1:5003"));
        assert!(set.contains(&addr(5003)));
    }

    #[test]
    fn test_random_excluding() {
        let set = PeerSet::with_peers(addr(5000), [addr(5001), addr(5002)]);
        for _ in 0..20 {
            assert_eq!(set.random_excluding(&[addr(5001)]), Some(addr(5002)));
        }
        assert_eq!(set.random_excluding(&[addr(5001), addr(5002)]), None);
        assert_eq!(PeerSet::new(addr(5000)).random(), None);
    }

    #[test]
    fn test_all_except_and_display() {
        let set = PeerSet::with_peers(addr(5000), [addr(5001), addr(5002), addr(5003)]);
        assert_eq!(set.all_except(&[addr(5002)]), vec![addr(5001), addr(5003)]);
        assert_eq!(set.display(), "127.0.0.1:5001,127.0.0.1:5002,127.0.0.1:5003");
    }
}
