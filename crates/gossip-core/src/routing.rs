//! Next-hop route table learned from rumor traffic (DSDV style).
//!
//! Whenever a rumor from origin O is accepted from sender address A, A
//! becomes the next hop towards O. Entries remember the rumor id that set
//! them and are only replaced by strictly newer ids, so a reordered or
//! duplicate delivery can never roll a route back.
//!
//! Transaction gossip carries no rumor id, so it only fills a missing entry
//! with the reverse path at sequence 0. The first accepted rumor from that
//! origin replaces it.

use crate::NodeName;
use crate::protocol::Routable;
use std::collections::HashMap;
use std::net::SocketAddr;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("No route to {0}")]
    NoRoute(NodeName),

    #[error("Hop limit exhausted for {0}")]
    HopLimitExhausted(NodeName),
}

/// Rumor ids start at 1, so any accepted rumor outranks a reverse path.
const REVERSE_PATH_SEQUENCE: u32 = 0;

/// A learned route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    pub next_hop: SocketAddr,
    /// Id of the rumor that set this entry
    pub sequence: u32,
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    local: NodeName,
    entries: HashMap<NodeName, RouteEntry>,
}

impl RouteTable {
    pub fn new(local: NodeName) -> Self {
        Self {
            local,
            entries: HashMap::new(),
        }
    }

    /// Record that rumor `(origin, sequence)` arrived from `from`.
    ///
    /// Returns true if the table changed. Routes to ourselves are never
    /// recorded.
    pub fn learn(&mut self, origin: &NodeName, sequence: u32, from: SocketAddr) -> bool {
        if *origin == self.local {
            return false;
        }

        match self.entries.get_mut(origin) {
            Some(entry) if entry.sequence >= sequence => {
                debug!(
                    "Keeping route to {} via {} (seq {} >= {})",
                    origin, entry.next_hop, entry.sequence, sequence
                );
                false
            }
            Some(entry) => {
                entry.next_hop = from;
                entry.sequence = sequence;
                true
            }
            None => {
                self.entries.insert(
                    origin.clone(),
                    RouteEntry {
                        next_hop: from,
                        sequence,
                    },
                );
                true
            }
        }
    }

    /// Record that traffic from `origin` arrived from `from` without a rumor
    /// id. Only fills a missing entry.
    pub fn learn_reverse_path(&mut self, origin: &NodeName, from: SocketAddr) -> bool {
        self.learn(origin, REVERSE_PATH_SEQUENCE, from)
    }

    pub fn get(&self, origin: &NodeName) -> Option<&RouteEntry> {
        self.entries.get(origin)
    }

    pub fn next_hop(&self, origin: &NodeName) -> Option<SocketAddr> {
        self.entries.get(origin).map(|entry| entry.next_hop)
    }

    /// Known destinations, sorted.
    pub fn origins(&self) -> Vec<NodeName> {
        let mut origins: Vec<NodeName> = self.entries.keys().cloned().collect();
        origins.sort();
        origins
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Prepare `payload` for the next hop towards its destination.
    ///
    /// Looks up the next hop, then spends one hop. A payload whose hop limit
    /// is already 0 is left untouched and rejected.
    pub fn route<R: Routable>(&self, payload: &mut R) -> Result<SocketAddr, RouteError> {
        let destination = payload.destination();
        let next_hop = self
            .next_hop(destination)
            .ok_or_else(|| RouteError::NoRoute(destination.clone()))?;

        if *payload.hop_limit_mut() == 0 {
            return Err(RouteError::HopLimitExhausted(payload.destination().clone()));
        }
        *payload.hop_limit_mut() -= 1;
        Ok(next_hop)
    }
}
