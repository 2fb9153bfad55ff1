//! Rumor log: the vector clock together with the rumors it accounts for.
//!
//! The clock and the stored rumors change together on every accepted rumor,
//! so they live behind a single lock in the node.

use crate::NodeName;
use crate::protocol::{RumorMessage, StatusDigest};
use crate::vector_clock::{Reconciliation, VectorClock, Verdict};
use std::collections::HashMap;

/// What to do after comparing a peer's digest with the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Send this rumor to the peer
    Push(RumorMessage),
    /// Send our digest to the peer
    Pull,
    /// Nothing missing on either side
    InSync,
}

#[derive(Debug, Default)]
pub struct RumorLog {
    clock: VectorClock,
    rumors: HashMap<(NodeName, u32), RumorMessage>,
    /// Keys in arrival order
    arrival: Vec<(NodeName, u32)>,
}

impl RumorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the acceptance rule to an incoming rumor, storing it if new.
    pub fn receive(&mut self, rumor: RumorMessage) -> Verdict {
        let verdict = self.clock.observe(&rumor.origin, rumor.id);
        if verdict.is_accepted() {
            let key = (rumor.origin.clone(), rumor.id);
            self.arrival.push(key.clone());
            self.rumors.insert(key, rumor);
        }
        verdict
    }

    /// Create and store the next rumor from `origin` (ourselves).
    pub fn originate(&mut self, origin: &NodeName, text: impl Into<String>) -> RumorMessage {
        let id = self.clock.next_id(origin).unwrap_or(1);
        let rumor = RumorMessage::new(origin.clone(), id, text);
        self.receive(rumor.clone());
        rumor
    }

    /// Look up a stored rumor.
    pub fn get(&self, origin: &NodeName, id: u32) -> Option<&RumorMessage> {
        self.rumors.get(&(origin.clone(), id))
    }

    /// Next expected id for `origin`.
    pub fn next_id(&self, origin: &NodeName) -> Option<u32> {
        self.clock.next_id(origin)
    }

    /// Our current digest.
    pub fn status(&self) -> StatusDigest {
        self.clock.digest()
    }

    /// Compare a peer's digest with ours and pick the rumor to supply.
    pub fn reconcile(&mut self, remote: &StatusDigest) -> SyncAction {
        match self.clock.reconcile(remote) {
            Reconciliation::Push { origin, id } => match self.get(&origin, id) {
                Some(rumor) => SyncAction::Push(rumor.clone()),
                // Unreachable while the clock only advances on stored rumors
                None => SyncAction::Pull,
            },
            Reconciliation::Pull => SyncAction::Pull,
            Reconciliation::InSync => SyncAction::InSync,
        }
    }

    /// Chat rumors (route rumors excluded) in arrival order.
    pub fn messages(&self) -> Vec<RumorMessage> {
        self.arrival
            .iter()
            .filter_map(|key| self.rumors.get(key))
            .filter(|rumor| !rumor.is_route_rumor())
            .cloned()
            .collect()
    }

    /// Number of stored rumors, route rumors included.
    pub fn len(&self) -> usize {
        self.rumors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rumors.is_empty()
    }
}
