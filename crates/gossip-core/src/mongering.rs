//! Rumor mongering: push a rumor to one peer and wait for its digest.
//!
//! Each push is a [`MongeringState`]. States queue in FIFO order and only
//! the head is watched: the caller polls [`MongerQueue::poll_head`] with the
//! current time and acts on what comes out.
//!
//! 1. Head acknowledged → dropped, the next state becomes head
//! 2. Head deadline passed → handed back so the caller can retry it on a
//!    peer it has not tried yet, or abandon it
//! 3. Otherwise → the caller sleeps until the head's deadline or until a
//!    digest arrives
//!
//! Acks are recorded on any queued state, so a state acknowledged while
//! queued leaves the queue as soon as it reaches the head.

use crate::protocol::{RumorMessage, StatusDigest};
use std::collections::{HashSet, VecDeque};
use std::net::SocketAddr;
use std::time::Duration;

/// Ack timeout of a single push (10 s).
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(10);

/// One in-flight push of a rumor to a peer.
#[derive(Debug, Clone)]
pub struct MongeringState {
    pub rumor: RumorMessage,
    /// Peer the rumor was pushed to
    pub target: SocketAddr,
    /// When to give up on `target` (ms)
    pub deadline_ms: u64,
    pub acknowledged: bool,
    /// Peers that must not be tried again for this rumor
    tried: HashSet<SocketAddr>,
}

impl MongeringState {
    /// Peers already tried (or excluded up front, like the rumor's sender).
    pub fn tried(&self) -> &HashSet<SocketAddr> {
        &self.tried
    }

    /// Turn an expired state into a push of the same rumor to `next`.
    pub fn retry(mut self, next: SocketAddr, now_ms: u64, timeout: Duration) -> Self {
        self.tried.insert(next);
        Self {
            rumor: self.rumor,
            target: next,
            deadline_ms: now_ms + timeout.as_millis() as u64,
            acknowledged: false,
            tried: self.tried,
        }
    }
}

/// What the head of the queue needs.
#[derive(Debug, Clone)]
pub enum HeadState {
    /// Queue empty
    Idle,
    /// Head still waiting; wake up at `deadline_ms` at the latest
    Waiting { deadline_ms: u64 },
    /// Head was acknowledged and removed
    Acknowledged(MongeringState),
    /// Head timed out and was removed
    Expired(MongeringState),
}

/// FIFO of in-flight pushes.
#[derive(Debug)]
pub struct MongerQueue {
    timeout: Duration,
    states: VecDeque<MongeringState>,
}

impl Default for MongerQueue {
    fn default() -> Self {
        Self::new(DEFAULT_ACK_TIMEOUT)
    }
}

impl MongerQueue {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            states: VecDeque::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Record a push of `rumor` to `target`.
    ///
    /// `excluded` are peers that must never be retried for this push (the
    /// rumor's sender, typically). `target` is added to them.
    pub fn start(
        &mut self,
        rumor: RumorMessage,
        target: SocketAddr,
        excluded: impl IntoIterator<Item = SocketAddr>,
        now_ms: u64,
    ) {
        let mut tried: HashSet<SocketAddr> = excluded.into_iter().collect();
        tried.insert(target);
        self.states.push_back(MongeringState {
            rumor,
            target,
            deadline_ms: now_ms + self.timeout.as_millis() as u64,
            acknowledged: false,
            tried,
        });
    }

    /// Re-queue an expired state towards a new peer.
    pub fn restart(&mut self, expired: MongeringState, next: SocketAddr, now_ms: u64) {
        self.states.push_back(expired.retry(next, now_ms, self.timeout));
    }

    /// Mark states pushed to `from` whose rumor `digest` proves received.
    ///
    /// Returns the rumors acknowledged by this digest.
    pub fn acknowledge(&mut self, from: SocketAddr, digest: &StatusDigest) -> Vec<RumorMessage> {
        let mut acked = Vec::new();
        for state in self.states.iter_mut() {
            if state.target == from && !state.acknowledged && digest.acknowledges(&state.rumor) {
                state.acknowledged = true;
                acked.push(state.rumor.clone());
            }
        }
        acked
    }

    /// Check the head of the queue at time `now_ms`.
    pub fn poll_head(&mut self, now_ms: u64) -> HeadState {
        let Some(head) = self.states.front() else {
            return HeadState::Idle;
        };

        if head.acknowledged {
            return self
                .states
                .pop_front()
                .map(HeadState::Acknowledged)
                .unwrap_or(HeadState::Idle);
        }

        if now_ms >= head.deadline_ms {
            return self
                .states
                .pop_front()
                .map(HeadState::Expired)
                .unwrap_or(HeadState::Idle);
        }

        HeadState::Waiting {
            deadline_ms: head.deadline_ms,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Targets of states still waiting for an ack.
    pub fn pending_targets(&self) -> Vec<SocketAddr> {
        self.states
            .iter()
            .filter(|state| !state.acknowledged)
            .map(|state| state.target)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeName;
    use crate::peers::PeerSet;
    use crate::protocol::PeerStatus;

    fn name(s: &str) -> NodeName {
        s.parse().unwrap()
    }

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn rumor(id: u32) -> RumorMessage {
        RumorMessage::new(name("a"), id, format!("m{id}"))
    }

    fn ack_for(id: u32) -> StatusDigest {
        StatusDigest::new(vec![PeerStatus::new(name("a"), id + 1)])
    }

    fn queue() -> MongerQueue {
        MongerQueue::new(Duration::from_millis(10_000))
    }

    // ==================== Head monitoring ====================

    #[test]
    fn test_idle_when_empty() {
        assert!(matches!(queue().poll_head(0), HeadState::Idle));
    }

    #[test]
    fn test_waiting_until_deadline() {
        let mut q = queue();
        q.start(rumor(1), addr(5001), [], 1_000);

        match q.poll_head(5_000) {
            HeadState::Waiting { deadline_ms } => assert_eq!(deadline_ms, 11_000),
            other => panic!("Expected Waiting, got {:?}", other),
        }
        assert!(matches!(q.poll_head(11_000), HeadState::Expired(_)));
        assert!(q.is_empty());
    }

    #[test]
    fn test_ack_from_target_completes_head() {
        let mut q = queue();
        q.start(rumor(1), addr(5001), [], 0);

        let acked = q.acknowledge(addr(5001), &ack_for(1));
        assert_eq!(acked, vec![rumor(1)]);

        match q.poll_head(1) {
            HeadState::Acknowledged(state) => assert_eq!(state.target, addr(5001)),
            other => panic!("Expected Acknowledged, got {:?}", other),
        }
        assert!(matches!(q.poll_head(1), HeadState::Idle));
    }

    #[test]
    fn test_ack_from_other_peer_ignored() {
        let mut q = queue();
        q.start(rumor(1), addr(5001), [], 0);

        assert!(q.acknowledge(addr(5002), &ack_for(1)).is_empty());
        assert!(q.acknowledge(addr(5001), &ack_for(0)).is_empty());
        assert!(matches!(q.poll_head(1), HeadState::Waiting { .. }));
    }

    #[test]
    fn test_ack_is_reported_once() {
        let mut q = queue();
        q.start(rumor(1), addr(5001), [], 0);
        assert_eq!(q.acknowledge(addr(5001), &ack_for(1)).len(), 1);
        assert!(q.acknowledge(addr(5001), &ack_for(1)).is_empty());
    }

    #[test]
    fn test_only_head_times_out() {
        let mut q = queue();
        q.start(rumor(1), addr(5001), [], 0);
        q.start(rumor(2), addr(5002), [], 0);

        // Both deadlines passed, but states leave one at a time in order
        match q.poll_head(20_000) {
            HeadState::Expired(state) => assert_eq!(state.rumor.id, 1),
            other => panic!("Expected Expired, got {:?}", other),
        }
        assert_eq!(q.len(), 1);
        match q.poll_head(20_000) {
            HeadState::Expired(state) => assert_eq!(state.rumor.id, 2),
            other => panic!("Expected Expired, got {:?}", other),
        }
    }

    #[test]
    fn test_queued_ack_surfaces_when_reaching_head() {
        let mut q = queue();
        q.start(rumor(1), addr(5001), [], 0);
        q.start(rumor(2), addr(5002), [], 0);
        q.acknowledge(addr(5002), &ack_for(2));

        assert_eq!(q.pending_targets(), vec![addr(5001)]);
        assert!(matches!(q.poll_head(10), HeadState::Waiting { .. }));
        assert!(matches!(q.poll_head(10_000), HeadState::Expired(_)));
        assert!(matches!(q.poll_head(10_000), HeadState::Acknowledged(_)));
    }

    // ==================== Retry ====================

    #[test]
    fn test_retry_gets_fresh_deadline() {
        let mut q = queue();
        q.start(rumor(1), addr(5001), [addr(5009)], 0);
        let HeadState::Expired(state) = q.poll_head(10_000) else {
            panic!("Expected Expired");
        };

        q.restart(state, addr(5002), 10_000);
        match q.poll_head(10_001) {
            HeadState::Waiting { deadline_ms } => assert_eq!(deadline_ms, 20_000),
            other => panic!("Expected Waiting, got {:?}", other),
        }
    }

    #[test]
    fn test_unacknowledged_rumor_tries_each_peer_once() {
        let peers = PeerSet::with_peers(addr(5000), (5001..=5004).map(addr));
        let mut q = queue();
        let mut now = 0;

        let first = peers.random().unwrap();
        q.start(rumor(1), first, [], now);

        let mut resends = 0;
        let mut targets = vec![first];
        loop {
            now += 10_000;
            let HeadState::Expired(state) = q.poll_head(now) else {
                panic!("Expected Expired");
            };
            match peers.random_excluding(state.tried()) {
                Some(next) => {
                    resends += 1;
                    targets.push(next);
                    q.restart(state, next, now);
                }
                None => break,
            }
        }

        assert_eq!(resends, peers.len() - 1);
        targets.sort();
        targets.dedup();
        assert_eq!(targets.len(), peers.len());
        assert!(q.is_empty());
    }

    #[test]
    fn test_excluded_sender_never_retried() {
        let peers = PeerSet::with_peers(addr(5000), [addr(5001), addr(5002)]);
        let mut q = queue();
        q.start(rumor(1), addr(5002), [addr(5001)], 0);

        let HeadState::Expired(state) = q.poll_head(10_000) else {
            panic!("Expected Expired");
        };
        assert_eq!(peers.random_excluding(state.tried()), None);
    }
}
