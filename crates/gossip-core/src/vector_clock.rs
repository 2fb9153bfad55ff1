//! Vector clock: per-origin "next expected id".
//!
//! The clock decides whether an incoming rumor is new, a duplicate or a gap,
//! and compares itself against a peer's [`StatusDigest`] to decide who is
//! missing what.

use crate::NodeName;
use crate::protocol::{PeerStatus, StatusDigest};
use std::collections::HashMap;

/// How an incoming rumor relates to what we have already seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Next in sequence: store it and advance the clock
    Accepted,
    /// Already seen
    Duplicate,
    /// Ahead of the next expected id for a known origin: dropped
    Gap,
    /// First contact with an origin, but not at id 1: origin registered at
    /// 1, rumor dropped
    UnknownOriginGap,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Outcome of comparing a peer's digest with our clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// We hold rumors the peer lacks; supply `origin` starting at `id`
    Push { origin: NodeName, id: u32 },
    /// The peer holds rumors we lack; send our digest
    Pull,
    /// Neither side is missing anything
    InSync,
}

/// Mapping origin → lowest id not yet seen.
#[derive(Debug, Clone, Default)]
pub struct VectorClock {
    next: HashMap<NodeName, u32>,
}

impl VectorClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next expected id for `origin`, if the origin is known.
    pub fn next_id(&self, origin: &NodeName) -> Option<u32> {
        self.next.get(origin).copied()
    }

    /// Number of known origins.
    pub fn len(&self) -> usize {
        self.next.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next.is_empty()
    }

    /// Register `origin` at id 1 if unknown.
    pub fn register(&mut self, origin: &NodeName) {
        self.next.entry(origin.clone()).or_insert(1);
    }

    /// Classify a rumor `(origin, id)` and update the clock accordingly.
    ///
    /// The clock only advances on [`Verdict::Accepted`]. An unknown origin is
    /// registered even when its first rumor is dropped.
    pub fn observe(&mut self, origin: &NodeName, id: u32) -> Verdict {
        match self.next.get_mut(origin) {
            Some(next) if *next > id => Verdict::Duplicate,
            Some(next) if *next == id => {
                *next += 1;
                Verdict::Accepted
            }
            Some(_) => Verdict::Gap,
            None if id == 1 => {
                self.next.insert(origin.clone(), 2);
                Verdict::Accepted
            }
            None => {
                self.next.insert(origin.clone(), 1);
                Verdict::UnknownOriginGap
            }
        }
    }

    /// Snapshot as a digest, sorted by origin.
    pub fn digest(&self) -> StatusDigest {
        let mut want: Vec<PeerStatus> = self
            .next
            .iter()
            .map(|(origin, next)| PeerStatus::new(origin.clone(), *next))
            .collect();
        want.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        StatusDigest::new(want)
    }

    /// Compare a peer's digest against our clock.
    ///
    /// Origins the peer knows but we don't are registered at id 1. Pushing
    /// wins over pulling; the first origin (in digest order) the peer is
    /// behind on is the one supplied. When neither side is behind on a
    /// shared origin, origins missing from the peer's digest are pushed from
    /// id 1, provided we actually hold id 1.
    pub fn reconcile(&mut self, remote: &StatusDigest) -> Reconciliation {
        let mut push: Option<(NodeName, u32)> = None;
        let mut want_theirs = false;

        for status in &remote.want {
            match self.next.get(&status.identifier) {
                None => {
                    self.next.insert(status.identifier.clone(), 1);
                    want_theirs = true;
                }
                Some(&local) if status.next_id < local => {
                    if push.is_none() {
                        push = Some((status.identifier.clone(), status.next_id.max(1)));
                    }
                }
                Some(&local) if status.next_id > local => {
                    want_theirs = true;
                }
                Some(_) => {}
            }
        }

        if push.is_none() && !want_theirs {
            let mut fresh: Vec<&NodeName> = self
                .next
                .iter()
                .filter(|(origin, next)| **next > 1 && remote.next_id_for(origin).is_none())
                .map(|(origin, _)| origin)
                .collect();
            fresh.sort();
            push = fresh.first().map(|origin| ((*origin).clone(), 1));
        }

        match push {
            Some((origin, id)) => Reconciliation::Push { origin, id },
            None if want_theirs => Reconciliation::Pull,
            None => Reconciliation::InSync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> NodeName {
        s.parse().unwrap()
    }

    fn clock_with(entries: &[(&str, u32)]) -> VectorClock {
        let mut clock = VectorClock::new();
        for (origin, next) in entries {
            clock.next.insert(name(origin), *next);
        }
        clock
    }

    fn digest(entries: &[(&str, u32)]) -> StatusDigest {
        StatusDigest::new(
            entries
                .iter()
                .map(|(origin, next)| PeerStatus::new(name(origin), *next))
                .collect(),
        )
    }

    // ==================== Acceptance rule ====================

    #[test]
    fn test_duplicate_leaves_clock_untouched() {
        let mut clock = clock_with(&[("a", 3)]);
        assert_eq!(clock.observe(&name("a"), 2), Verdict::Duplicate);
        assert_eq!(clock.next_id(&name("a")), Some(3));
    }

    #[test]
    fn test_next_in_sequence_is_accepted() {
        let mut clock = clock_with(&[("a", 3)]);
        assert_eq!(clock.observe(&name("a"), 3), Verdict::Accepted);
        assert_eq!(clock.next_id(&name("a")), Some(4));
    }

    #[test]
    fn test_future_rumor_is_dropped() {
        let mut clock = clock_with(&[("a", 3)]);
        assert_eq!(clock.observe(&name("a"), 5), Verdict::Gap);
        assert_eq!(clock.next_id(&name("a")), Some(3));
    }

    #[test]
    fn test_new_origin_first_rumor() {
        let mut clock = VectorClock::new();
        assert_eq!(clock.observe(&name("a"), 1), Verdict::Accepted);
        assert_eq!(clock.next_id(&name("a")), Some(2));
    }

    #[test]
    fn test_new_origin_with_gap_registers_at_one() {
        let mut clock = VectorClock::new();
        assert_eq!(clock.observe(&name("a"), 5), Verdict::UnknownOriginGap);
        assert_eq!(clock.next_id(&name("a")), Some(1));

        // Subsequent delivery of id 1 is accepted normally
        assert_eq!(clock.observe(&name("a"), 1), Verdict::Accepted);
        assert_eq!(clock.next_id(&name("a")), Some(2));
    }

    #[test]
    fn test_clock_never_decreases() {
        let mut clock = VectorClock::new();
        let origin = name("a");
        let mut last = 0;
        for id in [1, 1, 3, 2, 2, 7, 3, 1, 4] {
            clock.observe(&origin, id);
            let next = clock.next_id(&origin).unwrap();
            assert!(next >= last);
            last = next;
        }
        assert_eq!(last, 5);
    }

    #[test]
    fn test_digest_is_sorted() {
        let clock = clock_with(&[("c", 1), ("a", 4), ("b", 2)]);
        let names: Vec<_> = clock
            .digest()
            .want
            .into_iter()
            .map(|s| s.identifier.to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    // ==================== Reconciliation ====================

    #[test]
    fn test_push_has_priority_over_pull() {
        let mut clock = clock_with(&[("A", 3), ("B", 1)]);
        let remote = digest(&[("A", 2), ("B", 1), ("C", 1)]);

        assert_eq!(
            clock.reconcile(&remote),
            Reconciliation::Push {
                origin: name("A"),
                id: 2
            }
        );
        // C was learned from the peer's digest
        assert_eq!(clock.next_id(&name("C")), Some(1));
    }

    #[test]
    fn test_pull_when_peer_is_ahead() {
        let mut clock = clock_with(&[("A", 2)]);
        assert_eq!(clock.reconcile(&digest(&[("A", 5)])), Reconciliation::Pull);
    }

    #[test]
    fn test_unknown_origin_triggers_pull() {
        let mut clock = clock_with(&[("A", 2)]);
        assert_eq!(
            clock.reconcile(&digest(&[("A", 2), ("Z", 1)])),
            Reconciliation::Pull
        );
        assert_eq!(clock.next_id(&name("Z")), Some(1));
    }

    #[test]
    fn test_in_sync() {
        let mut clock = clock_with(&[("A", 2), ("B", 4)]);
        assert_eq!(
            clock.reconcile(&digest(&[("B", 4), ("A", 2)])),
            Reconciliation::InSync
        );
    }

    #[test]
    fn test_fresh_origin_pushed_from_one() {
        let mut clock = clock_with(&[("A", 2), ("B", 3)]);
        assert_eq!(
            clock.reconcile(&digest(&[("A", 2)])),
            Reconciliation::Push {
                origin: name("B"),
                id: 1
            }
        );
    }

    #[test]
    fn test_fresh_origin_without_content_is_not_pushed() {
        // B registered through a gap: we know of it but hold nothing
        let mut clock = clock_with(&[("A", 2), ("B", 1)]);
        assert_eq!(clock.reconcile(&digest(&[("A", 2)])), Reconciliation::InSync);
    }

    #[test]
    fn test_empty_digest_against_empty_clock() {
        let mut clock = VectorClock::new();
        assert_eq!(clock.reconcile(&StatusDigest::default()), Reconciliation::InSync);
    }

    #[test]
    fn test_zero_next_id_pushes_from_one() {
        let mut clock = clock_with(&[("A", 3)]);
        assert_eq!(
            clock.reconcile(&digest(&[("A", 0)])),
            Reconciliation::Push {
                origin: name("A"),
                id: 1
            }
        );
    }
}
