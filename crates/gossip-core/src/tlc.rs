//! Majority-ack confirmation of published transactions.
//!
//! [`Publications`] tracks our own transactions until a strict majority of
//! the population has acknowledged them. [`ObservedTlc`] remembers every
//! TLC message seen from other origins so each one is acked at most once.

use crate::NodeName;
use crate::protocol::{BlockPublish, Confirmation, TlcAck, TlcMessage};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Smallest strict majority of `population` nodes.
pub fn majority(population: usize) -> usize {
    population / 2 + 1
}

/// One of our own transactions.
#[derive(Debug, Clone)]
pub struct Publication {
    pub message: TlcMessage,
    pub acknowledgers: BTreeSet<NodeName>,
}

impl Publication {
    pub fn is_confirmed(&self) -> bool {
        self.message.confirmed.is_confirmed()
    }
}

/// Result of recording an ack against our publications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckOutcome {
    /// No publication with that id
    UnknownTransaction,
    /// Confirmed earlier; the ack changes nothing
    AlreadyConfirmed,
    /// The acknowledger was already counted
    Duplicate,
    /// Counted, majority not reached yet
    Counted { acknowledgers: usize, needed: usize },
    /// This ack reached the majority. Carries the confirmed message to send.
    Confirmed(TlcMessage),
}

/// Our own published transactions, keyed by their original id.
#[derive(Debug)]
pub struct Publications {
    local: NodeName,
    next_id: u32,
    pending: HashMap<u32, Publication>,
}

impl Publications {
    pub fn new(local: NodeName) -> Self {
        Self {
            local,
            next_id: 1,
            pending: HashMap::new(),
        }
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Wrap `transaction` as a new unconfirmed message.
    ///
    /// We count as the first acknowledger of our own transaction.
    pub fn publish(&mut self, transaction: BlockPublish) -> TlcMessage {
        let id = self.allocate_id();
        let message = TlcMessage {
            origin: self.local.clone(),
            id,
            confirmed: Confirmation::Unconfirmed,
            transaction,
        };
        self.pending.insert(
            id,
            Publication {
                message: message.clone(),
                acknowledgers: BTreeSet::from([self.local.clone()]),
            },
        );
        message
    }

    /// The message to retransmit for `id`, while it is still unconfirmed.
    pub fn pending_message(&self, id: u32) -> Option<TlcMessage> {
        self.pending
            .get(&id)
            .filter(|publication| !publication.is_confirmed())
            .map(|publication| publication.message.clone())
    }

    /// Count `ack` towards its transaction given a population of
    /// `population` nodes.
    ///
    /// Confirmation happens at most once: the threshold check and the state
    /// change happen in the same call, so a caller holding the lock around it
    /// sees exactly one [`AckOutcome::Confirmed`] per transaction.
    pub fn record_ack(&mut self, ack: &TlcAck, population: usize) -> AckOutcome {
        let needed = majority(population);
        let Some(publication) = self.pending.get_mut(&ack.id) else {
            return AckOutcome::UnknownTransaction;
        };
        if publication.is_confirmed() {
            return AckOutcome::AlreadyConfirmed;
        }
        if !publication.acknowledgers.insert(ack.origin.clone()) {
            return AckOutcome::Duplicate;
        }

        let acknowledgers = publication.acknowledgers.len();
        if acknowledgers < needed {
            return AckOutcome::Counted {
                acknowledgers,
                needed,
            };
        }

        let original = publication.message.id;
        debug!(
            "Transaction {} reached {}/{} acknowledgers",
            original, acknowledgers, needed
        );

        let id = self.allocate_id();
        // Re-borrow after allocating; the entry is known to exist
        let Some(publication) = self.pending.get_mut(&original) else {
            return AckOutcome::UnknownTransaction;
        };
        publication.message.id = id;
        publication.message.confirmed = Confirmation::Confirmed(original);
        AckOutcome::Confirmed(publication.message.clone())
    }

    /// Confirmation state of the transaction published under `id`.
    pub fn status(&self, id: u32) -> Option<Confirmation> {
        self.pending
            .get(&id)
            .map(|publication| publication.message.confirmed)
    }

    pub fn get(&self, id: u32) -> Option<&Publication> {
        self.pending.get(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// How a received TLC message relates to what we had seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// First sight of an unconfirmed transaction: ack and forward
    New,
    /// Unconfirmed transaction seen before
    Duplicate,
    /// First sight of the confirmed form: store and forward once
    Confirmed,
    /// Confirmed form seen before
    AlreadyConfirmed,
}

/// TLC messages observed from other origins, keyed by (origin, transaction).
#[derive(Debug, Default)]
pub struct ObservedTlc {
    records: HashMap<(NodeName, u32), TlcMessage>,
}

impl ObservedTlc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message`, replacing an unconfirmed copy with the confirmed one.
    pub fn observe(&mut self, message: &TlcMessage) -> Observation {
        let key = (message.origin.clone(), message.transaction_id());
        let confirmed = message.confirmed.is_confirmed();

        match self.records.get_mut(&key) {
            None => {
                self.records.insert(key, message.clone());
                if confirmed {
                    Observation::Confirmed
                } else {
                    Observation::New
                }
            }
            Some(stored) if stored.confirmed.is_confirmed() => {
                if confirmed {
                    Observation::AlreadyConfirmed
                } else {
                    // Late unconfirmed copy never downgrades a confirmed record
                    Observation::Duplicate
                }
            }
            Some(stored) => {
                if confirmed {
                    *stored = message.clone();
                    Observation::Confirmed
                } else {
                    Observation::Duplicate
                }
            }
        }
    }

    pub fn get(&self, origin: &NodeName, transaction_id: u32) -> Option<&TlcMessage> {
        self.records.get(&(origin.clone(), transaction_id))
    }

    /// All records, sorted by origin then transaction id.
    pub fn records(&self) -> Vec<TlcMessage> {
        let mut records: Vec<TlcMessage> = self.records.values().cloned().collect();
        records.sort_by(|a, b| {
            a.origin
                .cmp(&b.origin)
                .then(a.transaction_id().cmp(&b.transaction_id()))
        });
        records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
