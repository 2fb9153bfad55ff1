//! Transaction publication and majority confirmation.

use crate::node::{Gossiper, lock, shutdown_requested};
use gossip_core::protocol::{BlockPublish, TlcAck, TlcMessage};
use gossip_core::{AckOutcome, Observation};
use rand::Rng;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

fn describe(message: &TlcMessage) -> String {
    format!(
        "origin {} ID {} file name {} size {} metahash {}",
        message.origin,
        message.id,
        message.transaction.name,
        message.transaction.size,
        hex::encode(&message.transaction.metafile_hash)
    )
}

impl Gossiper {
    /// Population the confirmation majority is computed over.
    pub fn population(&self) -> usize {
        match self.config.network_size {
            Some(size) => size,
            None => lock(&self.peers).len() + 1,
        }
    }

    /// Publish `transaction` and retransmit it until a majority acks it.
    pub fn publish_transaction(self: &Arc<Self>, transaction: BlockPublish) -> TlcMessage {
        let message = lock(&self.publications).publish(transaction);
        info!("UNCONFIRMED GOSSIP {}", describe(&message));
        self.spawn_stubborn(message.id);
        message
    }

    fn spawn_stubborn(self: &Arc<Self>, id: u32) {
        let node = Arc::clone(self);
        tokio::spawn(async move { node.run_stubborn(id).await });
    }

    /// Send the pending message to a random peer every stubborn interval,
    /// until it is confirmed or the node shuts down.
    async fn run_stubborn(self: Arc<Self>, id: u32) {
        let mut shutdown = self.shutdown.clone();
        loop {
            let pending = lock(&self.publications).pending_message(id);
            let Some(message) = pending else {
                debug!("Transaction {} confirmed, stopping retransmission", id);
                break;
            };
            self.send_to_random(message, &[]).await;

            tokio::select! {
                _ = tokio::time::sleep(self.config.stubborn_timeout) => {}
                _ = shutdown_requested(&mut shutdown) => break,
            }
        }
    }

    pub(crate) async fn handle_tlc(&self, message: TlcMessage, from: SocketAddr) {
        if message.origin == self.name {
            debug!("Ignoring our own transaction {} from {}", message.id, from);
            return;
        }

        // Acks go back to the origin, which may never have sent us a rumor
        let learned = lock(&self.routes).learn_reverse_path(&message.origin, from);
        if learned {
            info!("DSDV {} {}", message.origin, from);
        }

        let observation = lock(&self.observed).observe(&message);
        match observation {
            Observation::New => {
                info!("UNCONFIRMED GOSSIP {}", describe(&message));
                let ack = TlcAck {
                    origin: self.name.clone(),
                    id: message.id,
                    destination: message.origin.clone(),
                    hop_limit: self.config.hop_limit,
                };
                self.send_to_random(message, &[from]).await;
                info!("SENDING ACK origin {} ID {}", ack.destination, ack.id);
                self.relay(ack).await;
            }
            Observation::Duplicate => {
                let heads = rand::rng().random_bool(0.5);
                if heads {
                    self.send_to_random(message, &[from]).await;
                }
            }
            Observation::Confirmed => {
                info!("CONFIRMED GOSSIP {}", describe(&message));
                self.send_to_random(message, &[from]).await;
            }
            Observation::AlreadyConfirmed => {
                debug!(
                    "Already confirmed {}:{}",
                    message.origin,
                    message.transaction_id()
                );
            }
        }
    }

    pub(crate) async fn handle_tlc_ack(&self, ack: TlcAck) {
        if ack.destination != self.name {
            self.relay(ack).await;
            return;
        }

        let population = self.population();
        let outcome = lock(&self.publications).record_ack(&ack, population);
        match outcome {
            AckOutcome::Confirmed(message) => {
                let original = message.transaction_id();
                let witnesses = lock(&self.publications)
                    .get(original)
                    .map(|publication| {
                        publication
                            .acknowledgers
                            .iter()
                            .map(|name| name.to_string())
                            .collect::<Vec<_>>()
                            .join(",")
                    })
                    .unwrap_or_default();
                info!("RE-BROADCAST ID {} WITNESSES {}", original, witnesses);
                self.send_to_random(message, &[]).await;
            }
            AckOutcome::Counted {
                acknowledgers,
                needed,
            } => {
                debug!(
                    "Ack from {} for {}: {}/{}",
                    ack.origin, ack.id, acknowledgers, needed
                );
            }
            other => debug!("Ack from {} for {}: {:?}", ack.origin, ack.id, other),
        }
    }
}
