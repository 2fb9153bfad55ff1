//! Rumor mongering, anti-entropy and route rumors.

use crate::node::{Gossiper, lock, shutdown_requested};
use gossip_core::protocol::{RumorMessage, StatusDigest};
use gossip_core::{HeadState, MongeringState, SyncAction};
use rand::Rng;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

fn describe(digest: &StatusDigest) -> String {
    digest
        .want
        .iter()
        .map(|status| format!("peer {} nextID {}", status.identifier, status.next_id))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Gossiper {
    /// Originate a chat rumor and start mongering it.
    pub async fn broadcast_rumor(&self, text: impl Into<String>) -> RumorMessage {
        let rumor = lock(&self.rumors).originate(&self.name, text);
        self.monger(rumor.clone(), &[]).await;
        rumor
    }

    /// Originate a route rumor (empty text) and start mongering it.
    pub async fn send_route_rumor(&self) -> RumorMessage {
        let rumor = lock(&self.rumors).originate(&self.name, "");
        debug!("Route rumor {} from {}", rumor.id, self.name);
        self.monger(rumor.clone(), &[]).await;
        rumor
    }

    pub(crate) async fn handle_rumor(&self, rumor: RumorMessage, from: SocketAddr) {
        if !rumor.is_route_rumor() {
            info!(
                "RUMOR origin {} from {} ID {} contents {}",
                rumor.origin, from, rumor.id, rumor.text
            );
        }

        let verdict = lock(&self.rumors).receive(rumor.clone());
        if verdict.is_accepted() {
            let learned = lock(&self.routes).learn(&rumor.origin, rumor.id, from);
            if learned {
                info!("DSDV {} {}", rumor.origin, from);
            }
            self.monger(rumor, &[from]).await;
        } else {
            debug!(
                "Rumor {}:{} from {} not stored ({:?})",
                rumor.origin, rumor.id, from, verdict
            );
        }

        // Every rumor is answered with our digest, accepted or not
        let status = self.status();
        self.send(status, from).await;
    }

    /// Push `rumor` to a random peer outside `exclude` and watch for its ack.
    ///
    /// Returns the chosen peer.
    pub(crate) async fn monger(
        &self,
        rumor: RumorMessage,
        exclude: &[SocketAddr],
    ) -> Option<SocketAddr> {
        let target = lock(&self.peers).random_excluding(exclude);
        let Some(target) = target else {
            debug!("No peer to monger {}:{} with", rumor.origin, rumor.id);
            return None;
        };

        info!("MONGERING with {}", target);
        // Queued before sending so a fast ack cannot be missed
        lock(&self.mongering).start(
            rumor.clone(),
            target,
            exclude.iter().copied(),
            self.now_ms(),
        );
        self.monger_wake.notify_one();
        self.send(rumor, target).await;
        Some(target)
    }

    /// Resend an unacknowledged rumor to a peer not tried yet.
    async fn retry(&self, expired: MongeringState) {
        let next = lock(&self.peers).random_excluding(expired.tried());
        let Some(next) = next else {
            debug!(
                "Giving up on rumor {}:{}, every peer tried",
                expired.rumor.origin, expired.rumor.id
            );
            return;
        };

        info!("MONGERING with {}", next);
        let rumor = expired.rumor.clone();
        lock(&self.mongering).restart(expired, next, self.now_ms());
        self.monger_wake.notify_one();
        self.send(rumor, next).await;
    }

    /// Watch the head of the mongering queue until shutdown.
    pub async fn run_monger_monitor(self: Arc<Self>) {
        let mut shutdown = self.shutdown.clone();
        loop {
            let head = lock(&self.mongering).poll_head(self.now_ms());
            match head {
                HeadState::Idle => {
                    tokio::select! {
                        _ = self.monger_wake.notified() => {}
                        _ = shutdown_requested(&mut shutdown) => break,
                    }
                }
                HeadState::Waiting { deadline_ms } => {
                    let wait = Duration::from_millis(deadline_ms.saturating_sub(self.now_ms()));
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = self.monger_wake.notified() => {}
                        _ = shutdown_requested(&mut shutdown) => break,
                    }
                }
                HeadState::Acknowledged(state) => {
                    debug!(
                        "Rumor {}:{} acknowledged by {}",
                        state.rumor.origin, state.rumor.id, state.target
                    );
                }
                HeadState::Expired(state) => {
                    debug!(
                        "Rumor {}:{} timed out on {}",
                        state.rumor.origin, state.rumor.id, state.target
                    );
                    self.retry(state).await;
                }
            }
        }
        debug!("Mongering monitor stopped");
    }

    pub(crate) async fn handle_status(&self, digest: StatusDigest, from: SocketAddr) {
        info!("STATUS from {} {}", from, describe(&digest));

        let acked = lock(&self.mongering).acknowledge(from, &digest);
        if !acked.is_empty() {
            self.monger_wake.notify_one();
        }

        let action = lock(&self.rumors).reconcile(&digest);
        match action {
            SyncAction::Push(rumor) => {
                debug!("Supplying {}:{} to {}", rumor.origin, rumor.id, from);
                self.send(rumor, from).await;
            }
            SyncAction::Pull => {
                let status = self.status();
                self.send(status, from).await;
            }
            SyncAction::InSync => {
                info!("IN SYNC WITH {}", from);
                for rumor in acked {
                    let heads = rand::rng().random_bool(0.5);
                    if !heads {
                        continue;
                    }
                    if let Some(next) = self.monger(rumor, &[from]).await {
                        info!("FLIPPED COIN sending rumor to {}", next);
                    }
                }
            }
        }
    }

    /// Send our digest to a random peer every anti-entropy interval.
    ///
    /// A zero interval keeps the task parked until shutdown.
    pub async fn run_anti_entropy(self: Arc<Self>) {
        let mut shutdown = self.shutdown.clone();
        let period = self.config.anti_entropy;
        if period.is_zero() {
            shutdown_requested(&mut shutdown).await;
            return;
        }

        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let status = self.status();
                    if let Some(target) = self.send_to_random(status, &[]).await {
                        debug!("Anti-entropy digest sent to {}", target);
                    }
                }
                _ = shutdown_requested(&mut shutdown) => break,
            }
        }
        debug!("Anti-entropy stopped");
    }

    /// Originate a route rumor at startup and then every route interval.
    pub async fn run_route_rumors(self: Arc<Self>) {
        let mut shutdown = self.shutdown.clone();
        let period = self.config.route_rumor;
        if period.is_zero() {
            return;
        }

        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.send_route_rumor().await;
                }
                _ = shutdown_requested(&mut shutdown) => break,
            }
        }
        debug!("Route rumors stopped");
    }
}
