//! The gossiper: process-wide node state and its long-running tasks.
//!
//! Each shared structure sits behind its own lock. Critical sections touch a
//! single structure, copy out what they need and release before any network
//! I/O, so no two locks are ever held at once.

use crate::config::NodeConfig;
use crate::transport::UdpTransport;
use gossip_core::protocol::{Confirmation, GossipPacket, Payload, PrivateMessage, RumorMessage};
use gossip_core::protocol::{StatusDigest, TlcMessage};
use gossip_core::transport::TransportError;
use gossip_core::{
    Collaborator, MongerQueue, NodeName, ObservedTlc, PeerSet, Publications, RouteTable, RumorLog,
    Transport,
};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Acquire `mutex`, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Resolve once shutdown has been requested (or the handle is gone).
pub(crate) async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

pub struct Gossiper {
    pub(crate) name: NodeName,
    pub(crate) address: SocketAddr,
    pub(crate) config: NodeConfig,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) collaborator: Arc<dyn Collaborator>,

    pub(crate) peers: Mutex<PeerSet>,
    pub(crate) rumors: Mutex<RumorLog>,
    pub(crate) routes: Mutex<RouteTable>,
    pub(crate) mongering: Mutex<MongerQueue>,
    pub(crate) publications: Mutex<Publications>,
    pub(crate) observed: Mutex<ObservedTlc>,
    pub(crate) private_inbox: Mutex<Vec<PrivateMessage>>,

    /// Wakes the mongering monitor when a push starts or an ack lands
    pub(crate) monger_wake: Notify,
    pub(crate) started: Instant,
    pub(crate) shutdown: watch::Receiver<bool>,
}

impl Gossiper {
    /// Build the node state on top of an already bound transport.
    ///
    /// No task is started; [`launch`] does that.
    pub fn new(
        config: NodeConfig,
        transport: Arc<dyn Transport>,
        collaborator: Arc<dyn Collaborator>,
        shutdown: watch::Receiver<bool>,
    ) -> Arc<Self> {
        let address = transport.local_addr();
        let name = config.name.clone();
        let peers = PeerSet::with_peers(address, config.peers.iter().copied());
        Arc::new(Self {
            address,
            transport,
            collaborator,
            peers: Mutex::new(peers),
            rumors: Mutex::new(RumorLog::new()),
            routes: Mutex::new(RouteTable::new(name.clone())),
            mongering: Mutex::new(MongerQueue::new(config.ack_timeout)),
            publications: Mutex::new(Publications::new(name.clone())),
            observed: Mutex::new(ObservedTlc::new()),
            private_inbox: Mutex::new(Vec::new()),
            monger_wake: Notify::new(),
            started: Instant::now(),
            shutdown,
            name,
            config,
        })
    }

    pub(crate) fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    // ==================== Accessors ====================

    pub fn name(&self) -> &NodeName {
        &self.name
    }

    /// Gossip address peers reach us on.
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn peers(&self) -> Vec<SocketAddr> {
        lock(&self.peers).all()
    }

    /// Add a peer, logging the new peer list when it changes.
    pub fn add_peer(&self, addr: SocketAddr) -> bool {
        let listing = {
            let mut peers = lock(&self.peers);
            peers.add(addr).then(|| peers.display())
        };
        match listing {
            Some(listing) => {
                info!("PEERS {}", listing);
                true
            }
            None => false,
        }
    }

    /// Current vector clock digest.
    pub fn status(&self) -> StatusDigest {
        lock(&self.rumors).status()
    }

    /// Chat rumors in arrival order, route rumors excluded.
    pub fn rumors(&self) -> Vec<RumorMessage> {
        lock(&self.rumors).messages()
    }

    /// Point-to-point messages delivered to us.
    pub fn private_messages(&self) -> Vec<PrivateMessage> {
        lock(&self.private_inbox).clone()
    }

    /// Destinations with a known next hop.
    pub fn route_origins(&self) -> Vec<NodeName> {
        lock(&self.routes).origins()
    }

    pub fn next_hop(&self, origin: &NodeName) -> Option<SocketAddr> {
        lock(&self.routes).next_hop(origin)
    }

    /// Confirmation state of our own transaction published under `id`.
    pub fn tlc_status(&self, id: u32) -> Option<Confirmation> {
        lock(&self.publications).status(id)
    }

    /// Transactions observed from other origins.
    pub fn observed_tlc(&self) -> Vec<TlcMessage> {
        lock(&self.observed).records()
    }

    /// Number of rumors waiting in the mongering queue.
    pub fn mongering_len(&self) -> usize {
        lock(&self.mongering).len()
    }

    // ==================== Sending ====================

    /// Send one payload to `to`. Failures are logged and absorbed.
    pub(crate) async fn send(&self, payload: impl Into<Payload>, to: SocketAddr) {
        let packet = GossipPacket::new(payload);
        let kind = packet.kind();
        let data = match packet.encode() {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to encode {} for {}: {}", kind, to, e);
                return;
            }
        };
        if let Err(e) = self.transport.send_to(&data, to).await {
            warn!("Failed to send {} to {}: {}", kind, to, e);
        }
    }

    /// Send one payload to a random peer outside `exclude`.
    pub(crate) async fn send_to_random(
        &self,
        payload: impl Into<Payload>,
        exclude: &[SocketAddr],
    ) -> Option<SocketAddr> {
        let target = lock(&self.peers).random_excluding(exclude);
        match target {
            Some(target) => {
                self.send(payload, target).await;
                Some(target)
            }
            None => {
                debug!("No peer available outside {:?}", exclude);
                None
            }
        }
    }

    // ==================== Receive loop ====================

    /// Receive peer datagrams until shutdown.
    ///
    /// Each datagram is handled before the next is read, so datagrams from
    /// one sender are processed in arrival order.
    pub async fn run_peer_loop(self: Arc<Self>) {
        let mut shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                result = self.transport.recv_from() => match result {
                    Ok((data, from)) => self.handle_peer_datagram(&data, from).await,
                    Err(TransportError::Closed) => break,
                    Err(e) => warn!("Peer receive failed: {}", e),
                },
                _ = shutdown_requested(&mut shutdown) => break,
            }
        }
        debug!("Peer loop stopped");
    }

    /// Receive client requests until shutdown.
    pub async fn run_client_loop(self: Arc<Self>, client: Arc<dyn Transport>) {
        let mut shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                result = client.recv_from() => match result {
                    Ok((data, _)) => self.handle_client_datagram(&data).await,
                    Err(TransportError::Closed) => break,
                    Err(e) => warn!("Client receive failed: {}", e),
                },
                _ = shutdown_requested(&mut shutdown) => break,
            }
        }
        debug!("Client loop stopped");
    }
}

/// A running node and the means to stop it.
pub struct NodeHandle {
    pub gossiper: Arc<Gossiper>,
    /// Address the client socket is bound to
    pub ui_addr: Option<SocketAddr>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl NodeHandle {
    /// Signal every task to stop and wait for the long-running ones.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("Node task ended abnormally: {}", e);
            }
        }
        info!("Node {} stopped", self.gossiper.name);
    }
}

/// Bind the node's sockets and start its tasks.
pub async fn launch(
    config: NodeConfig,
    collaborator: Arc<dyn Collaborator>,
) -> Result<NodeHandle, TransportError> {
    let transport: Arc<dyn Transport> = Arc::new(UdpTransport::bind(config.gossip_addr).await?);
    let client: Option<Arc<dyn Transport>> = match config.ui_addr {
        Some(addr) => Some(Arc::new(UdpTransport::bind(addr).await?)),
        None => None,
    };
    let ui_addr = client.as_ref().map(|client| client.local_addr());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let gossiper = Gossiper::new(config, transport, collaborator, shutdown_rx);
    info!(
        "Node {} gossiping on {} ({})",
        gossiper.name,
        gossiper.address,
        if gossiper.config.simple { "simple" } else { "rumor" }
    );
    let listing = lock(&gossiper.peers).display();
    if !listing.is_empty() {
        info!("PEERS {}", listing);
    }

    let mut tasks = vec![tokio::spawn(Arc::clone(&gossiper).run_peer_loop())];
    if let Some(client) = client {
        tasks.push(tokio::spawn(Arc::clone(&gossiper).run_client_loop(client)));
    }
    if !gossiper.config.simple {
        tasks.push(tokio::spawn(Arc::clone(&gossiper).run_monger_monitor()));
        tasks.push(tokio::spawn(Arc::clone(&gossiper).run_anti_entropy()));
        tasks.push(tokio::spawn(Arc::clone(&gossiper).run_route_rumors()));
    }

    Ok(NodeHandle {
        gossiper,
        ui_addr,
        shutdown: shutdown_tx,
        tasks,
    })
}
