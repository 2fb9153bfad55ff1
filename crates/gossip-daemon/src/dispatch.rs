//! Datagram dispatch: decode, learn the sender, route to a handler.

use crate::node::{Gossiper, lock};
use gossip_core::peers::parse_peer;
use gossip_core::protocol::{
    ClientIntent, ClientMessage, GossipPacket, Payload, PrivateMessage, Routable, SimpleMessage,
};
use gossip_core::{Delivery, RouteError};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

impl Gossiper {
    /// Handle one datagram from a peer.
    ///
    /// Malformed datagrams are dropped. The sender of any well-formed packet
    /// becomes a known peer.
    pub async fn handle_peer_datagram(self: &Arc<Self>, data: &[u8], from: SocketAddr) {
        let packet = match GossipPacket::decode(data) {
            Ok(packet) => packet,
            Err(e) => {
                debug!("Dropping datagram from {}: {}", from, e);
                return;
            }
        };
        self.add_peer(from);

        let Some(payload) = packet.payload else {
            debug!("Empty packet from {}", from);
            return;
        };
        debug!("Received {} from {}", payload.kind(), from);

        match payload {
            Payload::Simple(message) => self.handle_simple(message, from).await,
            Payload::Rumor(rumor) if self.config.simple => {
                debug!("Ignoring rumor {}:{} in simple mode", rumor.origin, rumor.id);
            }
            Payload::Rumor(rumor) => self.handle_rumor(rumor, from).await,
            Payload::Status(_) if self.config.simple => {}
            Payload::Status(digest) => self.handle_status(digest, from).await,
            Payload::Private(message) => self.handle_private(message).await,
            Payload::DataRequest(request) => {
                self.deliver_or_forward(request, Delivery::DataRequest).await
            }
            Payload::DataReply(reply) => self.deliver_or_forward(reply, Delivery::DataReply).await,
            Payload::SearchRequest(request) if request.origin == self.name => {
                debug!("Ignoring our own search request");
            }
            Payload::SearchRequest(request) => {
                self.collaborator
                    .deliver(Delivery::SearchRequest { from, request })
                    .await
            }
            Payload::SearchReply(reply) => {
                self.deliver_or_forward(reply, Delivery::SearchReply).await
            }
            Payload::Tlc(message) => self.handle_tlc(message, from).await,
            Payload::TlcAck(ack) => self.handle_tlc_ack(ack).await,
        }
    }

    /// Handle one datagram from the local client.
    pub async fn handle_client_datagram(self: &Arc<Self>, data: &[u8]) {
        match ClientMessage::decode(data) {
            Ok(message) => self.handle_client_message(message).await,
            Err(e) => warn!("Dropping client request: {}", e),
        }
    }

    pub async fn handle_client_message(self: &Arc<Self>, message: ClientMessage) {
        let Some(intent) = message.intent() else {
            debug!("Ignoring client request with nothing to do");
            return;
        };

        match intent {
            ClientIntent::Search { keywords, budget } => {
                info!("CLIENT SEARCH {}", keywords.join(","));
                self.collaborator.search(&keywords, budget).await;
            }
            ClientIntent::Download {
                destination,
                hash,
                file_name,
            } => {
                let file_name = file_name.unwrap_or_else(|| hex::encode(&hash));
                info!(
                    "CLIENT DOWNLOAD {} from {} metahash {}",
                    file_name,
                    destination,
                    hex::encode(&hash)
                );
                self.collaborator
                    .request_file(&destination, &hash, &file_name)
                    .await;
            }
            ClientIntent::Index { file } => {
                info!("CLIENT INDEX {}", file);
                match self.collaborator.index_file(&file).await {
                    Some(transaction) => {
                        self.publish_transaction(transaction);
                    }
                    None => debug!("Nothing to publish for {}", file),
                }
            }
            ClientIntent::Private { destination, text } => {
                info!("CLIENT MESSAGE {} dest {}", text, destination);
                let message =
                    PrivateMessage::new(self.name.clone(), destination, text, self.config.hop_limit);
                self.handle_private(message).await;
            }
            ClientIntent::Broadcast { text } => {
                info!("CLIENT MESSAGE {}", text);
                if self.config.simple {
                    self.broadcast_simple(text).await;
                } else {
                    self.broadcast_rumor(text).await;
                }
            }
        }
    }

    // ==================== Simple mode ====================

    /// Send `text` to every known peer as a simple message.
    pub async fn broadcast_simple(&self, text: impl Into<String>) {
        let message = SimpleMessage {
            original_name: self.name.clone(),
            relay_peer_addr: self.address.to_string(),
            contents: text.into(),
        };
        let targets = self.peers();
        for target in targets {
            self.send(message.clone(), target).await;
        }
    }

    async fn handle_simple(&self, message: SimpleMessage, from: SocketAddr) {
        info!(
            "SIMPLE MESSAGE origin {} from {} contents {}",
            message.original_name, message.relay_peer_addr, message.contents
        );

        let relay = parse_peer(&message.relay_peer_addr);
        match relay {
            Some(relay) => {
                self.add_peer(relay);
            }
            None => debug!("Ignoring relay address {:?}", message.relay_peer_addr),
        }

        let exclude: Vec<SocketAddr> = relay.into_iter().chain([from]).collect();
        let targets = lock(&self.peers).all_except(&exclude);
        let relayed = SimpleMessage {
            relay_peer_addr: self.address.to_string(),
            ..message
        };
        for target in targets {
            self.send(relayed.clone(), target).await;
        }
    }

    // ==================== Point-to-point ====================

    async fn handle_private(&self, message: PrivateMessage) {
        if message.destination != self.name {
            self.relay(message).await;
            return;
        }

        info!(
            "PRIVATE origin {} hop-limit {} contents {}",
            message.origin, message.hop_limit, message.text
        );
        lock(&self.private_inbox).push(message);
    }

    async fn deliver_or_forward<R>(&self, payload: R, wrap: fn(R) -> Delivery)
    where
        R: Routable + Into<Payload>,
    {
        if *payload.destination() == self.name {
            self.collaborator.deliver(wrap(payload)).await;
        } else {
            self.relay(payload).await;
        }
    }

    /// Send a destination-bearing payload one hop closer to its destination.
    ///
    /// Spends one hop. Payloads without a route, or with no hops left, are
    /// not sent and the reason is returned.
    pub async fn forward<R>(&self, mut payload: R) -> Result<SocketAddr, RouteError>
    where
        R: Routable + Into<Payload>,
    {
        let next_hop = lock(&self.routes).route(&mut payload)?;
        debug!("Forwarding to {} via {}", payload.destination(), next_hop);
        self.send(payload, next_hop).await;
        Ok(next_hop)
    }

    /// [`forward`](Self::forward) for relayed traffic: a payload that cannot
    /// be routed is logged and dropped.
    pub(crate) async fn relay<R>(&self, payload: R)
    where
        R: Routable + Into<Payload>,
    {
        match self.forward(payload).await {
            Ok(_) => {}
            Err(e @ RouteError::NoRoute(_)) => warn!("Dropping payload: {}", e),
            Err(e) => debug!("Dropping payload: {}", e),
        }
    }
}
