//! Hand-off to the file sharing collaborator.
//!
//! Chunking, indexing, search expansion and downloads live outside the
//! gossiper. The node hands them the payloads addressed to it and asks them
//! to index files; everything they send goes through the node's forwarding
//! primitive.

use crate::NodeName;
use crate::protocol::{BlockPublish, DataReply, DataRequest, SearchReply, SearchRequest};
use async_trait::async_trait;
use std::net::SocketAddr;
use tracing::info;

/// A file sharing payload that reached this node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    DataRequest(DataRequest),
    DataReply(DataReply),
    /// Search requests are flooded, so the sender address is kept
    SearchRequest {
        from: SocketAddr,
        request: SearchRequest,
    },
    SearchReply(SearchReply),
}

impl Delivery {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DataRequest(_) => "data request",
            Self::DataReply(_) => "data reply",
            Self::SearchRequest { .. } => "search request",
            Self::SearchReply(_) => "search reply",
        }
    }
}

#[async_trait]
pub trait Collaborator: Send + Sync {
    /// Index a shared file. The returned transaction is published via TLC.
    async fn index_file(&self, file_name: &str) -> Option<BlockPublish>;

    /// Start downloading `file_name` (metafile `hash`) from `destination`.
    async fn request_file(&self, destination: &NodeName, hash: &[u8], file_name: &str);

    /// Start a keyword search with the given budget.
    async fn search(&self, keywords: &[String], budget: Option<u64>);

    /// A payload addressed to us arrived.
    async fn deliver(&self, delivery: Delivery);
}

/// Collaborator for nodes without file sharing: logs and ignores.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCollaborator;

#[async_trait]
impl Collaborator for NullCollaborator {
    async fn index_file(&self, file_name: &str) -> Option<BlockPublish> {
        info!("File sharing disabled, not indexing {}", file_name);
        None
    }

    async fn request_file(&self, destination: &NodeName, _hash: &[u8], file_name: &str) {
        info!(
            "File sharing disabled, not downloading {} from {}",
            file_name, destination
        );
    }

    async fn search(&self, keywords: &[String], _budget: Option<u64>) {
        info!("File sharing disabled, not searching {}", keywords.join(","));
    }

    async fn deliver(&self, delivery: Delivery) {
        info!("File sharing disabled, dropping {}", delivery.kind());
    }
}
