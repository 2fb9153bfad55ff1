//! Control-plane message sent by the local client to its gossiper.

use super::envelope::PacketError;
use crate::NodeName;
use serde::{Deserialize, Serialize};

/// One request from the local client. Fields are optional; exactly one
/// interpretation is chosen by [`ClientMessage::intent`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientMessage {
    pub text: Option<String>,
    pub destination: Option<NodeName>,
    pub file: Option<String>,
    pub request: Option<Vec<u8>>,
    pub keywords: Option<Vec<String>>,
    pub budget: Option<u64>,
}

/// What the gossiper should do with a [`ClientMessage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientIntent {
    /// Start a keyword search
    Search {
        keywords: Vec<String>,
        budget: Option<u64>,
    },
    /// Download the file with metafile hash `hash` from `destination`
    Download {
        destination: NodeName,
        hash: Vec<u8>,
        file_name: Option<String>,
    },
    /// Index a local file and publish it
    Index { file: String },
    /// Point-to-point message
    Private { destination: NodeName, text: String },
    /// Rumor (or simple broadcast in simple mode)
    Broadcast { text: String },
}

impl ClientMessage {
    /// Plain broadcast text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Point-to-point text.
    pub fn private(destination: NodeName, text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            destination: Some(destination),
            ..Self::default()
        }
    }

    /// Index request for a shared file.
    pub fn index(file: impl Into<String>) -> Self {
        Self {
            file: Some(file.into()),
            ..Self::default()
        }
    }

    /// Resolve the single interpretation of this message.
    ///
    /// Precedence: search, download, index, private, broadcast. Returns
    /// `None` when nothing actionable is set (including a download without a
    /// destination, or empty text).
    pub fn intent(&self) -> Option<ClientIntent> {
        if let Some(keywords) = &self.keywords {
            let keywords: Vec<String> = keywords
                .iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
            if keywords.is_empty() {
                return None;
            }
            return Some(ClientIntent::Search {
                keywords,
                budget: self.budget,
            });
        }

        if let Some(hash) = &self.request {
            let destination = self.destination.clone()?;
            return Some(ClientIntent::Download {
                destination,
                hash: hash.clone(),
                file_name: self.file.clone(),
            });
        }

        if let Some(file) = &self.file {
            return Some(ClientIntent::Index { file: file.clone() });
        }

        let text = self.text.clone().filter(|t| !t.is_empty())?;
        match &self.destination {
            Some(destination) => Some(ClientIntent::Private {
                destination: destination.clone(),
                text,
            }),
            None => Some(ClientIntent::Broadcast { text }),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        bincode::serialize(self).map_err(|e| PacketError::Encode(e.to_string()))
    }

    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        bincode::deserialize(data).map_err(|e| PacketError::MalformedPacket(e.to_string()))
    }
}
