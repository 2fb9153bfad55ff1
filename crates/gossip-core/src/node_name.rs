//! NodeName: the identity a gossiper signs its rumors with.
//!
//! Names are free-form strings chosen by the operator ("alice", "node-3").
//! They must be non-empty and may not contain whitespace, since they show up
//! verbatim in logs and in the comma-free CLI surface.

use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NodeNameError {
    #[error("Node name cannot be empty")]
    Empty,
    #[error("Node name cannot contain whitespace: {0:?}")]
    Whitespace(String),
}

/// Identity of a node (the `origin` of rumors, the `destination` of unicast
/// payloads).
///
/// # Examples
/// ```
/// use gossip_core::NodeName;
///
/// let name: NodeName = "alice".parse().unwrap();
/// assert_eq!(name.as_str(), "alice");
/// assert!("".parse::<NodeName>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeName(String);

impl NodeName {
    /// Borrow the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NodeName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NodeName {
    type Err = NodeNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(NodeNameError::Empty);
        }
        if s.chars().any(char::is_whitespace) {
            return Err(NodeNameError::Whitespace(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for NodeName {
    type Error = NodeNameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<NodeName> for String {
    fn from(name: NodeName) -> String {
        name.0
    }
}

impl Borrow<str> for NodeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for NodeName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

// Serialized as a bare string; deserialization re-validates.
impl serde::Serialize for NodeName {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NodeName {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let name: NodeName = "alice".parse().unwrap();
        assert_eq!(name.to_string(), "alice");
        assert_eq!(name.as_str(), "alice");
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!("".parse::<NodeName>(), Err(NodeNameError::Empty));
    }

    #[test]
    fn test_whitespace_rejected() {
        assert!("bob smith".parse::<NodeName>().is_err());
        assert!(" bob".parse::<NodeName>().is_err());
        assert!("bob\t".parse::<NodeName>().is_err());
    }

    #[test]
    fn test_borrow_lookup() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(NodeName::try_from("carol".to_string()).unwrap(), 3);
        assert_eq!(map.get("carol"), Some(&3));
    }

    #[test]
    fn test_bincode_rejects_empty_name() {
        let bytes = bincode::serialize("").unwrap();
        assert!(bincode::deserialize::<NodeName>(&bytes).is_err());

        let bytes = bincode::serialize("dave").unwrap();
        let name: NodeName = bincode::deserialize(&bytes).unwrap();
        assert_eq!(name.as_str(), "dave");
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let a: NodeName = "a".parse().unwrap();
        let b: NodeName = "b".parse().unwrap();
        assert!(a < b);
    }
}
