//! Identity types for hamlet nodes and trades
//!
//! Node ids are operator-chosen strings ("alice", "market-1"); trade ids
//! are UUID-backed and generated by the node that owns the offer table.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a node in the simulation.
///
/// Chosen by the operator at startup and used verbatim in every message,
/// so it is a plain string rather than a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a trade offer.
///
/// Generated by the node (or registry) that owns the offer table; unique
/// within that table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradeId(pub Uuid);

impl TradeId {
    /// Create a new random trade id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from a string, with or without the `trade_` display prefix
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        let raw = s.strip_prefix("trade_").unwrap_or(s);
        Ok(Self(Uuid::parse_str(raw)?))
    }
}

impl Default for TradeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trade_{}", self.0)
    }
}

/// Role a node plays in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Owns the clock and the barrier
    Coordinator,
    /// Owns one economic state; endpoint for trades
    Villager,
    /// Mediates trades centrally in the registry variant
    Registry,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coordinator => write!(f, "coordinator"),
            Self::Villager => write!(f, "villager"),
            Self::Registry => write!(f, "registry"),
        }
    }
}

/// A node known to the coordinator.
///
/// Created on registration and never deleted; entries may go stale since
/// there is no heartbeat or eviction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRegistration {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Base URL the node listens on, e.g. "http://127.0.0.1:7101"
    pub address: String,
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_id_roundtrip() {
        let id = TradeId::new();
        let parsed = TradeId::parse(&id.0.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_node_id_display() {
        let id = NodeId::new("alice");
        assert_eq!(id.to_string(), "alice");
    }
}
