//! Trade offer types
//!
//! A trade offer exists as two independent mirrors (one per peer) in the
//! peer-to-peer variant, or as a single record inside the registry in the
//! centralized variant. Both variants share the same lifecycle:
//!
//! ```text
//! Pending -> Accepted -> Settled
//!    |           |
//!    v           v
//! Rejected    Cancelled
//! ```
//!
//! No status transition is ever reversed.

use crate::{ItemKind, NodeId, TradeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which way the goods flow, relative to the initiator.
///
/// Always an explicit enum; a price or amount field never doubles as an
/// action tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    /// Initiator pays currency, counterparty hands over items
    InitiatorBuys,
    /// Initiator hands over items, counterparty pays currency
    InitiatorSells,
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitiatorBuys => write!(f, "initiator_buys"),
            Self::InitiatorSells => write!(f, "initiator_sells"),
        }
    }
}

/// Which peer of a trade a node (or a confirmation) is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Initiator,
    Counterparty,
}

impl TradeSide {
    pub fn other(self) -> Self {
        match self {
            Self::Initiator => Self::Counterparty,
            Self::Counterparty => Self::Initiator,
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initiator => write!(f, "initiator"),
            Self::Counterparty => write!(f, "counterparty"),
        }
    }
}

/// Lifecycle state of a trade offer. Forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    /// Created by Request; no resource touched yet
    Pending,
    /// Counterparty locked its obligated resource
    Accepted,
    /// Both sides confirmed; settlement executed exactly once
    Settled,
    /// Declined while Pending; no resource movement
    Rejected,
    /// Withdrawn by the initiator before settlement
    Cancelled,
}

impl TradeStatus {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled | Self::Rejected | Self::Cancelled)
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Accepted => write!(f, "accepted"),
            Self::Settled => write!(f, "settled"),
            Self::Rejected => write!(f, "rejected"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One mirror of a bilateral trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOffer {
    pub id: TradeId,
    pub initiator: NodeId,
    /// Base URL of the initiator, so the counterparty can send notices back
    pub initiator_address: String,
    pub counterparty: NodeId,
    pub item: ItemKind,
    pub quantity: u64,
    /// Total currency for the whole quantity
    pub price: u64,
    pub direction: TradeDirection,
    pub status: TradeStatus,
    pub initiator_confirmed: bool,
    pub counterparty_confirmed: bool,
    /// Whether the owning side has deducted its obligated resource
    pub resources_locked: bool,
    pub created_at: DateTime<Utc>,
}

impl TradeOffer {
    /// Both confirmation flags observed true
    pub fn fully_confirmed(&self) -> bool {
        self.initiator_confirmed && self.counterparty_confirmed
    }

    /// The resource a given side must hand over at settlement.
    ///
    /// The initiator gives currency when buying and items when selling;
    /// the counterparty gives the opposite.
    pub fn obligation_of(&self, side: TradeSide) -> TradeObligation {
        let gives_currency = matches!(
            (self.direction, side),
            (TradeDirection::InitiatorBuys, TradeSide::Initiator)
                | (TradeDirection::InitiatorSells, TradeSide::Counterparty)
        );
        if gives_currency {
            TradeObligation::Currency(self.price)
        } else {
            TradeObligation::Items(self.item.clone(), self.quantity)
        }
    }

    /// The resource a given side is owed at settlement.
    pub fn entitlement_of(&self, side: TradeSide) -> TradeObligation {
        self.obligation_of(side.other())
    }

    /// Set the confirmation flag for one side
    pub fn set_confirmed(&mut self, side: TradeSide) {
        match side {
            TradeSide::Initiator => self.initiator_confirmed = true,
            TradeSide::Counterparty => self.counterparty_confirmed = true,
        }
    }

    /// Whether one side already confirmed
    pub fn confirmed(&self, side: TradeSide) -> bool {
        match side {
            TradeSide::Initiator => self.initiator_confirmed,
            TradeSide::Counterparty => self.counterparty_confirmed,
        }
    }
}

/// The concrete resource one side owes the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeObligation {
    Currency(u64),
    Items(ItemKind, u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(direction: TradeDirection) -> TradeOffer {
        TradeOffer {
            id: TradeId::new(),
            initiator: NodeId::new("alice"),
            initiator_address: "http://localhost:7101".to_string(),
            counterparty: NodeId::new("bob"),
            item: ItemKind::wheat(),
            quantity: 5,
            price: 50,
            direction,
            status: TradeStatus::Pending,
            initiator_confirmed: false,
            counterparty_confirmed: false,
            resources_locked: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_obligations_when_initiator_sells() {
        let offer = offer(TradeDirection::InitiatorSells);
        assert_eq!(
            offer.obligation_of(TradeSide::Initiator),
            TradeObligation::Items(ItemKind::wheat(), 5)
        );
        assert_eq!(
            offer.obligation_of(TradeSide::Counterparty),
            TradeObligation::Currency(50)
        );
        assert_eq!(
            offer.entitlement_of(TradeSide::Initiator),
            TradeObligation::Currency(50)
        );
    }

    #[test]
    fn test_obligations_when_initiator_buys() {
        let offer = offer(TradeDirection::InitiatorBuys);
        assert_eq!(
            offer.obligation_of(TradeSide::Initiator),
            TradeObligation::Currency(50)
        );
        assert_eq!(
            offer.entitlement_of(TradeSide::Counterparty),
            TradeObligation::Currency(50)
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(TradeStatus::Settled.is_terminal());
        assert!(TradeStatus::Rejected.is_terminal());
        assert!(TradeStatus::Cancelled.is_terminal());
        assert!(!TradeStatus::Pending.is_terminal());
        assert!(!TradeStatus::Accepted.is_terminal());
    }
}
