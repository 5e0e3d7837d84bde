//! Wire DTOs
//!
//! Every message that crosses a node boundary, for both the peer-to-peer
//! and registry-mediated variants. Transport is JSON over HTTP but the
//! shapes here do not assume it.

use crate::{
    Clock, ItemKind, NodeId, NodeKind, NodeRegistration, Occupation, TradeDirection, TradeId,
    TradeOffer, TradeSide, TradeStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Generic success/message acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

impl Ack {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Error body every node returns on a failed request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable machine code, see [`crate::HamletError::error_code`]
    pub code: String,
    pub message: String,
    /// The structured error, so callers can rebuild the exact variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<crate::HamletError>,
}

// ============================================================================
// Coordinator surface
// ============================================================================

/// Register a node with the coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub id: NodeId,
    pub kind: NodeKind,
    pub address: String,
    pub display_name: Option<String>,
}

/// The one action a villager submits per period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionTag {
    Work,
    Sleep,
    Idle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitActionRequest {
    pub node_id: NodeId,
    pub action: ActionTag,
}

/// Barrier outcome for a submitted action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitActionResponse {
    pub advanced: bool,
    /// Villagers still missing for this period (empty when advanced)
    pub waiting_for: Vec<NodeId>,
    pub new_time: Option<Clock>,
}

/// Push notice sent to every non-coordinator node on advance
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeAdvanceNotice {
    pub day: u32,
    pub period: crate::Period,
}

impl From<Clock> for TimeAdvanceNotice {
    fn from(clock: Clock) -> Self {
        Self {
            day: clock.day,
            period: clock.period,
        }
    }
}

impl TimeAdvanceNotice {
    pub fn clock(&self) -> Clock {
        Clock::new(self.day, self.period)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListNodesResponse {
    pub nodes: Vec<NodeRegistration>,
}

// ============================================================================
// Villager surface
// ============================================================================

/// Snapshot of one villager for info queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VillagerInfo {
    pub name: String,
    pub occupation: Occupation,
    pub stamina: u64,
    pub max_stamina: u64,
    pub currency: u64,
    pub items: HashMap<ItemKind, u64>,
    pub has_slept_today: bool,
    pub has_acted_this_period: bool,
}

/// Fixed-price exchange against a villager's built-in merchant counter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantExchangeRequest {
    /// The party trading against the merchant counter
    pub party: NodeId,
    pub item: ItemKind,
    pub quantity: u64,
    pub direction: TradeDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantExchangeResponse {
    pub success: bool,
    pub message: String,
    /// Total currency moved for the whole quantity
    pub total_amount: u64,
}

// ============================================================================
// Trade handshake surface (both variants)
// ============================================================================

/// Open a new trade offer against a counterparty (or the registry)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRequest {
    pub initiator: NodeId,
    pub initiator_address: String,
    pub counterparty: NodeId,
    pub item: ItemKind,
    pub quantity: u64,
    pub price: u64,
    pub direction: TradeDirection,
}

/// Command telling a villager node to open a trade against a peer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiateTradeRequest {
    pub counterparty: NodeId,
    pub counterparty_address: String,
    pub item: ItemKind,
    pub quantity: u64,
    pub price: u64,
    pub direction: TradeDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRequestResponse {
    pub success: bool,
    pub trade_id: TradeId,
}

/// Accept / Reject / Confirm / Cancel against an existing offer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeActionRequest {
    pub trade_id: TradeId,
    pub caller: NodeId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeActionResponse {
    pub success: bool,
    pub message: String,
    pub offer: Option<TradeOffer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeListResponse {
    pub trades: Vec<TradeOffer>,
}

// ============================================================================
// Peer push notices (fire-and-forget; loss is a liveness issue only)
// ============================================================================

/// The counterparty accepted and locked its obligated resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeAcceptedNotice {
    pub trade_id: TradeId,
}

/// One side set its confirmation flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeConfirmNotice {
    pub trade_id: TradeId,
    pub confirmed_by: TradeSide,
}

/// Settlement executed on the sender's side; idempotent on receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSettledNotice {
    pub trade_id: TradeId,
}

/// The trade was torn down, possibly while the receiver held a lock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRefundNotice {
    pub trade_id: TradeId,
    /// Terminal status the sender recorded (Rejected or Cancelled)
    pub status: TradeStatus,
    pub reason: String,
}

// ============================================================================
// Registry-issued villager mutations
// ============================================================================

/// Debit or credit a villager's currency on behalf of a mediated trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyMutation {
    pub trade_id: TradeId,
    pub amount: u64,
}

/// Remove or add villager items on behalf of a mediated trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemMutation {
    pub trade_id: TradeId,
    pub item: ItemKind,
    pub quantity: u64,
}
