//! Per-node trade book
//!
//! An owned, keyed table of trade mirrors: trade id -> record, plus which
//! side of each trade this node is. Settled and torn-down trades move to
//! a terminal table so re-delivered notices can be recognized and
//! discarded.

use chrono::Utc;
use hamlet_economy::EconomicState;
use hamlet_types::{
    HamletError, NodeId, Result, TradeAcceptedNotice, TradeConfirmNotice, TradeId, TradeObligation,
    TradeOffer, TradeRefundNotice, TradeRequest, TradeSettledNotice, TradeSide, TradeStatus,
};
use std::collections::HashMap;
use tracing::{debug, warn};

/// A notice this node must deliver to the peer of a trade.
///
/// Delivery is fire-and-forget: the protocol never blocks on it and never
/// retries it.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeNotice {
    pub peer: NodeId,
    pub peer_address: String,
    pub payload: NoticePayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NoticePayload {
    Accepted(TradeAcceptedNotice),
    Confirm(TradeConfirmNotice),
    Settled(TradeSettledNotice),
    Refund(TradeRefundNotice),
}

#[derive(Debug, Clone)]
struct TradeEntry {
    offer: TradeOffer,
    /// Which side of the trade this node is
    side: TradeSide,
    peer: NodeId,
    peer_address: String,
}

impl TradeEntry {
    fn notice(&self, payload: NoticePayload) -> TradeNotice {
        TradeNotice {
            peer: self.peer.clone(),
            peer_address: self.peer_address.clone(),
            payload,
        }
    }
}

/// One node's mirrors of the trades it participates in.
#[derive(Debug, Default)]
pub struct TradeBook {
    active: HashMap<TradeId, TradeEntry>,
    /// Terminal records, kept so re-delivered notices are recognized
    terminal: HashMap<TradeId, TradeOffer>,
}

impl TradeBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a trade in either table.
    pub fn get(&self, id: &TradeId) -> Option<&TradeOffer> {
        self.active
            .get(id)
            .map(|e| &e.offer)
            .or_else(|| self.terminal.get(id))
    }

    /// Offers awaiting this node's decision (it is the counterparty).
    pub fn pending_trades(&self) -> Vec<TradeOffer> {
        self.active
            .values()
            .filter(|e| e.side == TradeSide::Counterparty)
            .map(|e| e.offer.clone())
            .collect()
    }

    /// Offers this node initiated and that are still live.
    pub fn sent_trades(&self) -> Vec<TradeOffer> {
        self.active
            .values()
            .filter(|e| e.side == TradeSide::Initiator)
            .map(|e| e.offer.clone())
            .collect()
    }

    // ------------------------------------------------------------------
    // Request
    // ------------------------------------------------------------------

    /// Counterparty side of Request: create a Pending mirror with a fresh,
    /// locally unique id. No resource is touched.
    pub fn open_offer(&mut self, request: &TradeRequest) -> Result<TradeOffer> {
        if request.quantity == 0 {
            return Err(HamletError::validation("quantity", "must be at least 1"));
        }
        let offer = TradeOffer {
            id: TradeId::new(),
            initiator: request.initiator.clone(),
            initiator_address: request.initiator_address.clone(),
            counterparty: request.counterparty.clone(),
            item: request.item.clone(),
            quantity: request.quantity,
            price: request.price,
            direction: request.direction,
            status: TradeStatus::Pending,
            initiator_confirmed: false,
            counterparty_confirmed: false,
            resources_locked: false,
            created_at: Utc::now(),
        };
        self.active.insert(
            offer.id.clone(),
            TradeEntry {
                offer: offer.clone(),
                side: TradeSide::Counterparty,
                peer: request.initiator.clone(),
                peer_address: request.initiator_address.clone(),
            },
        );
        Ok(offer)
    }

    /// Initiator side of Request: mirror the offer the counterparty just
    /// created, under the same id.
    pub fn record_sent_offer(&mut self, offer: TradeOffer, counterparty_address: String) {
        let peer = offer.counterparty.clone();
        self.active.insert(
            offer.id.clone(),
            TradeEntry {
                offer,
                side: TradeSide::Initiator,
                peer,
                peer_address: counterparty_address,
            },
        );
    }

    // ------------------------------------------------------------------
    // Accept
    // ------------------------------------------------------------------

    /// Accept a Pending offer (counterparty only).
    ///
    /// Verifies the counterparty holds its obligated resource, deducts it
    /// immediately (the lock), and moves the offer to Accepted. A failed
    /// balance check leaves everything untouched.
    pub fn accept(
        &mut self,
        econ: &mut EconomicState,
        id: &TradeId,
    ) -> Result<(TradeOffer, Vec<TradeNotice>)> {
        let entry = self.active_entry(id, TradeSide::Counterparty)?;
        if entry.offer.status != TradeStatus::Pending {
            return Err(invalid_state("pending", entry.offer.status));
        }

        let obligation = entry.offer.obligation_of(TradeSide::Counterparty);
        deduct(econ, &obligation)?;

        let entry = self.active.get_mut(id).expect("entry checked above");
        entry.offer.status = TradeStatus::Accepted;
        entry.offer.resources_locked = true;
        let notice = entry.notice(NoticePayload::Accepted(TradeAcceptedNotice {
            trade_id: id.clone(),
        }));
        Ok((entry.offer.clone(), vec![notice]))
    }

    /// Initiator mirror update for a `TradeAcceptedNotice`.
    pub fn apply_accepted_notice(&mut self, notice: &TradeAcceptedNotice) {
        match self.active.get_mut(&notice.trade_id) {
            Some(entry) if entry.offer.status == TradeStatus::Pending => {
                entry.offer.status = TradeStatus::Accepted;
            }
            Some(entry) => debug!(
                trade_id = %notice.trade_id,
                status = %entry.offer.status,
                "accepted notice ignored: offer not pending"
            ),
            None => debug!(trade_id = %notice.trade_id, "accepted notice for unknown trade"),
        }
    }

    // ------------------------------------------------------------------
    // Confirm / settle
    // ------------------------------------------------------------------

    /// Confirm an Accepted offer from this node's side.
    ///
    /// Locks this side's obligated resource if it was not already locked
    /// at Accept, sets this side's confirmation flag, and settles locally
    /// the moment both flags are observed true.
    pub fn confirm(
        &mut self,
        econ: &mut EconomicState,
        id: &TradeId,
    ) -> Result<(TradeOffer, Vec<TradeNotice>)> {
        let entry = self.active.get(id).ok_or_else(|| trade_not_found(id))?;
        if entry.offer.status != TradeStatus::Accepted {
            return Err(invalid_state("accepted", entry.offer.status));
        }
        let side = entry.side;
        if entry.offer.confirmed(side) {
            return Err(invalid_state("unconfirmed", TradeStatus::Accepted));
        }

        // The counterparty locked at Accept; only lock once.
        if !entry.offer.resources_locked {
            let obligation = entry.offer.obligation_of(side);
            deduct(econ, &obligation)?;
        }

        let entry = self.active.get_mut(id).expect("entry checked above");
        entry.offer.resources_locked = true;
        entry.offer.set_confirmed(side);

        if entry.offer.fully_confirmed() {
            let (offer, notice) = self.settle_local(econ, id);
            Ok((offer, vec![notice]))
        } else {
            let notice = entry.notice(NoticePayload::Confirm(TradeConfirmNotice {
                trade_id: id.clone(),
                confirmed_by: side,
            }));
            Ok((entry.offer.clone(), vec![notice]))
        }
    }

    /// Mirror update for a peer's `TradeConfirmNotice`; settles locally if
    /// both flags are now true. Unknown or terminal trades discard the
    /// notice.
    pub fn apply_confirm_notice(
        &mut self,
        econ: &mut EconomicState,
        notice: &TradeConfirmNotice,
    ) -> Vec<TradeNotice> {
        let Some(entry) = self.active.get_mut(&notice.trade_id) else {
            debug!(trade_id = %notice.trade_id, "confirm notice for unknown or settled trade");
            return Vec::new();
        };
        if entry.offer.status != TradeStatus::Accepted {
            debug!(
                trade_id = %notice.trade_id,
                status = %entry.offer.status,
                "confirm notice ignored: offer not accepted"
            );
            return Vec::new();
        }
        entry.offer.set_confirmed(notice.confirmed_by);

        if entry.offer.fully_confirmed() {
            let (_, notice) = self.settle_local(econ, &notice.trade_id);
            vec![notice]
        } else {
            Vec::new()
        }
    }

    /// Idempotent completion handler: if this side already settled (or
    /// never knew the trade) the notice is discarded, so re-delivery can
    /// never move balances a second time.
    pub fn apply_settled_notice(&mut self, econ: &mut EconomicState, notice: &TradeSettledNotice) {
        if self.terminal.contains_key(&notice.trade_id) {
            debug!(trade_id = %notice.trade_id, "settled notice re-delivered; discarded");
            return;
        }
        let Some(entry) = self.active.get_mut(&notice.trade_id) else {
            debug!(trade_id = %notice.trade_id, "settled notice for unknown trade");
            return;
        };
        if !entry.offer.confirmed(entry.side) || !entry.offer.resources_locked {
            // The peer cannot have observed both flags unless we confirmed;
            // refuse to credit a resource we never locked against.
            warn!(
                trade_id = %notice.trade_id,
                "settled notice arrived before local confirmation; discarded"
            );
            return;
        }
        entry.offer.set_confirmed(entry.side.other());
        self.settle_local(econ, &notice.trade_id);
    }

    /// Credit what this side is owed, mark Settled, retire the record.
    fn settle_local(&mut self, econ: &mut EconomicState, id: &TradeId) -> (TradeOffer, TradeNotice) {
        let mut entry = self.active.remove(id).expect("settle on active trade");
        let owed = entry.offer.entitlement_of(entry.side);
        credit(econ, &owed);
        entry.offer.status = TradeStatus::Settled;
        let offer = entry.offer.clone();
        let notice = entry.notice(NoticePayload::Settled(TradeSettledNotice {
            trade_id: id.clone(),
        }));
        self.terminal.insert(id.clone(), entry.offer);
        debug!(trade_id = %id, "trade settled");
        (offer, notice)
    }

    // ------------------------------------------------------------------
    // Reject / Cancel / refunds
    // ------------------------------------------------------------------

    /// Reject a Pending offer (counterparty only). No resource movement.
    pub fn reject(&mut self, id: &TradeId) -> Result<(TradeOffer, Vec<TradeNotice>)> {
        let entry = self.active_entry(id, TradeSide::Counterparty)?;
        if entry.offer.status != TradeStatus::Pending {
            return Err(invalid_state("pending", entry.offer.status));
        }
        let mut entry = self.active.remove(id).expect("entry checked above");
        entry.offer.status = TradeStatus::Rejected;
        let offer = entry.offer.clone();
        let notice = entry.notice(NoticePayload::Refund(TradeRefundNotice {
            trade_id: id.clone(),
            status: TradeStatus::Rejected,
            reason: "rejected by counterparty".to_string(),
        }));
        self.terminal.insert(id.clone(), entry.offer);
        Ok((offer, vec![notice]))
    }

    /// Cancel a live offer (initiator only, before settlement).
    ///
    /// Refunds this side's lock if it had confirmed, and always notifies
    /// the peer so any lock held there is refunded before the record is
    /// dropped.
    pub fn cancel(
        &mut self,
        econ: &mut EconomicState,
        id: &TradeId,
    ) -> Result<(TradeOffer, Vec<TradeNotice>)> {
        let entry = self.active_entry(id, TradeSide::Initiator)?;
        if entry.offer.status.is_terminal() {
            return Err(invalid_state("pending or accepted", entry.offer.status));
        }
        let mut entry = self.active.remove(id).expect("entry checked above");
        if entry.offer.resources_locked {
            let obligation = entry.offer.obligation_of(entry.side);
            credit(econ, &obligation);
        }
        entry.offer.status = TradeStatus::Cancelled;
        let offer = entry.offer.clone();
        let notice = entry.notice(NoticePayload::Refund(TradeRefundNotice {
            trade_id: id.clone(),
            status: TradeStatus::Cancelled,
            reason: "cancelled by initiator".to_string(),
        }));
        self.terminal.insert(id.clone(), entry.offer);
        Ok((offer, vec![notice]))
    }

    /// Tear-down notice from the peer (reject or cancel): refund this
    /// side's lock if one is held and drop the record, carrying the
    /// terminal status the peer recorded. Idempotent.
    pub fn apply_refund_notice(&mut self, econ: &mut EconomicState, notice: &TradeRefundNotice) {
        let Some(mut entry) = self.active.remove(&notice.trade_id) else {
            debug!(trade_id = %notice.trade_id, "refund notice for unknown trade");
            return;
        };
        if entry.offer.resources_locked {
            let obligation = entry.offer.obligation_of(entry.side);
            credit(econ, &obligation);
            entry.offer.resources_locked = false;
        }
        entry.offer.status = if notice.status.is_terminal() {
            notice.status
        } else {
            TradeStatus::Cancelled
        };
        debug!(trade_id = %notice.trade_id, reason = %notice.reason, "trade torn down by peer");
        self.terminal.insert(notice.trade_id.clone(), entry.offer);
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn active_entry(&self, id: &TradeId, required_side: TradeSide) -> Result<&TradeEntry> {
        let entry = self.active.get(id).ok_or_else(|| trade_not_found(id))?;
        if entry.side != required_side {
            return Err(HamletError::validation(
                "caller",
                format!("only the {required_side} may perform this operation"),
            ));
        }
        Ok(entry)
    }
}

fn trade_not_found(id: &TradeId) -> HamletError {
    HamletError::not_found("trade", id.to_string())
}

fn invalid_state(expected: &str, actual: TradeStatus) -> HamletError {
    HamletError::InvalidState {
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

fn deduct(econ: &mut EconomicState, obligation: &TradeObligation) -> hamlet_types::Result<()> {
    match obligation {
        TradeObligation::Currency(amount) => econ.spend_currency(*amount),
        TradeObligation::Items(item, quantity) => econ.remove_items(item, *quantity),
    }
}

fn credit(econ: &mut EconomicState, obligation: &TradeObligation) {
    match obligation {
        TradeObligation::Currency(amount) => econ.credit_currency(*amount),
        TradeObligation::Items(item, quantity) => econ.add_items(item.clone(), *quantity),
    }
}
