//! Hamlet Trade Registry - the centralized trade variant
//!
//! One registry node holds the single authoritative record of every
//! mediated trade; the villagers hold none. The lifecycle is the same as
//! the peer-to-peer handshake (Pending -> Accepted -> Settled, with
//! Rejected and Cancelled exits) but every resource movement is a
//! mutation the registry pushes to the owning villager through a
//! [`VillagerGateway`].
//!
//! Escrow discipline: the counterparty's obligation is debited at
//! Accept, the initiator's at its own Confirm. Settlement credits both
//! entitlements and flips the record to Settled only when both credit
//! calls succeed. A settlement where one credit landed and the other did
//! not is an operator-visible fault: logged at error, no compensation,
//! and the trade is frozen against further confirms and cancels.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use hamlet_types::{
    CurrencyMutation, HamletError, ItemMutation, NodeId, Result, TradeId, TradeObligation,
    TradeOffer, TradeRequest, TradeSide, TradeStatus,
};

/// Mutation seam toward the villagers. The HTTP implementation lives in
/// hamlet-client; tests substitute an in-memory one.
#[async_trait::async_trait]
pub trait VillagerGateway: Send + Sync {
    /// Debit currency (escrow lock). Must fail rather than overdraw.
    async fn pay(&self, address: &str, mutation: &CurrencyMutation) -> Result<()>;
    /// Credit currency as settlement proceeds.
    async fn receive(&self, address: &str, mutation: &CurrencyMutation) -> Result<()>;
    /// Credit currency back after a teardown.
    async fn refund(&self, address: &str, mutation: &CurrencyMutation) -> Result<()>;
    /// Remove items (escrow lock). Must fail rather than go negative.
    async fn take_items(&self, address: &str, mutation: &ItemMutation) -> Result<()>;
    /// Add items, as settlement proceeds or as a refund.
    async fn grant_items(&self, address: &str, mutation: &ItemMutation) -> Result<()>;
}

#[derive(Default)]
struct RegistryState {
    /// Node id -> base URL, learned at registration and from requests
    directory: HashMap<NodeId, String>,
    active: HashMap<TradeId, TradeOffer>,
    /// Terminal trades, kept for idempotent lookups
    completed: HashMap<TradeId, TradeOffer>,
    /// Trades where one settlement credit landed and the other failed.
    /// Frozen until an operator intervenes.
    faulted: HashSet<TradeId>,
}

/// The single holder of mediated-trade state.
pub struct TradeRegistry {
    state: RwLock<RegistryState>,
    gateway: Arc<dyn VillagerGateway>,
}

impl TradeRegistry {
    pub fn new(gateway: Arc<dyn VillagerGateway>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            gateway,
        }
    }

    /// Idempotent upsert into the party directory.
    pub async fn register_party(&self, id: NodeId, address: String) {
        let mut state = self.state.write().await;
        info!(%id, %address, "trade party registered");
        state.directory.insert(id, address);
    }

    /// Open a mediated trade. The counterparty must already be known to
    /// the registry; the initiator's address is taken from the request.
    pub async fn open_trade(&self, request: &TradeRequest) -> Result<TradeOffer> {
        if request.quantity == 0 {
            return Err(HamletError::validation("quantity", "must be at least 1"));
        }
        let mut state = self.state.write().await;
        if !state.directory.contains_key(&request.counterparty) {
            return Err(HamletError::not_found(
                "party",
                request.counterparty.to_string(),
            ));
        }
        state
            .directory
            .insert(request.initiator.clone(), request.initiator_address.clone());

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
        info!(trade_id = %offer.id, initiator = %offer.initiator, counterparty = %offer.counterparty, "mediated trade opened");
        state.active.insert(offer.id.clone(), offer.clone());
        Ok(offer)
    }

    pub async fn get(&self, id: &TradeId) -> Option<TradeOffer> {
        let state = self.state.read().await;
        state
            .active
            .get(id)
            .or_else(|| state.completed.get(id))
            .cloned()
    }

    /// Live trades a node is party to.
    pub async fn trades_for(&self, node: &NodeId) -> Vec<TradeOffer> {
        let state = self.state.read().await;
        state
            .active
            .values()
            .filter(|o| &o.initiator == node || &o.counterparty == node)
            .cloned()
            .collect()
    }

    /// Accept a pending trade, escrowing the counterparty's obligation.
    pub async fn accept(&self, id: &TradeId, caller: &NodeId) -> Result<TradeOffer> {
        let mut state = self.state.write().await;
        let offer = active_trade(&state, id)?;
        if side_of(&offer, caller)? != TradeSide::Counterparty {
            return Err(HamletError::validation(
                "caller",
                "only the counterparty may accept",
            ));
        }
        if offer.status != TradeStatus::Pending {
            return Err(invalid_status("pending", offer.status));
        }

        let address = address_of(&state, caller)?;
        self.debit(&address, id, &offer.obligation_of(TradeSide::Counterparty))
            .await?;

        let offer = state.active.get_mut(id).ok_or_else(|| trade_gone(id))?;
        offer.status = TradeStatus::Accepted;
        info!(trade_id = %id, %caller, "mediated trade accepted; counterparty escrowed");
        Ok(offer.clone())
    }

    /// Decline a pending trade. No resource has moved yet.
    pub async fn reject(&self, id: &TradeId, caller: &NodeId) -> Result<TradeOffer> {
        let mut state = self.state.write().await;
        let offer = active_trade(&state, id)?;
        if side_of(&offer, caller)? != TradeSide::Counterparty {
            return Err(HamletError::validation(
                "caller",
                "only the counterparty may reject",
            ));
        }
        if offer.status != TradeStatus::Pending {
            return Err(invalid_status("pending", offer.status));
        }
        let offer = retire(&mut state, id, TradeStatus::Rejected)?;
        info!(trade_id = %id, %caller, "mediated trade rejected");
        Ok(offer)
    }

    /// Record one side's confirmation; settle once both are in.
    ///
    /// The initiator's obligation is escrowed on its first confirm. A
    /// confirm repeated after a settlement attempt where no credit
    /// landed retries the settlement; a partially settled trade is
    /// frozen and refuses the call.
    pub async fn confirm(&self, id: &TradeId, caller: &NodeId) -> Result<TradeOffer> {
        let mut state = self.state.write().await;
        let offer = active_trade(&state, id)?;
        if state.faulted.contains(id) {
            return Err(settlement_faulted(id));
        }
        let side = side_of(&offer, caller)?;
        if offer.status != TradeStatus::Accepted {
            return Err(invalid_status("accepted", offer.status));
        }
        if offer.confirmed(side) && !offer.fully_confirmed() {
            return Err(HamletError::validation(
                "caller",
                format!("{side} already confirmed"),
            ));
        }

        if side == TradeSide::Initiator && !offer.resources_locked {
            let address = address_of(&state, caller)?;
            self.debit(&address, id, &offer.obligation_of(TradeSide::Initiator))
                .await?;
            let offer = state.active.get_mut(id).ok_or_else(|| trade_gone(id))?;
            offer.resources_locked = true;
        }
        let offer = state.active.get_mut(id).ok_or_else(|| trade_gone(id))?;
        offer.set_confirmed(side);

        if !offer.fully_confirmed() {
            return Ok(offer.clone());
        }
        self.settle(&mut state, id).await
    }

    /// Withdraw a trade as its initiator, releasing every escrow taken
    /// so far.
    pub async fn cancel(&self, id: &TradeId, caller: &NodeId) -> Result<TradeOffer> {
        let mut state = self.state.write().await;
        let offer = active_trade(&state, id)?;
        if state.faulted.contains(id) {
            // Refunding escrow that was already paid out would compound
            // the fault.
            return Err(settlement_faulted(id));
        }
        if side_of(&offer, caller)? != TradeSide::Initiator {
            return Err(HamletError::validation(
                "caller",
                "only the initiator may cancel",
            ));
        }
        if offer.status.is_terminal() {
            return Err(invalid_status("pending or accepted", offer.status));
        }

        if offer.status == TradeStatus::Accepted {
            let address = address_of(&state, &offer.counterparty)?;
            self.release(&address, id, &offer.obligation_of(TradeSide::Counterparty))
                .await;
        }
        if offer.resources_locked {
            let address = address_of(&state, &offer.initiator)?;
            self.release(&address, id, &offer.obligation_of(TradeSide::Initiator))
                .await;
        }
        let offer = retire(&mut state, id, TradeStatus::Cancelled)?;
        info!(trade_id = %id, %caller, "mediated trade cancelled");
        Ok(offer)
    }

    /// Credit both entitlements, then retire the trade as Settled.
    ///
    /// If the first credit fails, nothing moved and the trade stays
    /// Accepted and fully confirmed, so a repeated confirm retries the
    /// whole settlement. If the first lands and the second fails, the
    /// escrow is lopsided and retrying would credit the initiator twice:
    /// the trade is marked faulted, logged at error with both legs
    /// identified, and frozen for the operator. No compensation is
    /// attempted.
    async fn settle(&self, state: &mut RegistryState, id: &TradeId) -> Result<TradeOffer> {
        let offer = active_trade(state, id)?;
        let initiator_address = address_of(state, &offer.initiator)?;
        let counterparty_address = address_of(state, &offer.counterparty)?;

        self.credit(&initiator_address, id, &offer.entitlement_of(TradeSide::Initiator))
            .await?;
        if let Err(err) = self
            .credit(
                &counterparty_address,
                id,
                &offer.entitlement_of(TradeSide::Counterparty),
            )
            .await
        {
            state.faulted.insert(id.clone());
            error!(trade_id = %id,
                initiator = %offer.initiator, counterparty = %offer.counterparty, %err,
                "partial settlement: initiator credited, counterparty not; trade frozen");
            return Err(err);
        }

        let offer = retire(state, id, TradeStatus::Settled)?;
        info!(trade_id = %id, item = %offer.item, quantity = offer.quantity, price = offer.price,
            "mediated trade settled");
        Ok(offer)
    }

    async fn debit(&self, address: &str, id: &TradeId, what: &TradeObligation) -> Result<()> {
        match what {
            TradeObligation::Currency(amount) => {
                self.gateway
                    .pay(
                        address,
                        &CurrencyMutation {
                            trade_id: id.clone(),
                            amount: *amount,
                        },
                    )
                    .await
            }
            TradeObligation::Items(item, quantity) => {
                self.gateway
                    .take_items(
                        address,
                        &ItemMutation {
                            trade_id: id.clone(),
                            item: item.clone(),
                            quantity: *quantity,
                        },
                    )
                    .await
            }
        }
    }

    async fn credit(&self, address: &str, id: &TradeId, what: &TradeObligation) -> Result<()> {
        match what {
            TradeObligation::Currency(amount) => {
                self.gateway
                    .receive(
                        address,
                        &CurrencyMutation {
                            trade_id: id.clone(),
                            amount: *amount,
                        },
                    )
                    .await
            }
            TradeObligation::Items(item, quantity) => {
                self.gateway
                    .grant_items(
                        address,
                        &ItemMutation {
                            trade_id: id.clone(),
                            item: item.clone(),
                            quantity: *quantity,
                        },
                    )
                    .await
            }
        }
    }

    /// Best-effort escrow release during a cancel. A failed refund is an
    /// operator-visible fault, not a blocker.
    async fn release(&self, address: &str, id: &TradeId, what: &TradeObligation) {
        let result = match what {
            TradeObligation::Currency(amount) => {
                self.gateway
                    .refund(
                        address,
                        &CurrencyMutation {
                            trade_id: id.clone(),
                            amount: *amount,
                        },
                    )
                    .await
            }
            TradeObligation::Items(item, quantity) => {
                self.gateway
                    .grant_items(
                        address,
                        &ItemMutation {
                            trade_id: id.clone(),
                            item: item.clone(),
                            quantity: *quantity,
                        },
                    )
                    .await
            }
        };
        if let Err(err) = result {
            error!(trade_id = %id, %address, %err, "escrow refund undeliverable");
        }
    }
}

fn active_trade(state: &RegistryState, id: &TradeId) -> Result<TradeOffer> {
    if let Some(offer) = state.active.get(id) {
        return Ok(offer.clone());
    }
    if let Some(offer) = state.completed.get(id) {
        // Completed trades are visible but immutable.
        return Err(invalid_status("pending or accepted", offer.status));
    }
    Err(HamletError::not_found("trade", id.to_string()))
}

fn side_of(offer: &TradeOffer, caller: &NodeId) -> Result<TradeSide> {
    if caller == &offer.initiator {
        Ok(TradeSide::Initiator)
    } else if caller == &offer.counterparty {
        Ok(TradeSide::Counterparty)
    } else {
        Err(HamletError::validation(
            "caller",
            format!("{caller} is not a party to this trade"),
        ))
    }
}

fn address_of(state: &RegistryState, node: &NodeId) -> Result<String> {
    state
        .directory
        .get(node)
        .cloned()
        .ok_or_else(|| HamletError::not_found("party", node.to_string()))
}

fn invalid_status(expected: &str, actual: TradeStatus) -> HamletError {
    HamletError::InvalidState {
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

fn settlement_faulted(id: &TradeId) -> HamletError {
    warn!(trade_id = %id, "operation refused: trade is partially settled");
    HamletError::InvalidState {
        expected: "accepted".to_string(),
        actual: "partially settled; operator intervention required".to_string(),
    }
}

/// An active trade vanished between the check and the mutation. Cannot
/// happen under the single write lock; surfaced as NotFound regardless.
fn trade_gone(id: &TradeId) -> HamletError {
    warn!(trade_id = %id, "active trade disappeared mid-operation");
    HamletError::not_found("trade", id.to_string())
}

fn retire(state: &mut RegistryState, id: &TradeId, status: TradeStatus) -> Result<TradeOffer> {
    let mut offer = state.active.remove(id).ok_or_else(|| trade_gone(id))?;
    offer.status = status;
    state.completed.insert(id.clone(), offer.clone());
    Ok(offer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hamlet_economy::EconomicState;
    use hamlet_types::{ItemKind, TradeDirection};
    use std::sync::Mutex;

    /// In-memory gateway over a map of address -> economic state.
    struct LedgerGateway {
        ledgers: Mutex<HashMap<String, EconomicState>>,
        /// Addresses whose credits fail, to exercise partial settlement
        credit_failures: Mutex<Vec<String>>,
    }

    impl LedgerGateway {
        fn new(parties: Vec<(&str, EconomicState)>) -> Self {
            Self {
                ledgers: Mutex::new(
                    parties
                        .into_iter()
                        .map(|(a, e)| (a.to_string(), e))
                        .collect(),
                ),
                credit_failures: Mutex::new(Vec::new()),
            }
        }

        fn with<T>(&self, address: &str, f: impl FnOnce(&mut EconomicState) -> Result<T>) -> Result<T> {
            let mut ledgers = self.ledgers.lock().unwrap();
            let econ = ledgers
                .get_mut(address)
                .ok_or_else(|| HamletError::unreachable(address, "unknown ledger"))?;
            f(econ)
        }

        fn check_credit(&self, address: &str) -> Result<()> {
            if self.credit_failures.lock().unwrap().iter().any(|a| a == address) {
                return Err(HamletError::unreachable(address, "credit failure injected"));
            }
            Ok(())
        }

        fn currency(&self, address: &str) -> u64 {
            self.ledgers.lock().unwrap()[address].currency()
        }

        fn count(&self, address: &str, item: &ItemKind) -> u64 {
            self.ledgers.lock().unwrap()[address].count(item)
        }
    }

    #[async_trait::async_trait]
    impl VillagerGateway for LedgerGateway {
        async fn pay(&self, address: &str, mutation: &CurrencyMutation) -> Result<()> {
            self.with(address, |econ| econ.spend_currency(mutation.amount))
        }
        async fn receive(&self, address: &str, mutation: &CurrencyMutation) -> Result<()> {
            self.check_credit(address)?;
            self.with(address, |econ| {
                econ.credit_currency(mutation.amount);
                Ok(())
            })
        }
        async fn refund(&self, address: &str, mutation: &CurrencyMutation) -> Result<()> {
            self.with(address, |econ| {
                econ.credit_currency(mutation.amount);
                Ok(())
            })
        }
        async fn take_items(&self, address: &str, mutation: &ItemMutation) -> Result<()> {
            self.with(address, |econ| {
                econ.remove_items(&mutation.item, mutation.quantity)
            })
        }
        async fn grant_items(&self, address: &str, mutation: &ItemMutation) -> Result<()> {
            self.check_credit(address)?;
            self.with(address, |econ| {
                econ.add_items(mutation.item.clone(), mutation.quantity);
                Ok(())
            })
        }
    }

    fn alice() -> NodeId {
        NodeId::new("alice")
    }

    fn bob() -> NodeId {
        NodeId::new("bob")
    }

    fn wheat_sale() -> TradeRequest {
        TradeRequest {
            initiator: alice(),
            initiator_address: "http://alice".to_string(),
            counterparty: bob(),
            item: ItemKind::wheat(),
            quantity: 5,
            price: 50,
            direction: TradeDirection::InitiatorSells,
        }
    }

    async fn registry_with(gateway: Arc<LedgerGateway>) -> TradeRegistry {
        let registry = TradeRegistry::new(gateway);
        registry.register_party(bob(), "http://bob".to_string()).await;
        registry
    }

    fn scenario_gateway() -> Arc<LedgerGateway> {
        let mut alice_econ = EconomicState::new(100);
        alice_econ.add_items(ItemKind::wheat(), 10);
        let bob_econ = EconomicState::new(100);
        Arc::new(LedgerGateway::new(vec![
            ("http://alice", alice_econ),
            ("http://bob", bob_econ),
        ]))
    }

    #[tokio::test]
    async fn test_mediated_trade_settles_and_conserves_value() {
        let gateway = scenario_gateway();
        let registry = registry_with(gateway.clone()).await;

        let offer = registry.open_trade(&wheat_sale()).await.unwrap();
        registry.accept(&offer.id, &bob()).await.unwrap();
        // Bob's payment is escrowed at accept.
        assert_eq!(gateway.currency("http://bob"), 50);

        registry.confirm(&offer.id, &bob()).await.unwrap();
        let settled = registry.confirm(&offer.id, &alice()).await.unwrap();
        assert_eq!(settled.status, TradeStatus::Settled);

        assert_eq!(gateway.currency("http://alice"), 150);
        assert_eq!(gateway.count("http://alice", &ItemKind::wheat()), 5);
        assert_eq!(gateway.currency("http://bob"), 50);
        assert_eq!(gateway.count("http://bob", &ItemKind::wheat()), 5);

        // Terminal record is still readable but immutable.
        assert_eq!(registry.get(&offer.id).await.unwrap().status, TradeStatus::Settled);
        let err = registry.confirm(&offer.id, &alice()).await.unwrap_err();
        assert!(matches!(err, HamletError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_accept_fails_without_balance_and_stays_pending() {
        let gateway = Arc::new(LedgerGateway::new(vec![
            ("http://alice", EconomicState::new(100)),
            ("http://bob", EconomicState::new(10)),
        ]));
        let registry = registry_with(gateway.clone()).await;

        let offer = registry.open_trade(&wheat_sale()).await.unwrap();
        let err = registry.accept(&offer.id, &bob()).await.unwrap_err();
        assert!(matches!(err, HamletError::InsufficientResource { .. }));

        assert_eq!(gateway.currency("http://bob"), 10);
        assert_eq!(registry.get(&offer.id).await.unwrap().status, TradeStatus::Pending);
    }

    #[tokio::test]
    async fn test_only_counterparty_accepts_only_initiator_cancels() {
        let gateway = scenario_gateway();
        let registry = registry_with(gateway).await;
        let offer = registry.open_trade(&wheat_sale()).await.unwrap();

        let err = registry.accept(&offer.id, &alice()).await.unwrap_err();
        assert!(matches!(err, HamletError::Validation { .. }));
        let err = registry.cancel(&offer.id, &bob()).await.unwrap_err();
        assert!(matches!(err, HamletError::Validation { .. }));
        let err = registry
            .accept(&offer.id, &NodeId::new("mallory"))
            .await
            .unwrap_err();
        assert!(matches!(err, HamletError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_reject_moves_nothing() {
        let gateway = scenario_gateway();
        let registry = registry_with(gateway.clone()).await;
        let offer = registry.open_trade(&wheat_sale()).await.unwrap();

        let rejected = registry.reject(&offer.id, &bob()).await.unwrap();
        assert_eq!(rejected.status, TradeStatus::Rejected);
        assert_eq!(gateway.currency("http://alice"), 100);
        assert_eq!(gateway.currency("http://bob"), 100);
    }

    #[tokio::test]
    async fn test_cancel_after_accept_refunds_counterparty() {
        let gateway = scenario_gateway();
        let registry = registry_with(gateway.clone()).await;
        let offer = registry.open_trade(&wheat_sale()).await.unwrap();
        registry.accept(&offer.id, &bob()).await.unwrap();
        assert_eq!(gateway.currency("http://bob"), 50);

        let cancelled = registry.cancel(&offer.id, &alice()).await.unwrap();
        assert_eq!(cancelled.status, TradeStatus::Cancelled);
        assert_eq!(gateway.currency("http://bob"), 100);
    }

    #[tokio::test]
    async fn test_cancel_after_initiator_confirm_refunds_both_escrows() {
        let gateway = scenario_gateway();
        let registry = registry_with(gateway.clone()).await;
        let offer = registry.open_trade(&wheat_sale()).await.unwrap();
        registry.accept(&offer.id, &bob()).await.unwrap();
        registry.confirm(&offer.id, &alice()).await.unwrap();
        // Alice's wheat and Bob's currency are both in escrow.
        assert_eq!(gateway.count("http://alice", &ItemKind::wheat()), 5);
        assert_eq!(gateway.currency("http://bob"), 50);

        registry.cancel(&offer.id, &alice()).await.unwrap();
        assert_eq!(gateway.count("http://alice", &ItemKind::wheat()), 10);
        assert_eq!(gateway.currency("http://bob"), 100);
    }

    #[tokio::test]
    async fn test_partial_settlement_freezes_the_trade() {
        let gateway = scenario_gateway();
        let registry = registry_with(gateway.clone()).await;
        let offer = registry.open_trade(&wheat_sale()).await.unwrap();
        registry.accept(&offer.id, &bob()).await.unwrap();
        registry.confirm(&offer.id, &alice()).await.unwrap();

        // The second credit (to bob) fails after the first landed.
        gateway.credit_failures.lock().unwrap().push("http://bob".to_string());
        let err = registry.confirm(&offer.id, &bob()).await.unwrap_err();
        assert!(matches!(err, HamletError::Unreachable { .. }));

        // Initiator was credited exactly once; counterparty escrow held.
        assert_eq!(gateway.currency("http://alice"), 150);
        assert_eq!(gateway.currency("http://bob"), 50);

        // The fault blocks further confirms and cancels even once the
        // counterparty is reachable again; a retry would credit the
        // initiator a second time.
        gateway.credit_failures.lock().unwrap().clear();
        let err = registry.confirm(&offer.id, &bob()).await.unwrap_err();
        assert!(matches!(err, HamletError::InvalidState { .. }));
        let err = registry.cancel(&offer.id, &alice()).await.unwrap_err();
        assert!(matches!(err, HamletError::InvalidState { .. }));

        // No currency minted across the pair.
        assert_eq!(gateway.currency("http://alice"), 150);
        assert_eq!(gateway.currency("http://bob"), 50);
        assert_eq!(
            gateway.currency("http://alice") + gateway.currency("http://bob"),
            200
        );
    }

    #[tokio::test]
    async fn test_settlement_retries_when_no_credit_landed() {
        let gateway = scenario_gateway();
        let registry = registry_with(gateway.clone()).await;
        let offer = registry.open_trade(&wheat_sale()).await.unwrap();
        registry.accept(&offer.id, &bob()).await.unwrap();
        registry.confirm(&offer.id, &alice()).await.unwrap();

        // The first credit (to alice) fails: nothing moved, the trade
        // stays live and a repeated confirm retries the settlement.
        gateway.credit_failures.lock().unwrap().push("http://alice".to_string());
        let err = registry.confirm(&offer.id, &bob()).await.unwrap_err();
        assert!(matches!(err, HamletError::Unreachable { .. }));
        assert_eq!(gateway.currency("http://alice"), 100);
        assert_eq!(registry.get(&offer.id).await.unwrap().status, TradeStatus::Accepted);

        gateway.credit_failures.lock().unwrap().clear();
        let settled = registry.confirm(&offer.id, &bob()).await.unwrap();
        assert_eq!(settled.status, TradeStatus::Settled);
        assert_eq!(gateway.currency("http://alice"), 150);
        assert_eq!(gateway.count("http://bob", &ItemKind::wheat()), 5);
    }

    #[tokio::test]
    async fn test_open_trade_requires_known_counterparty() {
        let gateway = scenario_gateway();
        let registry = TradeRegistry::new(gateway);
        let err = registry.open_trade(&wheat_sale()).await.unwrap_err();
        assert!(matches!(err, HamletError::NotFound { .. }));
    }
}
