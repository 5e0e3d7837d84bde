//! The villager node core
//!
//! All state lives behind one write lock; every operation is
//! check-then-mutate. Barrier-coupled actions (produce, sleep, idle)
//! submit to the coordinator *between* their guards and their mutation,
//! so a coordinator rejection can never strand a half-applied action.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use hamlet_economy::{
    recipe_for, EconomicState, DAILY_HUNGER, EAT_RESTORE, MAX_STAMINA, NO_SLEEP_PENALTY,
    SLEEP_RESTORE,
};
use hamlet_trade::{apply_merchant_exchange, TradeBook, TradeNotice};
use hamlet_types::{
    ActionTag, CurrencyMutation, HamletError, ItemKind, ItemMutation, MerchantExchangeRequest,
    NodeId, Occupation, Period, Result, SubmitActionRequest, SubmitActionResponse,
    TimeAdvanceNotice, TradeAcceptedNotice, TradeConfirmNotice, TradeDirection, TradeId,
    TradeOffer, TradeRefundNotice, TradeRequest, TradeSettledNotice, TradeStatus, VillagerInfo,
};

/// Barrier seam: how the villager reaches the coordinator.
#[async_trait::async_trait]
pub trait CoordinatorHandle: Send + Sync {
    async fn submit_action(&self, request: SubmitActionRequest) -> Result<SubmitActionResponse>;
}

/// Peer seam: opening offers on a counterparty and delivering the
/// fire-and-forget trade notices.
#[async_trait::async_trait]
pub trait PeerNotifier: Send + Sync {
    async fn request_offer(&self, peer_address: &str, request: &TradeRequest) -> Result<TradeId>;
    async fn deliver(&self, notice: &TradeNotice) -> Result<()>;
}

/// Merchant seam: the remote fixed-price exchange call.
#[async_trait::async_trait]
pub trait MerchantClient: Send + Sync {
    async fn exchange(
        &self,
        merchant_address: &str,
        request: &MerchantExchangeRequest,
    ) -> Result<u64>;
}

/// Static identity of one villager node.
#[derive(Debug, Clone)]
pub struct VillagerConfig {
    pub id: NodeId,
    pub display_name: String,
    pub occupation: Occupation,
    /// Base URL this node listens on; sent with trade requests so peers
    /// can push notices back
    pub address: String,
    pub starting_currency: u64,
    pub starting_items: Vec<(ItemKind, u64)>,
}

struct Inner {
    econ: EconomicState,
    book: TradeBook,
}

/// One villager node.
pub struct Villager {
    config: VillagerConfig,
    inner: RwLock<Inner>,
    coordinator: Arc<dyn CoordinatorHandle>,
    peers: Arc<dyn PeerNotifier>,
    merchant: Arc<dyn MerchantClient>,
}

impl Villager {
    pub fn new(
        config: VillagerConfig,
        coordinator: Arc<dyn CoordinatorHandle>,
        peers: Arc<dyn PeerNotifier>,
        merchant: Arc<dyn MerchantClient>,
    ) -> Self {
        let mut econ = EconomicState::new(config.starting_currency);
        for (item, quantity) in &config.starting_items {
            econ.add_items(item.clone(), *quantity);
        }
        Self {
            config,
            inner: RwLock::new(Inner {
                econ,
                book: TradeBook::new(),
            }),
            coordinator,
            peers,
            merchant,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.config.id
    }

    pub fn address(&self) -> &str {
        &self.config.address
    }

    /// Villager info snapshot.
    pub async fn info(&self) -> VillagerInfo {
        let inner = self.inner.read().await;
        VillagerInfo {
            name: self.config.display_name.clone(),
            occupation: self.config.occupation,
            stamina: inner.econ.stamina(),
            max_stamina: MAX_STAMINA,
            currency: inner.econ.currency(),
            items: inner.econ.items(),
            has_slept_today: inner.econ.has_slept_today,
            has_acted_this_period: inner.econ.has_acted_this_period,
        }
    }

    // ------------------------------------------------------------------
    // Local actions (barrier-coupled)
    // ------------------------------------------------------------------

    /// Produce according to this villager's occupation recipe and submit
    /// `work` as the period's barrier action.
    pub async fn produce(&self) -> Result<String> {
        let mut inner = self.inner.write().await;
        if inner.econ.has_acted_this_period {
            return Err(self.already_acted());
        }

        let recipe = recipe_for(self.config.occupation).ok_or_else(|| {
            HamletError::validation(
                "occupation",
                format!("{} has no production recipe", self.config.occupation),
            )
        })?;
        if inner.econ.stamina() < recipe.stamina_cost {
            return Err(HamletError::insufficient(
                "stamina",
                recipe.stamina_cost,
                inner.econ.stamina(),
            ));
        }
        for (item, quantity) in &recipe.inputs {
            let held = inner.econ.count(item);
            if held < *quantity {
                return Err(HamletError::insufficient(item.as_str(), *quantity, held));
            }
        }

        self.submit(ActionTag::Work).await?;

        // Guards passed and the action was accepted; apply atomically.
        inner.econ.spend_stamina(recipe.stamina_cost)?;
        for (item, quantity) in &recipe.inputs {
            inner.econ.remove_items(item, *quantity)?;
        }
        inner.econ.add_items(recipe.output.clone(), recipe.output_qty);
        inner.econ.has_acted_this_period = true;

        info!(
            occupation = %self.config.occupation,
            output = %recipe.output,
            quantity = recipe.output_qty,
            "production complete"
        );
        Ok(format!("produced {} {}", recipe.output_qty, recipe.output))
    }

    /// Sleep for the night and submit `sleep` as the barrier action.
    pub async fn sleep(&self) -> Result<String> {
        let mut inner = self.inner.write().await;
        if inner.econ.has_acted_this_period {
            return Err(self.already_acted());
        }
        if inner.econ.has_slept_today {
            return Err(HamletError::AlreadySlept);
        }
        let sheltered = inner.econ.count(&ItemKind::house()) > 0
            || inner.econ.count(&ItemKind::temp_room()) > 0;
        if !sheltered {
            return Err(HamletError::NoShelter);
        }

        self.submit(ActionTag::Sleep).await?;

        inner.econ.restore_stamina(SLEEP_RESTORE);
        inner.econ.has_slept_today = true;
        inner.econ.has_acted_this_period = true;
        Ok(format!("slept; stamina now {}", inner.econ.stamina()))
    }

    /// Explicitly pass the period without doing anything.
    pub async fn idle(&self) -> Result<String> {
        let mut inner = self.inner.write().await;
        if inner.econ.has_acted_this_period {
            return Err(self.already_acted());
        }
        self.submit(ActionTag::Idle).await?;
        inner.econ.has_acted_this_period = true;
        Ok("idled this period".to_string())
    }

    /// Eat one bread. Local only; never touches the barrier.
    pub async fn eat(&self) -> Result<String> {
        let mut inner = self.inner.write().await;
        if inner.econ.count(&ItemKind::bread()) == 0 {
            return Err(HamletError::NoFood);
        }
        inner.econ.remove_items(&ItemKind::bread(), 1)?;
        inner.econ.restore_stamina(EAT_RESTORE);
        Ok(format!("ate bread; stamina now {}", inner.econ.stamina()))
    }

    /// Apply a pushed time-advance notice.
    ///
    /// A new morning settles the daily bookkeeping: the no-sleep penalty,
    /// hunger, a consumed temp_room voucher, and the daily flags. Every
    /// advance clears the per-period action flag.
    pub async fn apply_period_advance(&self, notice: &TimeAdvanceNotice) {
        let mut inner = self.inner.write().await;
        if notice.period == Period::Morning {
            if !inner.econ.has_slept_today {
                inner.econ.sap_stamina(NO_SLEEP_PENALTY);
                warn!(node = %self.config.id, "went without sleep; stamina penalty applied");
            }
            inner.econ.sap_stamina(DAILY_HUNGER);
            if inner.econ.count(&ItemKind::temp_room()) > 0 {
                let _ = inner.econ.remove_items(&ItemKind::temp_room(), 1);
            }
            inner.econ.has_slept_today = false;
        }
        inner.econ.has_acted_this_period = false;
        info!(node = %self.config.id, day = notice.day, period = %notice.period, "period advanced");
    }

    // ------------------------------------------------------------------
    // Merchant trading
    // ------------------------------------------------------------------

    /// Trade against another node's fixed-price merchant counter.
    ///
    /// Buys pre-deduct the total and refund it if the remote exchange
    /// fails; sells move items only after the remote exchange succeeded.
    pub async fn trade_with_merchant(
        &self,
        merchant_address: &str,
        item: ItemKind,
        quantity: u64,
        direction: TradeDirection,
    ) -> Result<String> {
        let unit_price = hamlet_economy::price_of(&item).ok_or_else(|| {
            HamletError::validation("item", format!("{item} has no fixed price"))
        })?;
        let total = unit_price
            .checked_mul(quantity)
            .ok_or_else(|| HamletError::validation("quantity", "total price overflows"))?;
        let request = MerchantExchangeRequest {
            party: self.config.id.clone(),
            item: item.clone(),
            quantity,
            direction,
        };

        let mut inner = self.inner.write().await;
        match direction {
            TradeDirection::InitiatorBuys => {
                inner.econ.spend_currency(total)?;
                match self.merchant.exchange(merchant_address, &request).await {
                    Ok(_) => {
                        inner.econ.add_items(item.clone(), quantity);
                        Ok(format!("bought {quantity} {item} for {total}"))
                    }
                    Err(err) => {
                        // Remote failure after the pre-deduction: refund.
                        inner.econ.credit_currency(total);
                        Err(err)
                    }
                }
            }
            TradeDirection::InitiatorSells => {
                let held = inner.econ.count(&item);
                if held < quantity {
                    return Err(HamletError::insufficient(item.as_str(), quantity, held));
                }
                self.merchant.exchange(merchant_address, &request).await?;
                if let Err(err) = inner.econ.remove_items(&item, quantity) {
                    // The exchange already went through remotely; this is
                    // the documented partial-transfer window.
                    error!(%item, quantity, %err, "sold items vanished before handover");
                    return Err(err);
                }
                inner.econ.credit_currency(total);
                Ok(format!("sold {quantity} {item} for {total}"))
            }
        }
    }

    /// Serve one exchange against this node's own merchant counter.
    pub async fn serve_merchant_exchange(&self, request: &MerchantExchangeRequest) -> Result<u64> {
        let mut inner = self.inner.write().await;
        apply_merchant_exchange(&mut inner.econ, request)
    }

    // ------------------------------------------------------------------
    // Peer-to-peer trade handshake
    // ------------------------------------------------------------------

    /// Initiate a trade: open the offer on the counterparty and mirror it
    /// locally under the id the counterparty assigned.
    pub async fn request_trade(
        &self,
        counterparty: NodeId,
        counterparty_address: String,
        item: ItemKind,
        quantity: u64,
        price: u64,
        direction: TradeDirection,
    ) -> Result<TradeId> {
        let request = TradeRequest {
            initiator: self.config.id.clone(),
            initiator_address: self.config.address.clone(),
            counterparty: counterparty.clone(),
            item: item.clone(),
            quantity,
            price,
            direction,
        };
        let trade_id = self
            .peers
            .request_offer(&counterparty_address, &request)
            .await?;

        let mirror = TradeOffer {
            id: trade_id.clone(),
            initiator: self.config.id.clone(),
            initiator_address: self.config.address.clone(),
            counterparty,
            item,
            quantity,
            price,
            direction,
            status: TradeStatus::Pending,
            initiator_confirmed: false,
            counterparty_confirmed: false,
            resources_locked: false,
            created_at: Utc::now(),
        };
        let mut inner = self.inner.write().await;
        inner.book.record_sent_offer(mirror, counterparty_address);
        Ok(trade_id)
    }

    /// Inbound Request: create the Pending offer on this side.
    pub async fn on_trade_request(&self, request: &TradeRequest) -> Result<TradeOffer> {
        let mut inner = self.inner.write().await;
        let offer = inner.book.open_offer(request)?;
        info!(trade_id = %offer.id, initiator = %offer.initiator, "trade offer received");
        Ok(offer)
    }

    /// Accept a pending offer, locking this side's obligated resource.
    pub async fn accept_trade(&self, id: &TradeId) -> Result<TradeOffer> {
        let (offer, notices) = {
            let mut inner = self.inner.write().await;
            let Inner { econ, book } = &mut *inner;
            book.accept(econ, id)?
        };
        self.dispatch(notices);
        Ok(offer)
    }

    /// Confirm an accepted offer from this side; settles locally when
    /// both confirmations are in.
    pub async fn confirm_trade(&self, id: &TradeId) -> Result<TradeOffer> {
        let (offer, notices) = {
            let mut inner = self.inner.write().await;
            let Inner { econ, book } = &mut *inner;
            book.confirm(econ, id)?
        };
        self.dispatch(notices);
        Ok(offer)
    }

    /// Reject a pending offer. No resource movement.
    pub async fn reject_trade(&self, id: &TradeId) -> Result<TradeOffer> {
        let (offer, notices) = {
            let mut inner = self.inner.write().await;
            inner.book.reject(id)?
        };
        self.dispatch(notices);
        Ok(offer)
    }

    /// Cancel an offer this node initiated, refunding any locks.
    pub async fn cancel_trade(&self, id: &TradeId) -> Result<TradeOffer> {
        let (offer, notices) = {
            let mut inner = self.inner.write().await;
            let Inner { econ, book } = &mut *inner;
            book.cancel(econ, id)?
        };
        self.dispatch(notices);
        Ok(offer)
    }

    /// Inbound notice handlers. All are idempotent.
    pub async fn on_trade_accepted(&self, notice: &TradeAcceptedNotice) {
        let mut inner = self.inner.write().await;
        inner.book.apply_accepted_notice(notice);
    }

    pub async fn on_trade_confirm(&self, notice: &TradeConfirmNotice) {
        let provoked = {
            let mut inner = self.inner.write().await;
            let Inner { econ, book } = &mut *inner;
            book.apply_confirm_notice(econ, notice)
        };
        self.dispatch(provoked);
    }

    pub async fn on_trade_settled(&self, notice: &TradeSettledNotice) {
        let mut inner = self.inner.write().await;
        let Inner { econ, book } = &mut *inner;
        book.apply_settled_notice(econ, notice);
    }

    pub async fn on_trade_refund(&self, notice: &TradeRefundNotice) {
        let mut inner = self.inner.write().await;
        let Inner { econ, book } = &mut *inner;
        book.apply_refund_notice(econ, notice);
    }

    /// Offers awaiting this node's decision.
    pub async fn pending_trades(&self) -> Vec<TradeOffer> {
        self.inner.read().await.book.pending_trades()
    }

    /// Live offers this node initiated.
    pub async fn sent_trades(&self) -> Vec<TradeOffer> {
        self.inner.read().await.book.sent_trades()
    }

    pub async fn trade(&self, id: &TradeId) -> Option<TradeOffer> {
        self.inner.read().await.book.get(id).cloned()
    }

    // ------------------------------------------------------------------
    // Registry-issued mutations (centralized variant)
    // ------------------------------------------------------------------

    /// Debit currency on behalf of a mediated trade.
    pub async fn pay(&self, mutation: &CurrencyMutation) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.econ.spend_currency(mutation.amount)?;
        info!(trade_id = %mutation.trade_id, amount = mutation.amount, "paid for mediated trade");
        Ok(())
    }

    /// Credit currency (settlement proceeds) for a mediated trade.
    pub async fn receive_currency(&self, mutation: &CurrencyMutation) {
        let mut inner = self.inner.write().await;
        inner.econ.credit_currency(mutation.amount);
    }

    /// Credit currency back after a mediated trade was torn down.
    pub async fn refund_currency(&self, mutation: &CurrencyMutation) {
        let mut inner = self.inner.write().await;
        inner.econ.credit_currency(mutation.amount);
        info!(trade_id = %mutation.trade_id, amount = mutation.amount, "mediated trade refunded");
    }

    /// Remove items on behalf of a mediated trade.
    pub async fn take_items(&self, mutation: &ItemMutation) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.econ.remove_items(&mutation.item, mutation.quantity)
    }

    /// Add items (settlement proceeds or refunds) for a mediated trade.
    pub async fn grant_items(&self, mutation: &ItemMutation) {
        let mut inner = self.inner.write().await;
        inner.econ.add_items(mutation.item.clone(), mutation.quantity);
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn already_acted(&self) -> HamletError {
        HamletError::AlreadyActed {
            node: self.config.id.to_string(),
        }
    }

    async fn submit(&self, action: ActionTag) -> Result<SubmitActionResponse> {
        self.coordinator
            .submit_action(SubmitActionRequest {
                node_id: self.config.id.clone(),
                action,
            })
            .await
    }

    /// Fire-and-forget notice delivery; failures are logged, never
    /// retried. A lost notice is a liveness problem only.
    fn dispatch(&self, notices: Vec<TradeNotice>) {
        for notice in notices {
            let peers = Arc::clone(&self.peers);
            tokio::spawn(async move {
                if let Err(err) = peers.deliver(&notice).await {
                    warn!(peer = %notice.peer, address = %notice.peer_address, %err, "trade notice undeliverable");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Accepts every submission and records the tags.
    #[derive(Default)]
    struct AcceptingCoordinator {
        submitted: Mutex<Vec<ActionTag>>,
    }

    #[async_trait::async_trait]
    impl CoordinatorHandle for AcceptingCoordinator {
        async fn submit_action(&self, request: SubmitActionRequest) -> Result<SubmitActionResponse> {
            self.submitted.lock().unwrap().push(request.action);
            Ok(SubmitActionResponse {
                advanced: false,
                waiting_for: Vec::new(),
                new_time: None,
            })
        }
    }

    struct NoPeers;

    #[async_trait::async_trait]
    impl PeerNotifier for NoPeers {
        async fn request_offer(&self, peer: &str, _request: &TradeRequest) -> Result<TradeId> {
            Err(HamletError::unreachable(peer, "no peers in this test"))
        }
        async fn deliver(&self, _notice: &TradeNotice) -> Result<()> {
            Ok(())
        }
    }

    /// Merchant that accepts everything, or nothing.
    struct FixedMerchant {
        reachable: bool,
    }

    #[async_trait::async_trait]
    impl MerchantClient for FixedMerchant {
        async fn exchange(
            &self,
            merchant_address: &str,
            request: &MerchantExchangeRequest,
        ) -> Result<u64> {
            if !self.reachable {
                return Err(HamletError::unreachable(merchant_address, "connection refused"));
            }
            let unit = hamlet_economy::price_of(&request.item).unwrap();
            Ok(unit * request.quantity)
        }
    }

    fn farmer(items: Vec<(ItemKind, u64)>) -> (Arc<AcceptingCoordinator>, Villager) {
        let coordinator = Arc::new(AcceptingCoordinator::default());
        let villager = Villager::new(
            VillagerConfig {
                id: NodeId::new("alice"),
                display_name: "Alice".to_string(),
                occupation: Occupation::Farmer,
                address: "http://alice".to_string(),
                starting_currency: 100,
                starting_items: items,
            },
            coordinator.clone(),
            Arc::new(NoPeers),
            Arc::new(FixedMerchant { reachable: true }),
        );
        (coordinator, villager)
    }

    #[tokio::test]
    async fn test_produce_scenario() {
        // Scenario B: farmer with 1 seed and full stamina.
        let (coordinator, villager) = farmer(vec![(ItemKind::seed(), 1)]);

        villager.produce().await.unwrap();

        let info = villager.info().await;
        assert_eq!(info.items.get(&ItemKind::seed()), None);
        assert_eq!(info.items.get(&ItemKind::wheat()), Some(&5));
        assert_eq!(info.stamina, 80);
        assert!(info.has_acted_this_period);
        assert_eq!(coordinator.submitted.lock().unwrap().as_slice(), &[ActionTag::Work]);
    }

    #[tokio::test]
    async fn test_produce_guards_leave_state_untouched() {
        let (coordinator, villager) = farmer(vec![]); // no seed

        let err = villager.produce().await.unwrap_err();
        assert!(matches!(err, HamletError::InsufficientResource { .. }));

        let info = villager.info().await;
        assert_eq!(info.stamina, 100);
        assert!(!info.has_acted_this_period);
        // The guard failed before anything was submitted to the barrier.
        assert!(coordinator.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_action_rejected_locally() {
        let (_, villager) = farmer(vec![(ItemKind::seed(), 2)]);
        villager.produce().await.unwrap();

        let err = villager.produce().await.unwrap_err();
        assert!(matches!(err, HamletError::AlreadyActed { .. }));
        let err = villager.idle().await.unwrap_err();
        assert!(matches!(err, HamletError::AlreadyActed { .. }));
    }

    #[tokio::test]
    async fn test_sleep_requires_shelter() {
        let (_, villager) = farmer(vec![]);

        let err = villager.sleep().await.unwrap_err();
        assert!(matches!(err, HamletError::NoShelter));
        // Boundary: stamina unchanged on the failed sleep.
        assert_eq!(villager.info().await.stamina, 100);
    }

    #[tokio::test]
    async fn test_sleep_with_voucher() {
        let (_, villager) = farmer(vec![(ItemKind::temp_room(), 1)]);
        villager.sleep().await.unwrap();

        let info = villager.info().await;
        assert!(info.has_slept_today);
        assert!(info.has_acted_this_period);

        let err = villager.sleep().await.unwrap_err();
        assert!(matches!(err, HamletError::AlreadyActed { .. }));
    }

    #[tokio::test]
    async fn test_eat_consumes_bread() {
        let (_, villager) = farmer(vec![(ItemKind::bread(), 1), (ItemKind::seed(), 1)]);
        villager.produce().await.unwrap(); // down to 80 stamina

        villager.eat().await.unwrap();
        let info = villager.info().await;
        assert_eq!(info.stamina, 100); // 80 + 30 capped at 100
        assert_eq!(info.items.get(&ItemKind::bread()), None);

        let err = villager.eat().await.unwrap_err();
        assert!(matches!(err, HamletError::NoFood));
    }

    #[tokio::test]
    async fn test_morning_advance_applies_daily_bookkeeping() {
        let (_, villager) = farmer(vec![(ItemKind::temp_room(), 2), (ItemKind::seed(), 1)]);
        villager.produce().await.unwrap(); // stamina 80, acted

        // Morning without sleep: penalty 20 + hunger 10, voucher consumed,
        // flags cleared.
        villager
            .apply_period_advance(&TimeAdvanceNotice {
                day: 2,
                period: Period::Morning,
            })
            .await;

        let info = villager.info().await;
        assert_eq!(info.stamina, 50);
        assert_eq!(info.items.get(&ItemKind::temp_room()), Some(&1));
        assert!(!info.has_acted_this_period);
        assert!(!info.has_slept_today);
    }

    #[tokio::test]
    async fn test_non_morning_advance_only_clears_action_flag() {
        let (_, villager) = farmer(vec![(ItemKind::seed(), 1)]);
        villager.produce().await.unwrap();

        villager
            .apply_period_advance(&TimeAdvanceNotice {
                day: 1,
                period: Period::Evening,
            })
            .await;

        let info = villager.info().await;
        assert_eq!(info.stamina, 80); // no hunger outside mornings
        assert!(!info.has_acted_this_period);
    }

    #[tokio::test]
    async fn test_merchant_buy_refunds_on_unreachable() {
        let coordinator = Arc::new(AcceptingCoordinator::default());
        let villager = Villager::new(
            VillagerConfig {
                id: NodeId::new("alice"),
                display_name: "Alice".to_string(),
                occupation: Occupation::Farmer,
                address: "http://alice".to_string(),
                starting_currency: 100,
                starting_items: vec![],
            },
            coordinator,
            Arc::new(NoPeers),
            Arc::new(FixedMerchant { reachable: false }),
        );

        let err = villager
            .trade_with_merchant("http://merchant", ItemKind::bread(), 2, TradeDirection::InitiatorBuys)
            .await
            .unwrap_err();
        assert!(matches!(err, HamletError::Unreachable { .. }));

        // Pre-deducted total was refunded.
        let info = villager.info().await;
        assert_eq!(info.currency, 100);
        assert_eq!(info.items.get(&ItemKind::bread()), None);
    }

    #[tokio::test]
    async fn test_merchant_trade_rejects_overflowing_quantity() {
        let (_, villager) = farmer(vec![]);

        let err = villager
            .trade_with_merchant(
                "http://merchant",
                ItemKind::bread(),
                u64::MAX,
                TradeDirection::InitiatorBuys,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HamletError::Validation { .. }));
        // Rejected before the pre-deduction; nothing moved.
        assert_eq!(villager.info().await.currency, 100);
    }

    #[tokio::test]
    async fn test_merchant_buy_and_sell() {
        let (_, villager) = farmer(vec![(ItemKind::wheat(), 10)]);

        villager
            .trade_with_merchant("http://merchant", ItemKind::wheat(), 4, TradeDirection::InitiatorSells)
            .await
            .unwrap();
        let info = villager.info().await;
        assert_eq!(info.currency, 140); // 100 + 4 * 10
        assert_eq!(info.items.get(&ItemKind::wheat()), Some(&6));

        villager
            .trade_with_merchant("http://merchant", ItemKind::bread(), 2, TradeDirection::InitiatorBuys)
            .await
            .unwrap();
        let info = villager.info().await;
        assert_eq!(info.currency, 110); // 140 - 2 * 15
        assert_eq!(info.items.get(&ItemKind::bread()), Some(&2));
    }
}
