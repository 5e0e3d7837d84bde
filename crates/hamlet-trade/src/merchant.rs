//! Fixed-price merchant counter
//!
//! Every villager node serves a merchant exchange endpoint: a fixed-price
//! counterpart that trades out of the node's own ledger at table prices.
//! The serving side is implemented here; the calling side lives in the
//! villager core.

use hamlet_economy::{price_of, EconomicState};
use hamlet_types::{HamletError, MerchantExchangeRequest, Result, TradeDirection};
use tracing::info;

/// Apply one fixed-price exchange against the serving node's ledger.
///
/// `direction` is relative to the requesting party: `InitiatorBuys` means
/// the party buys from this counter (this ledger gives items, gains
/// currency); `InitiatorSells` is the reverse. Returns the total currency
/// moved. Check-then-mutate throughout.
pub fn apply_merchant_exchange(
    econ: &mut EconomicState,
    request: &MerchantExchangeRequest,
) -> Result<u64> {
    if request.quantity == 0 {
        return Err(HamletError::validation("quantity", "must be at least 1"));
    }
    let unit_price = price_of(&request.item).ok_or_else(|| {
        HamletError::validation("item", format!("{} has no fixed price", request.item))
    })?;
    let total = unit_price
        .checked_mul(request.quantity)
        .ok_or_else(|| HamletError::validation("quantity", "total price overflows"))?;

    match request.direction {
        TradeDirection::InitiatorBuys => {
            econ.remove_items(&request.item, request.quantity)?;
            econ.credit_currency(total);
        }
        TradeDirection::InitiatorSells => {
            econ.spend_currency(total)?;
            econ.add_items(request.item.clone(), request.quantity);
        }
    }

    info!(
        party = %request.party,
        item = %request.item,
        quantity = request.quantity,
        total,
        direction = %request.direction,
        "merchant exchange applied"
    );
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hamlet_types::{ItemKind, NodeId};

    fn request(item: ItemKind, quantity: u64, direction: TradeDirection) -> MerchantExchangeRequest {
        MerchantExchangeRequest {
            party: NodeId::new("alice"),
            item,
            quantity,
            direction,
        }
    }

    #[test]
    fn test_party_buys_from_counter() {
        let mut econ = EconomicState::new(0);
        econ.add_items(ItemKind::bread(), 5);

        let total =
            apply_merchant_exchange(&mut econ, &request(ItemKind::bread(), 2, TradeDirection::InitiatorBuys))
                .unwrap();

        assert_eq!(total, 30);
        assert_eq!(econ.count(&ItemKind::bread()), 3);
        assert_eq!(econ.currency(), 30);
    }

    #[test]
    fn test_party_sells_to_counter() {
        let mut econ = EconomicState::new(100);

        let total =
            apply_merchant_exchange(&mut econ, &request(ItemKind::wheat(), 4, TradeDirection::InitiatorSells))
                .unwrap();

        assert_eq!(total, 40);
        assert_eq!(econ.currency(), 60);
        assert_eq!(econ.count(&ItemKind::wheat()), 4);
    }

    #[test]
    fn test_unpriced_item_is_rejected_before_mutation() {
        let mut econ = EconomicState::new(100);
        let err = apply_merchant_exchange(
            &mut econ,
            &request(ItemKind::new("relic"), 1, TradeDirection::InitiatorSells),
        )
        .unwrap_err();
        assert!(matches!(err, HamletError::Validation { .. }));
        assert_eq!(econ.currency(), 100);
    }

    #[test]
    fn test_overflowing_total_is_rejected_before_mutation() {
        let mut econ = EconomicState::new(100);
        econ.add_items(ItemKind::bread(), 5);

        let err = apply_merchant_exchange(
            &mut econ,
            &request(ItemKind::bread(), u64::MAX, TradeDirection::InitiatorBuys),
        )
        .unwrap_err();
        assert!(matches!(err, HamletError::Validation { .. }));
        assert_eq!(econ.currency(), 100);
        assert_eq!(econ.count(&ItemKind::bread()), 5);
    }

    #[test]
    fn test_counter_shortfall_leaves_state_untouched() {
        let mut econ = EconomicState::new(10);
        let err = apply_merchant_exchange(
            &mut econ,
            &request(ItemKind::wheat(), 5, TradeDirection::InitiatorSells),
        )
        .unwrap_err();
        assert!(matches!(err, HamletError::InsufficientResource { .. }));
        assert_eq!(econ.currency(), 10);
        assert_eq!(econ.count(&ItemKind::wheat()), 0);
    }
}
