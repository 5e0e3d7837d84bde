//! Hamlet Economy - Per-node ledger of stamina, currency, and items
//!
//! Each villager node owns exactly one [`EconomicState`]. Every mutator
//! is check-then-mutate: a failed guard returns before anything changes,
//! so no reachable state ever holds a negative balance.
//!
//! # Invariants
//!
//! 1. currency >= 0 and every item count >= 0 (enforced by u64 plus
//!    checked subtraction)
//! 2. stamina stays within 0..=MAX_STAMINA
//! 3. A failed operation leaves the state byte-identical

pub mod prices;
pub mod recipe;

pub use prices::price_of;
pub use recipe::{recipe_for, Recipe};

use hamlet_types::{HamletError, ItemKind, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Upper bound for stamina
pub const MAX_STAMINA: u64 = 100;
/// Stamina restored by one sleep
pub const SLEEP_RESTORE: u64 = 60;
/// Stamina restored by eating one bread
pub const EAT_RESTORE: u64 = 30;
/// Stamina drained every morning
pub const DAILY_HUNGER: u64 = 10;
/// Extra stamina drained at morning when the villager did not sleep
pub const NO_SLEEP_PENALTY: u64 = 20;

/// Mutable ledger of one villager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicState {
    stamina: u64,
    currency: u64,
    items: HashMap<ItemKind, u64>,
    pub has_acted_this_period: bool,
    pub has_slept_today: bool,
}

impl EconomicState {
    /// Fresh state at full stamina with a starting purse
    pub fn new(currency: u64) -> Self {
        Self {
            stamina: MAX_STAMINA,
            currency,
            items: HashMap::new(),
            has_acted_this_period: false,
            has_slept_today: false,
        }
    }

    pub fn stamina(&self) -> u64 {
        self.stamina
    }

    pub fn currency(&self) -> u64 {
        self.currency
    }

    pub fn count(&self, item: &ItemKind) -> u64 {
        self.items.get(item).copied().unwrap_or(0)
    }

    /// Snapshot of all held items (zero-count entries omitted)
    pub fn items(&self) -> HashMap<ItemKind, u64> {
        self.items.clone()
    }

    // ------------------------------------------------------------------
    // Currency
    // ------------------------------------------------------------------

    /// Deduct currency; fails before mutating on shortfall.
    pub fn spend_currency(&mut self, amount: u64) -> Result<()> {
        if self.currency < amount {
            return Err(HamletError::insufficient("currency", amount, self.currency));
        }
        self.currency -= amount;
        Ok(())
    }

    pub fn credit_currency(&mut self, amount: u64) {
        self.currency = self.currency.saturating_add(amount);
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    /// Remove items; fails before mutating on shortfall.
    pub fn remove_items(&mut self, item: &ItemKind, quantity: u64) -> Result<()> {
        let held = self.count(item);
        if held < quantity {
            return Err(HamletError::insufficient(item.as_str(), quantity, held));
        }
        if held == quantity {
            self.items.remove(item);
        } else {
            self.items.insert(item.clone(), held - quantity);
        }
        Ok(())
    }

    pub fn add_items(&mut self, item: ItemKind, quantity: u64) {
        if quantity == 0 {
            return;
        }
        *self.items.entry(item).or_insert(0) += quantity;
    }

    // ------------------------------------------------------------------
    // Stamina
    // ------------------------------------------------------------------

    /// Deduct stamina; fails before mutating on shortfall.
    pub fn spend_stamina(&mut self, amount: u64) -> Result<()> {
        if self.stamina < amount {
            return Err(HamletError::insufficient("stamina", amount, self.stamina));
        }
        self.stamina -= amount;
        Ok(())
    }

    /// Restore stamina, capped at [`MAX_STAMINA`].
    pub fn restore_stamina(&mut self, amount: u64) {
        self.stamina = (self.stamina + amount).min(MAX_STAMINA);
    }

    /// Drain stamina without a guard, floored at 0 (hunger and penalties).
    pub fn sap_stamina(&mut self, amount: u64) {
        self.stamina = self.stamina.saturating_sub(amount);
    }
}

impl Default for EconomicState {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spend_currency_guard() {
        let mut state = EconomicState::new(100);
        assert!(state.spend_currency(60).is_ok());
        assert_eq!(state.currency(), 40);

        let err = state.spend_currency(50).unwrap_err();
        assert!(matches!(err, HamletError::InsufficientResource { .. }));
        // Failed guard left the balance untouched
        assert_eq!(state.currency(), 40);
    }

    #[test]
    fn test_remove_items_guard() {
        let mut state = EconomicState::new(0);
        state.add_items(ItemKind::wheat(), 3);

        assert!(state.remove_items(&ItemKind::wheat(), 5).is_err());
        assert_eq!(state.count(&ItemKind::wheat()), 3);

        assert!(state.remove_items(&ItemKind::wheat(), 3).is_ok());
        assert_eq!(state.count(&ItemKind::wheat()), 0);
        assert!(state.items().is_empty());
    }

    #[test]
    fn test_stamina_bounds() {
        let mut state = EconomicState::new(0);
        assert_eq!(state.stamina(), MAX_STAMINA);

        state.restore_stamina(50);
        assert_eq!(state.stamina(), MAX_STAMINA);

        state.spend_stamina(90).unwrap();
        assert!(state.spend_stamina(20).is_err());
        assert_eq!(state.stamina(), 10);

        state.sap_stamina(30);
        assert_eq!(state.stamina(), 0);
    }
}
